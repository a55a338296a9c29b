//! Session management CLI commands: list, create, show, rename, delete.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use uuid::Uuid;

use chatrelay_types::chat::MessageRole;

use crate::state::AppState;

/// List sessions with title, icon and creation time.
///
/// # Examples
///
/// ```bash
/// chatrelay session list
/// chatrelay session list --json
/// ```
pub async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    let sessions = state.session_service.list_sessions().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No sessions yet. Start one with: {}",
            style("i").blue().bold(),
            style("chatrelay session create").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Assistant").fg(Color::White),
        Cell::new("Created").fg(Color::White),
    ]);

    for session in &sessions {
        table.add_row(vec![
            Cell::new(session.id.to_string()).fg(Color::DarkGrey),
            Cell::new(&session.title).fg(Color::Cyan),
            Cell::new(session.assistant_name.as_deref().unwrap_or("-")).fg(Color::White),
            Cell::new(session.created_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::White),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Create a session, optionally with a custom system prompt.
pub async fn create_session(state: &AppState, prompt: Option<&str>, json: bool) -> Result<()> {
    let settings = state.settings_snapshot().await?;
    let session = state.session_service.create_session(&settings, prompt).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Created session {}",
        style("✓").green().bold(),
        style(session.id).cyan()
    );
    if let Some(name) = &session.assistant_name {
        println!("  Assistant: {}", style(name).bold());
    }
    println!(
        "  {}",
        style(format!("chatrelay chat {} \"<message>\"", session.id)).dim()
    );
    println!();

    Ok(())
}

/// Print a session's transcript.
pub async fn show_session(state: &AppState, session_id: Uuid, json: bool) -> Result<()> {
    let view = state.session_service.get_session(&session_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let assistant = view
        .session
        .assistant_name
        .as_deref()
        .unwrap_or("Assistant");

    println!();
    println!("  {}", style(&view.session.title).cyan().bold());
    println!();
    for message in &view.messages {
        let label = match message.role {
            MessageRole::System => style("System".to_string()).dim(),
            MessageRole::User => style("You".to_string()).green().bold(),
            MessageRole::Assistant => style(assistant.to_string()).magenta().bold(),
        };
        println!("  {label}");
        for line in message.content.lines() {
            println!("    {line}");
        }
        println!();
    }

    Ok(())
}

pub async fn rename_session(state: &AppState, session_id: Uuid, title: &str, json: bool) -> Result<()> {
    state.session_service.rename_session(&session_id, title).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"renamed": true, "session_id": session_id.to_string(), "title": title})
        );
    } else {
        println!("  {} Renamed to '{}'", style("✓").green().bold(), style(title).cyan());
    }

    Ok(())
}

/// Delete a session after confirmation (skipped with `--force` or `--json`).
pub async fn delete_session(state: &AppState, session_id: Uuid, force: bool, json: bool) -> Result<()> {
    let view = state.session_service.get_session(&session_id).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete session '{}' ({} messages)?",
                style(&view.session.title).red().bold(),
                view.messages.len()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.session_service.delete_session(&session_id).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"deleted": true, "session_id": session_id.to_string()})
        );
    } else {
        println!("  {} Session deleted.", style("✓").green().bold());
    }

    Ok(())
}
