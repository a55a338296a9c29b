//! One-shot chat and regenerate commands.
//!
//! The reply is printed as it streams. Ctrl+C stops the turn: the reply
//! stream is dropped, the relay stores whatever arrived, and the command
//! waits for that commit before exiting.

use std::io::Write;

use anyhow::Result;
use console::style;
use futures_util::StreamExt;
use serde_json::json;
use uuid::Uuid;

use chatrelay_core::chat::relay::{ChatTurn, StreamEnd};

use crate::state::AppState;

/// `chatrelay chat <session> <message>`
pub async fn send_message(state: &AppState, session_id: Uuid, message: &str, json: bool) -> Result<()> {
    let settings = state.settings_snapshot().await?;
    let turn = state.relay.chat(&settings, session_id, message).await?;
    print_turn(turn, json).await
}

/// `chatrelay regenerate <session>`
pub async fn regenerate(state: &AppState, session_id: Uuid, json: bool) -> Result<()> {
    let settings = state.settings_snapshot().await?;
    let turn = state.relay.regenerate(&settings, session_id).await?;
    print_turn(turn, json).await
}

async fn print_turn(turn: ChatTurn, json: bool) -> Result<()> {
    let ChatTurn {
        mut reply,
        completion,
    } = turn;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut streamed = String::new();
    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            chunk = reply.next() => match chunk {
                Some(chunk) => {
                    if !json {
                        write!(stdout, "{chunk}")?;
                        stdout.flush()?;
                    }
                    streamed.push_str(&chunk);
                }
                None => break,
            },
            _ = &mut ctrl_c => {
                tracing::debug!("Interrupted, cancelling turn");
                break;
            }
        }
    }
    drop(reply);

    let outcome = completion.await??;

    if json {
        let error = match &outcome.end {
            StreamEnd::Failed(e) => Some(e.to_string()),
            _ => None,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "message_id": outcome.message_id,
                "reply": outcome.reply,
                "streamed": streamed,
                "end": outcome.end.as_str(),
                "error": error,
            }))?
        );
        return Ok(());
    }

    println!();
    match outcome.end {
        StreamEnd::Completed => {}
        StreamEnd::Cancelled => {
            println!("{}", style("  (stopped, partial reply saved)").dim());
        }
        StreamEnd::Failed(_) => {
            println!("{}", style("  (reply incomplete, partial reply saved)").yellow());
        }
    }

    Ok(())
}
