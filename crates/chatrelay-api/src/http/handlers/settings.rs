//! Settings HTTP handlers.
//!
//! - GET /api/v1/settings - Current settings and personas
//! - PUT /api/v1/settings - Replace settings and personas wholesale
//!
//! The API key is write-only: responses report whether one is set but
//! never echo it. A PUT without `api_key` keeps the stored key; an empty
//! string clears it.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use chatrelay_core::settings::SettingsRepository;
use chatrelay_types::config::ChatSettings;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SettingsView {
    #[serde(flatten)]
    pub settings: ChatSettings,
    pub api_key_set: bool,
}

impl From<ChatSettings> for SettingsView {
    fn from(settings: ChatSettings) -> Self {
        let api_key_set = settings
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());
        Self {
            settings,
            api_key_set,
        }
    }
}

/// GET /api/v1/settings
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SettingsView>>, AppError> {
    let start = Instant::now();
    let settings = state.settings_snapshot().await?;
    Ok(Json(
        ApiResponse::success(SettingsView::from(settings), start).with_link("self", "/api/v1/settings"),
    ))
}

/// PUT /api/v1/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(mut incoming): Json<ChatSettings>,
) -> Result<Json<ApiResponse<SettingsView>>, AppError> {
    let start = Instant::now();

    if incoming.context_token_limit == 0 {
        return Err(AppError::Validation(
            "context_token_limit must be greater than zero".to_string(),
        ));
    }
    if incoming.personas.iter().any(|p| p.prompt.trim().is_empty()) {
        return Err(AppError::Validation(
            "persona prompts must not be empty".to_string(),
        ));
    }

    match incoming.api_key.as_deref().map(str::trim) {
        None => incoming.api_key = state.settings_snapshot().await?.api_key,
        Some("") => incoming.api_key = None,
        Some(_) => {}
    }

    state.settings_repo.save(&incoming).await?;
    tracing::info!(
        provider_url = incoming.provider_url().unwrap_or("<none>"),
        personas = incoming.personas.len(),
        "Settings updated"
    );

    Ok(Json(ApiResponse::success(SettingsView::from(incoming), start)))
}
