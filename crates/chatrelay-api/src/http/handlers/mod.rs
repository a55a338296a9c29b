//! HTTP request handlers for the REST API.

pub mod chat;
pub mod session;
pub mod settings;

use uuid::Uuid;

use crate::http::error::AppError;

/// Parse a session id from a path parameter.
///
/// A malformed id cannot name a stored session, so it is reported as 404.
pub(crate) fn parse_session_id(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>().map_err(|_| AppError::SessionNotFound)
}
