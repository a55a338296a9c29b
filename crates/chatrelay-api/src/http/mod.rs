//! HTTP/REST API layer for chatrelay.
//!
//! Axum-based REST API at `/api/v1/` with an envelope response format for
//! JSON endpoints and plain-text byte streams for chat replies.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
