//! Chat sessions: storage port, lifecycle service and the completion relay.

pub mod relay;
pub mod repository;
pub mod service;
pub mod session;
pub mod summarizer;
pub mod title;

#[cfg(test)]
pub(crate) mod testing;
