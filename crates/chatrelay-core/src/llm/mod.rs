//! LLM provider abstraction and context sizing.

pub mod box_provider;
pub mod context_sizer;
pub mod provider;
