//! AI completion backends and the premium financial report
//!
//! # Architecture
//!
//! - `AIBackend` trait: a chat completion (system + user prompt in, text out)
//! - `OpenAICompatibleBackend`: any server implementing `/v1/chat/completions`
//! - `MockBackend`: canned responses for tests and offline development
//! - `ReportGenerator`: premium-gated monthly report built on a backend
//!
//! # Configuration
//!
//! Environment variables:
//! - `OPENAI_API_KEY`: API key (required to enable AI reports)
//! - `OPENAI_BASE_URL`: Server URL (default: https://api.openai.com)
//! - `OPENAI_MODEL`: Model name (default: gpt-4o-mini)

mod mock;
mod openai_compatible;
pub mod report;

pub use mock::MockBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use report::{AiReport, ReportGenerator};

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the interface for completion backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Run one chat completion and return the assistant's text
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Model used for completions
    fn model(&self) -> &str;

    /// Host URL (for logging)
    fn host(&self) -> &str;
}
