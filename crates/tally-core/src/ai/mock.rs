//! Mock backend for testing and offline development

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::AIBackend;

/// Returns a fixed reply and records every prompt it receives
#[derive(Debug, Default)]
pub struct MockBackend {
    reply: String,
    prompts: Mutex<Vec<(String, String)>>,
}

impl MockBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Recorded `(system, user)` prompt pairs
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .map_err(|_| Error::Ai("mock backend lock poisoned".into()))?
            .push((system_prompt.to_string(), user_prompt.to_string()));
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://"
    }
}
