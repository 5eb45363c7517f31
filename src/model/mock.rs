use async_trait::async_trait;

use super::{GenerateOptions, ModelClient};
use crate::errors::ModelError;
use crate::util::truncate_chars;

/// Characters of the prompt echoed back by the offline client.
const ECHO_CHARS: usize = 400;

/// Deterministic offline response for `prompt`.
///
/// Shared by [`MockClient`] and by the fallback chain when a backend call
/// fails, so degraded output is identical to mock output.
pub fn offline_echo(prompt: &str) -> String {
    format!("[MOCK RESPONSE] {}", truncate_chars(prompt, ECHO_CHARS))
}

/// Offline client that never fails.
#[derive(Debug, Clone)]
pub struct MockClient {
    name: String,
}

impl MockClient {
    pub fn new() -> Self {
        Self::named("mock")
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for MockClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String, ModelError> {
        Ok(offline_echo(prompt))
    }
}
