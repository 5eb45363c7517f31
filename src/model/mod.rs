//! Language-model client abstraction.
//!
//! Every backend exposes one capability, `generate(prompt, options)`. The
//! rest of the crate never talks to a backend directly; it goes through a
//! [`FallbackModel`], which owns an ordered chain of clients and an explicit
//! selection policy, and always hands back *some* text.
//!
//! | Module     | Responsibility                                          |
//! |------------|---------------------------------------------------------|
//! | `mock`     | Deterministic offline client (echo-derived output)      |
//! | `openai`   | OpenAI-compatible `/chat/completions` backend (reqwest) |
//! | `fallback` | `FallbackModel` chain + `SelectionPolicy`               |

pub mod fallback;
pub mod mock;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{BackendConfig, BackendKind, ModelSection};
use crate::errors::ModelError;

pub use fallback::{FallbackModel, SelectionPolicy};
pub use mock::MockClient;
pub use openai::OpenAiCompatClient;

/// Sampling options passed with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_tokens: 800,
        }
    }
}

/// `served_by` value for text produced by the offline echo.
pub const OFFLINE_BACKEND: &str = "offline";

/// Text returned by the chain, tagged with what produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub served_by: String,
}

impl Generation {
    pub fn offline(prompt: &str) -> Self {
        Self {
            text: mock::offline_echo(prompt),
            served_by: OFFLINE_BACKEND.to_string(),
        }
    }
}

/// A text-completion backend.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Stable identifier, reported as `backend_used` when this client answers.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, ModelError>;
}

/// Build the fallback chain described by `[model]`.
pub fn build_fallback_model(section: &ModelSection) -> Result<FallbackModel> {
    let mut builder = FallbackModel::builder().policy(section.selection);
    for (i, backend) in section.effective_backends().iter().enumerate() {
        let client = build_client(backend)
            .with_context(|| format!("Failed to build model.backends[{}]", i))?;
        builder = builder.client_with_budget(client, backend.call_budget);
    }
    builder.build()
}

fn build_client(backend: &BackendConfig) -> Result<Arc<dyn ModelClient>> {
    match backend.kind {
        BackendKind::Mock => Ok(Arc::new(match &backend.name {
            Some(name) => MockClient::named(name),
            None => MockClient::new(),
        })),
        BackendKind::OpenaiCompatible => {
            let base_url = backend
                .base_url
                .clone()
                .context("openai_compatible backend requires base_url")?;
            let model = backend
                .model
                .clone()
                .context("openai_compatible backend requires model")?;
            let api_key = match &backend.api_key_env {
                Some(var) => Some(
                    std::env::var(var)
                        .with_context(|| format!("Environment variable {} is not set", var))?,
                ),
                None => None,
            };
            let name = backend.name.clone().unwrap_or_else(|| model.clone());
            let client = OpenAiCompatClient::new(
                name,
                base_url,
                model,
                api_key,
                Duration::from_secs(backend.timeout_secs),
            )?;
            tracing::info!(
                client = client.name(),
                endpoint = client.endpoint(),
                budget = ?backend.call_budget,
                "Configured OpenAI-compatible backend"
            );
            Ok(Arc::new(client))
        }
    }
}
