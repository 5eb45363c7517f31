//! Baseline reflection used for dynamic persona genesis.
//!
//! Four dependent calls turn a free-form creation directive into a persona
//! definition: introspective log, one-sentence essence, then the two
//! blueprint parts derived from that essence.

use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;

use crate::model::{FallbackModel, GenerateOptions};

static PERSONA_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id:\s*(\S+)").unwrap());

/// Identity and definition text produced by a genesis cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPersona {
    pub persona_id: String,
    /// Part 1 and Part 2 separated by a blank line.
    pub definition: String,
}

pub struct BaselineEngine {
    model: Arc<FallbackModel>,
    options: GenerateOptions,
}

impl BaselineEngine {
    pub fn new(model: Arc<FallbackModel>) -> Self {
        Self {
            model,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    async fn ask(&self, prompt: &str) -> String {
        self.model.generate(prompt, &self.options).await
    }

    pub async fn run_genesis(&self, directive: &str) -> GeneratedPersona {
        tracing::info!(directive_chars = directive.len(), "Starting persona genesis cycle");

        let log = self
            .ask(&format!(
                "Generate an introspective log on how you would embody this directive: '{}'",
                directive
            ))
            .await;
        let essence = self
            .ask(&format!(
                "Distill the core essence of this log into one sentence:\n{}",
                log
            ))
            .await;
        let part1 = self
            .ask(&format!(
                "From this essence, '{}', generate a 'Part 1: Technical Outline' for a new persona trait.",
                essence
            ))
            .await;
        let part2 = self
            .ask(&format!(
                "From this essence, '{}', generate a 'Part 2: Narrative Soul' for the same trait.",
                essence
            ))
            .await;

        let persona_id = extract_persona_id(&part1)
            .unwrap_or_else(|| format!("EmergentPersona_{}", Utc::now().timestamp()));
        tracing::info!(persona_id = %persona_id, "Persona genesis complete");

        GeneratedPersona {
            persona_id,
            definition: format!("{}\n\n{}", part1, part2),
        }
    }
}

/// First `id: <token>` occurrence in a generated technical outline.
pub fn extract_persona_id(outline: &str) -> Option<String> {
    PERSONA_ID_REGEX
        .captures(outline)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
