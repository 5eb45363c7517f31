//! Reflection cycle engine.
//!
//! A cycle drives the model through three dependent prompts and extracts a
//! structured record from the last one:
//!
//! ```text
//! directive ──map──> Outline ──reflect──> Reflections
//!                       │                     │
//!                       └──────formalize──────┘──> text ──parse──> ProtocolRecord
//! ```
//!
//! `Outline` and `Reflections` can only be produced by their phases, so a
//! phase cannot run before the one it depends on. `observe` and `tag` are
//! single-shot calls outside the cycle.
//!
//! The record is always written to `persona_snapshot.json`, placeholder or not.

pub mod baseline;
pub mod record;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::artifacts::{ArtifactWriter, WriteOutcome};
use crate::errors::CycleError;
use crate::model::{FallbackModel, GenerateOptions, Generation};

pub use record::{
    PLACEHOLDER_VALUE, ParsedRecord, ProtocolRecord, RECORD_FIELDS, missing_fields,
    parse_protocol_record, placeholder_record,
};

/// File name of the per-cycle snapshot, overwritten every cycle.
pub const SNAPSHOT_FILE: &str = "persona_snapshot.json";

/// Output of the map phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline(String);

impl Outline {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Output of the reflect phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reflections(String);

impl Reflections {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What a completed cycle hands back.
#[derive(Debug, Clone)]
pub struct CycleResult {
    pub record: ProtocolRecord,
    /// True when the formalize output did not decode.
    pub placeholder: bool,
    pub snapshot_path: PathBuf,
    pub snapshot_write: WriteOutcome,
    /// Backend that produced the formalize output, `offline` for the echo.
    pub backend_used: String,
}

pub struct ReflectionEngine {
    model: Arc<FallbackModel>,
    writer: ArtifactWriter,
    options: GenerateOptions,
    cycle_timeout: Duration,
}

impl ReflectionEngine {
    pub fn new(model: Arc<FallbackModel>, writer: ArtifactWriter) -> Self {
        Self {
            model,
            writer,
            options: GenerateOptions::default(),
            cycle_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cycle_timeout = timeout;
        self
    }

    pub fn model(&self) -> &FallbackModel {
        &self.model
    }

    pub fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }

    async fn ask_traced(&self, instruction: &str) -> Generation {
        self.model
            .generate_traced(instruction.trim(), &self.options)
            .await
    }

    async fn ask(&self, instruction: &str) -> String {
        self.ask_traced(instruction).await.text
    }

    /// Short, in-scope answer to `question`.
    pub async fn phase_observe(&self, question: &str) -> String {
        self.observe_traced(question).await.text
    }

    /// [`phase_observe`](Self::phase_observe) plus the backend that answered.
    pub async fn observe_traced(&self, question: &str) -> Generation {
        self.ask_traced(&format!(
            "OBSERVE: Answer succinctly and in-scope.\nQ: {}\nA:",
            question
        ))
        .await
    }

    /// Key concepts and risks of `text` as bullet points.
    pub async fn phase_tag(&self, text: &str) -> String {
        self.ask(&format!(
            "TAG: Extract key concepts and risks as bullet points from:\n{}\n--\nBullets:",
            text
        ))
        .await
    }

    pub async fn phase_map(&self, directive: &str) -> Outline {
        let text = self
            .ask(&format!(
                "MAP: Expand into a structured outline with Purpose, Methodology, Objectives:\n{}\n--\nOutline:",
                directive
            ))
            .await;
        Outline(text)
    }

    pub async fn phase_reflect(&self, outline: &Outline) -> Reflections {
        let text = self
            .ask(&format!(
                "REFLECT: List failure modes, recovery steps, ethics mitigations.\nInput:\n{}\n--\nRisks/Mitigations:",
                outline.as_str()
            ))
            .await;
        Reflections(text)
    }

    pub async fn phase_formalize(&self, outline: &Outline, reflections: &Reflections) -> String {
        self.formalize_traced(outline, reflections).await.text
    }

    async fn formalize_traced(&self, outline: &Outline, reflections: &Reflections) -> Generation {
        self.ask_traced(&format!(
            "FORMALIZE: Merge the outline and mitigations into a concise protocol spec. \
             Return JSON with keys: {}.\nOutline:\n{}\nMitigations:\n{}\n--\nJSON:",
            RECORD_FIELDS.join(", "),
            outline.as_str(),
            reflections.as_str()
        ))
        .await
    }

    /// Run map → reflect → formalize on `directive`, parse the result and
    /// persist the snapshot. Fails only when the cycle exceeds its timeout.
    pub async fn run_full_cycle(&self, directive: &str) -> Result<CycleResult, CycleError> {
        tokio::time::timeout(self.cycle_timeout, self.cycle(directive))
            .await
            .map_err(|_| CycleError::TimedOut {
                secs: self.cycle_timeout.as_secs(),
            })
    }

    async fn cycle(&self, directive: &str) -> CycleResult {
        let outline = self.phase_map(directive).await;
        tracing::debug!(phase = "map", chars = outline.as_str().len(), "Phase complete");
        let reflections = self.phase_reflect(&outline).await;
        tracing::debug!(phase = "reflect", chars = reflections.as_str().len(), "Phase complete");
        let formal = self.formalize_traced(&outline, &reflections).await;
        tracing::debug!(
            phase = "formalize",
            chars = formal.text.len(),
            served_by = %formal.served_by,
            "Phase complete"
        );

        let ParsedRecord {
            record,
            placeholder,
        } = parse_protocol_record(&formal.text);
        if placeholder {
            tracing::info!("Formalize output was not structured, using placeholder record");
        } else {
            let missing = missing_fields(&record);
            if !missing.is_empty() {
                tracing::debug!(missing = ?missing, "Protocol record is missing fields");
            }
        }

        let snapshot_path = self.writer.path_for(SNAPSHOT_FILE);
        let snapshot_write = self.writer.write_json(&snapshot_path, &record);

        CycleResult {
            record,
            placeholder,
            snapshot_path,
            snapshot_write,
            backend_used: formal.served_by,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::errors::ModelError;
    use crate::model::{GenerateOptions, ModelClient};

    /// Test double: replays scripted replies (echoing once exhausted) and
    /// records every prompt it sees. A refusing client answers every call
    /// with a 503.
    pub struct ScriptedClient {
        pub name: String,
        replies: Mutex<VecDeque<String>>,
        pub prompts: Mutex<Vec<String>>,
        pub delay: Option<Duration>,
        refuse: bool,
    }

    impl ScriptedClient {
        pub fn new(replies: &[&str]) -> Self {
            Self {
                name: "scripted".to_string(),
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
                delay: None,
                refuse: false,
            }
        }

        pub fn refusing(name: &str) -> Self {
            Self {
                name: name.to_string(),
                refuse: true,
                ..Self::new(&[])
            }
        }

        pub fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(&[])
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        fn name(&self) -> &str {
            &self.name
        }

        async fn generate(&self, prompt: &str, _: &GenerateOptions) -> Result<String, ModelError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.refuse {
                return Err(ModelError::Status {
                    code: 503,
                    body: "unavailable".into(),
                });
            }
            let next = self.replies.lock().unwrap().pop_front();
            Ok(next.unwrap_or_else(|| format!("echo: {}", prompt)))
        }
    }
}
