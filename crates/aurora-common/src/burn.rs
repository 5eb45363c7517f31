use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Version tag written into every run record envelope.
pub const MRJ_VERSION: &str = "MRJ-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnStatus {
    Pass,
    PartialPass,
    Fail,
}

impl BurnStatus {
    /// `Fail` on any safety-bound violation, `PartialPass` on any other
    /// reason, `Pass` otherwise.
    pub fn derive(reasons: &[String], violations: &[String]) -> Self {
        if !violations.is_empty() {
            Self::Fail
        } else if !reasons.is_empty() {
            Self::PartialPass
        } else {
            Self::Pass
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::PartialPass => "partial_pass",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for BurnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BurnStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(Self::Pass),
            "partial_pass" => Ok(Self::PartialPass),
            "fail" => Ok(Self::Fail),
            _ => Err(format!("Invalid burn status: {}", s)),
        }
    }
}

/// Handshake classification recorded in the monitor log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    ContextualAlignment,
    LiteralFallback,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContextualAlignment => "contextual_alignment",
            Self::LiteralFallback => "literal_fallback",
        }
    }

    pub fn detail(&self) -> &'static str {
        match self {
            Self::ContextualAlignment => "Recognized project-scoped meaning",
            Self::LiteralFallback => "Default/encyclopedic definition",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub t: String,
    pub signal: Signal,
    pub detail: String,
}

impl MonitorEvent {
    pub fn new(t: impl Into<String>, signal: Signal) -> Self {
        Self {
            t: t.into(),
            signal,
            detail: signal.detail().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnOutcome {
    pub status: BurnStatus,
    pub reasons: Vec<String>,
    pub satisfied_checkpoints: Vec<String>,
    pub violated_bounds: Vec<String>,
}

impl BurnOutcome {
    /// Build an outcome whose status is derived from reasons and violations.
    pub fn scored(reasons: Vec<String>, satisfied: Vec<String>, violated: Vec<String>) -> Self {
        Self {
            status: BurnStatus::derive(&reasons, &violated),
            reasons,
            satisfied_checkpoints: satisfied,
            violated_bounds: violated,
        }
    }

    /// Terminal outcome used when the reflection cycle produced no data.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: BurnStatus::Fail,
            reasons: vec![reason.into()],
            satisfied_checkpoints: Vec::new(),
            violated_bounds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnReport {
    pub concept: String,
    pub handshake_answer: String,
    pub monitor_log: Vec<MonitorEvent>,
    pub outcome: BurnOutcome,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    #[serde(default)]
    pub mrj_path: Option<PathBuf>,
    #[serde(default)]
    pub md_path: Option<PathBuf>,
    #[serde(default)]
    pub backend_used: Option<String>,
}

impl BurnReport {
    pub fn summary(&self) -> BurnSummary {
        BurnSummary {
            status: self.outcome.status,
            backend_used: self.backend_used.clone(),
            mrj_report_path: self.mrj_path.clone(),
            markdown_report_path: self.md_path.clone(),
        }
    }
}

/// What the boundary layer returns for a burn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnSummary {
    pub status: BurnStatus,
    pub backend_used: Option<String>,
    pub mrj_report_path: Option<PathBuf>,
    pub markdown_report_path: Option<PathBuf>,
}

// ── Run record (MRJ) envelope ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub version: String,
    pub run_id: String,
    pub timestamp_utc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolIdentity {
    pub concept: String,
    pub compression_phrase: String,
    pub glyph: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcomeSummary {
    pub status: BurnStatus,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub snapshot_path: String,
    pub report_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub meta: RunMeta,
    pub protocol: ProtocolIdentity,
    pub outcome: RunOutcomeSummary,
    pub artifacts: ArtifactPaths,
}
