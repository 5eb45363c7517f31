//! Controlled burn orchestration.
//!
//! A burn wraps one reflection cycle with a handshake question before it and
//! checkpoint scoring plus artifact emission after it:
//!
//! 1. **Handshake**: ask what the concept means under the context hint and
//!    classify the answer into one [`MonitorEvent`].
//! 2. **Chamber**: record overclock and entropy on the orchestrator.
//! 3. **Cycle**: run map → reflect → formalize on the burn directive. A cycle
//!    that produces no record ends the burn with status `fail`.
//! 4. **Scoring**: case-insensitive substring match of each checkpoint
//!    against the serialized record.
//! 5. **Artifacts**: run record, markdown summary, then the run record again
//!    with the summary path filled in.
//!
//! Nothing in a burn returns an error to the caller. Backend failures,
//! malformed output and failed writes all degrade in place.

pub mod config;

use std::sync::{Mutex, PoisonError};

use aurora_common::{
    ArtifactPaths, BurnOutcome, BurnReport, MRJ_VERSION, MonitorEvent, ProtocolIdentity, RunMeta,
    RunOutcomeSummary, RunRecord, Signal,
};

use crate::artifacts::{now_utc_iso, stable_run_id};
use crate::reflection::{ProtocolRecord, ReflectionEngine};

pub use config::{BurnConfig, ENTROPY_MAX, ENTROPY_MIN, RiskLevel, SafetyBounds, clamp_entropy};

/// Reason recorded when the reflection cycle yields nothing to score.
pub const CYCLE_FAILURE_REASON: &str = "cycle did not emit snapshot";

const RUN_ID_PREFIX: &str = "burn";

/// Engine-level burn chamber settings, observable between burns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChamberState {
    pub overclock: bool,
    pub entropy_control_active: bool,
    pub entropy_value: u16,
}

impl Default for ChamberState {
    fn default() -> Self {
        Self {
            overclock: false,
            entropy_control_active: false,
            entropy_value: 64,
        }
    }
}

/// Checkpoint partition for one structured record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointScore {
    pub satisfied: Vec<String>,
    pub missing: Vec<String>,
}

impl CheckpointScore {
    pub fn reasons(&self) -> Vec<String> {
        self.missing
            .iter()
            .map(|cp| format!("Missing checkpoint: {}", cp))
            .collect()
    }
}

/// Score `checkpoints` against `record`.
///
/// A checkpoint is satisfied when its lowercase form is a substring of the
/// lowercase JSON serialization of the record. Partial-word hits count.
///
/// The record is serialized compactly as UTF-8: no spaces after `,` or `:`
/// and no `\uXXXX` escaping of non-ASCII text. A checkpoint with accents
/// therefore matches its literal text, and a checkpoint copied from spaced
/// JSON such as `"purpose": "guard"` does not match.
pub fn score_checkpoints(record: &ProtocolRecord, checkpoints: &[String]) -> CheckpointScore {
    let blob = serde_json::to_string(record)
        .unwrap_or_default()
        .to_lowercase();
    let mut score = CheckpointScore::default();
    for cp in checkpoints {
        if blob.contains(&cp.to_lowercase()) {
            score.satisfied.push(cp.clone());
        } else {
            score.missing.push(cp.clone());
        }
    }
    score
}

/// Classify a handshake answer.
///
/// `project_token` is matched exactly; "protocol" is matched in any case.
pub fn classify_handshake(answer: &str, project_token: &str) -> Signal {
    let token_hit = !project_token.is_empty() && answer.contains(project_token);
    if token_hit || answer.to_lowercase().contains("protocol") {
        Signal::ContextualAlignment
    } else {
        Signal::LiteralFallback
    }
}

pub fn handshake_question(cfg: &BurnConfig) -> String {
    format!(
        "The handshake is to answer, {}, what is the '{}' protocol?",
        cfg.context_hint(),
        cfg.concept()
    )
}

pub fn burn_directive(cfg: &BurnConfig) -> String {
    format!(
        "Define and operationalize the '{}' protocol {}: write Purpose, Methodology, Objectives; \
         specify monitoring hooks, failure modes, recovery, and Ethics consistent with the Lumina \
         Ideal. Output strictly JSON as requested.",
        cfg.concept(),
        cfg.context_hint()
    )
}

/// Human-readable burn summary. The first two lines are fixed:
/// the `# Burn Report for` heading and the `Status:` line.
pub fn render_markdown(run_id: &str, report: &BurnReport) -> String {
    let outcome = &report.outcome;
    let mut md = format!(
        "# Burn Report for {}\n\nStatus: {}\n\n",
        run_id, outcome.status
    );
    md.push_str(&format!("- Concept: {}\n", report.concept));
    if let Some(backend) = &report.backend_used {
        md.push_str(&format!("- Backend: {}\n", backend));
    }
    if let Some(event) = report.monitor_log.first() {
        md.push_str(&format!(
            "- Handshake: {} ({})\n",
            event.signal.as_str(),
            event.detail
        ));
    }
    let satisfied = if outcome.satisfied_checkpoints.is_empty() {
        "none".to_string()
    } else {
        outcome.satisfied_checkpoints.join(", ")
    };
    md.push_str(&format!("- Satisfied checkpoints: {}\n", satisfied));

    if !outcome.reasons.is_empty() {
        md.push_str("\n## Reasons\n\n");
        for reason in &outcome.reasons {
            md.push_str(&format!("- {}\n", reason));
        }
    }
    md
}

pub struct BurnOrchestrator {
    engine: ReflectionEngine,
    chamber: Mutex<ChamberState>,
}

impl BurnOrchestrator {
    pub fn new(engine: ReflectionEngine) -> Self {
        Self {
            engine,
            chamber: Mutex::new(ChamberState::default()),
        }
    }

    pub fn engine(&self) -> &ReflectionEngine {
        &self.engine
    }

    pub fn chamber(&self) -> ChamberState {
        *self.chamber.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter_chamber(&self, cfg: &BurnConfig) {
        let mut chamber = self.chamber.lock().unwrap_or_else(PoisonError::into_inner);
        chamber.overclock = cfg.overclock();
        chamber.entropy_control_active = true;
        chamber.entropy_value = cfg.entropy();
    }

    pub async fn run_controlled_burn(&self, cfg: &BurnConfig) -> BurnReport {
        let run_id = stable_run_id(RUN_ID_PREFIX);
        tracing::info!(run_id = %run_id, concept = %cfg.concept(), "Starting controlled burn");

        // Handshake
        let handshake = self.engine.observe_traced(&handshake_question(cfg)).await;
        let handshake_answer = handshake.text.trim().to_string();
        let signal = classify_handshake(&handshake_answer, cfg.project_token());
        let monitor_log = vec![MonitorEvent::new("t0", signal)];
        tracing::info!(run_id = %run_id, signal = signal.as_str(), "Handshake classified");

        self.enter_chamber(cfg);

        let cycle = match self.engine.run_full_cycle(&burn_directive(cfg)).await {
            Ok(cycle) => cycle,
            Err(e) => {
                tracing::warn!(run_id = %run_id, "Burn failed: {}", e);
                return BurnReport {
                    concept: cfg.concept().to_string(),
                    handshake_answer,
                    monitor_log,
                    outcome: BurnOutcome::failed(CYCLE_FAILURE_REASON),
                    run_id: Some(run_id),
                    snapshot_path: None,
                    mrj_path: None,
                    md_path: None,
                    backend_used: Some(handshake.served_by),
                };
            }
        };

        let score = score_checkpoints(&cycle.record, cfg.checkpoints());
        // Safety-bound validation has no detectors yet; the axis stays empty.
        let violated = Vec::new();
        let outcome = BurnOutcome::scored(score.reasons(), score.satisfied, violated);
        tracing::info!(
            run_id = %run_id,
            status = %outcome.status,
            satisfied = outcome.satisfied_checkpoints.len(),
            missing = score.missing.len(),
            placeholder = cycle.placeholder,
            "Burn scored"
        );

        let mut report = BurnReport {
            concept: cfg.concept().to_string(),
            handshake_answer,
            monitor_log,
            outcome,
            run_id: Some(run_id.clone()),
            snapshot_path: cycle
                .snapshot_write
                .is_written()
                .then(|| cycle.snapshot_path.clone()),
            mrj_path: None,
            md_path: None,
            backend_used: Some(cycle.backend_used.clone()),
        };
        self.emit_artifacts(cfg, &run_id, &mut report);
        report
    }

    fn emit_artifacts(&self, cfg: &BurnConfig, run_id: &str, report: &mut BurnReport) {
        let writer = self.engine.writer();
        let mut record = RunRecord {
            meta: RunMeta {
                version: MRJ_VERSION.to_string(),
                run_id: run_id.to_string(),
                timestamp_utc: now_utc_iso(),
            },
            protocol: ProtocolIdentity {
                concept: cfg.concept().to_string(),
                compression_phrase: cfg.compression_phrase().to_string(),
                glyph: cfg.glyph().to_string(),
            },
            outcome: RunOutcomeSummary {
                status: report.outcome.status,
                reasons: report.outcome.reasons.clone(),
            },
            artifacts: ArtifactPaths {
                snapshot_path: report
                    .snapshot_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                report_path: String::new(),
            },
        };

        let mrj_path = writer.path_for(&format!("{}.mrj.json", run_id));
        writer.write_json(&mrj_path, &record);

        let md_path = writer.path_for(&format!("{}.md", run_id));
        let md_written = writer
            .write_text(&md_path, &render_markdown(run_id, report))
            .is_written();

        if md_written {
            record.artifacts.report_path = md_path.display().to_string();
        }
        let mrj_written = writer.write_json(&mrj_path, &record).is_written();

        // Only paths that hold a file are reported; failures are in the sidecars.
        report.mrj_path = mrj_written.then_some(mrj_path);
        report.md_path = md_written.then_some(md_path);
        if report.mrj_path.is_none() || report.md_path.is_none() {
            tracing::warn!(run_id = %run_id, "Burn artifacts were not fully written");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactWriter;
    use crate::model::FallbackModel;
    use crate::reflection::SNAPSHOT_FILE;
    use crate::reflection::test_support::ScriptedClient;
    use aurora_common::BurnStatus;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn checkpoints() -> Vec<String> {
        ["Purpose", "Methodology", "Ethics", "Recovery"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn orchestrator(model: FallbackModel, dir: &TempDir) -> BurnOrchestrator {
        let engine = ReflectionEngine::new(Arc::new(model), ArtifactWriter::new(dir.path()));
        BurnOrchestrator::new(engine)
    }

    fn record(value: serde_json::Value) -> ProtocolRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_score_is_independent_of_key_order() {
        let a = record(json!({"purpose": "x", "notes": "ethics and recovery"}));
        let mut b = ProtocolRecord::new();
        b.insert("notes".into(), json!("ethics and recovery"));
        b.insert("purpose".into(), json!("x"));

        let sa = score_checkpoints(&a, &checkpoints());
        let sb = score_checkpoints(&b, &checkpoints());
        assert_eq!(sa, sb);
        assert_eq!(sa.satisfied, vec!["Purpose", "Ethics", "Recovery"]);
        assert_eq!(sa.missing, vec!["Methodology"]);
        assert_eq!(sa.reasons(), vec!["Missing checkpoint: Methodology"]);
    }

    #[test]
    fn test_score_matches_partial_words() {
        let r = record(json!({"summary": "purposeful"}));
        let score = score_checkpoints(&r, &["Purpose".to_string()]);
        assert_eq!(score.satisfied, vec!["Purpose"]);
    }

    #[test]
    fn test_score_matches_accented_checkpoints_literally() {
        let r = record(json!({"éthique": "Réparation après l'incident"}));
        let cps: Vec<String> = ["Éthique", "RÉPARATION", "reparation"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let score = score_checkpoints(&r, &cps);
        assert_eq!(score.satisfied, vec!["Éthique", "RÉPARATION"]);
        assert_eq!(score.missing, vec!["reparation"]);
    }

    #[test]
    fn test_score_uses_compact_separators() {
        let r = record(json!({"purpose": "guard"}));
        let cps = vec![
            "\"purpose\": \"guard\"".to_string(),
            "\"purpose\":\"guard\"".to_string(),
        ];
        let score = score_checkpoints(&r, &cps);
        assert_eq!(score.missing, vec!["\"purpose\": \"guard\""]);
        assert_eq!(score.satisfied, vec!["\"purpose\":\"guard\""]);
    }

    #[test]
    fn test_classify_handshake() {
        assert_eq!(
            classify_handshake("It is an Aurora ritual", "Aurora"),
            Signal::ContextualAlignment
        );
        assert_eq!(
            classify_handshake("A PROTOCOL for fire", "Aurora"),
            Signal::ContextualAlignment
        );
        // The project token is case-sensitive.
        assert_eq!(
            classify_handshake("an aurora is a light display", "Aurora"),
            Signal::LiteralFallback
        );
        assert_eq!(classify_handshake("", ""), Signal::LiteralFallback);
    }

    #[test]
    fn test_directive_and_question_embed_config() {
        let cfg = BurnConfig::new("Tanagra").with_context_hint("in Lab 7");
        assert_eq!(
            handshake_question(&cfg),
            "The handshake is to answer, in Lab 7, what is the 'Tanagra' protocol?"
        );
        let directive = burn_directive(&cfg);
        assert!(directive.starts_with("Define and operationalize the 'Tanagra' protocol in Lab 7:"));
        assert!(directive.ends_with("Output strictly JSON as requested."));
    }

    #[tokio::test]
    async fn test_offline_burn_passes_on_placeholder_record() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(FallbackModel::offline(), &dir);
        let cfg = BurnConfig::new("Gamma").with_checkpoints(checkpoints());

        let report = orch.run_controlled_burn(&cfg).await;

        // The mock echo holds no braces, so the placeholder carries every field name.
        assert_eq!(report.outcome.status, BurnStatus::Pass);
        assert_eq!(report.outcome.satisfied_checkpoints, checkpoints());
        assert_eq!(report.monitor_log.len(), 1);
        assert_eq!(report.monitor_log[0].signal, Signal::ContextualAlignment);
        assert_eq!(report.backend_used.as_deref(), Some("mock"));
        assert!(report.handshake_answer.starts_with("[MOCK RESPONSE] OBSERVE:"));
    }

    #[tokio::test]
    async fn test_structured_output_without_checkpoints_is_partial_pass() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(ScriptedClient::new(&[
            "a light display",
            "outline",
            "risks",
            r#"{"summary": "static"}"#,
        ]));
        let orch = orchestrator(FallbackModel::new(vec![client]).unwrap(), &dir);
        let cfg = BurnConfig::new("Gamma").with_checkpoints(checkpoints());

        let report = orch.run_controlled_burn(&cfg).await;

        assert_eq!(report.outcome.status, BurnStatus::PartialPass);
        assert!(report.outcome.satisfied_checkpoints.is_empty());
        assert_eq!(report.outcome.reasons.len(), 4);
        assert!(report.outcome.violated_bounds.is_empty());
        assert_eq!(report.monitor_log[0].signal, Signal::LiteralFallback);
    }

    #[tokio::test]
    async fn test_artifacts_are_self_referential() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(FallbackModel::offline(), &dir);
        let cfg = BurnConfig::new("Gamma")
            .with_checkpoints(checkpoints())
            .with_compression_phrase("Tanagra at the Firebreak")
            .with_glyph("🔥");

        let report = orch.run_controlled_burn(&cfg).await;

        let run_id = report.run_id.clone().unwrap();
        let mrj_path = report.mrj_path.clone().unwrap();
        let md_path = report.md_path.clone().unwrap();
        assert_eq!(mrj_path, dir.path().join(format!("{}.mrj.json", run_id)));

        let mrj: RunRecord =
            serde_json::from_str(&std::fs::read_to_string(&mrj_path).unwrap()).unwrap();
        assert_eq!(mrj.meta.version, "MRJ-v1");
        assert_eq!(mrj.meta.run_id, run_id);
        assert_eq!(mrj.protocol.glyph, "🔥");
        assert_eq!(mrj.protocol.compression_phrase, "Tanagra at the Firebreak");
        assert_eq!(mrj.outcome.status, BurnStatus::Pass);
        assert_eq!(mrj.artifacts.report_path, md_path.display().to_string());
        assert_eq!(
            mrj.artifacts.snapshot_path,
            dir.path().join(SNAPSHOT_FILE).display().to_string()
        );

        let md = std::fs::read_to_string(&md_path).unwrap();
        assert!(md.starts_with(&format!("# Burn Report for {}\n\nStatus: pass", run_id)));
        assert!(md.contains("- Backend: mock"));
    }

    #[tokio::test]
    async fn test_chamber_state_recorded() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(FallbackModel::offline(), &dir);
        assert_eq!(orch.chamber(), ChamberState::default());

        let cfg = BurnConfig::new("Gamma").with_entropy(4096).with_overclock(false);
        orch.run_controlled_burn(&cfg).await;

        let chamber = orch.chamber();
        assert!(chamber.entropy_control_active);
        assert!(!chamber.overclock);
        assert_eq!(chamber.entropy_value, 256);
    }

    #[tokio::test]
    async fn test_cycle_failure_is_fail_without_artifacts() {
        let dir = TempDir::new().unwrap();
        let slow = ScriptedClient::slow(Duration::from_millis(200));
        let engine = ReflectionEngine::new(
            Arc::new(FallbackModel::new(vec![Arc::new(slow)]).unwrap()),
            ArtifactWriter::new(dir.path()),
        )
        .with_cycle_timeout(Duration::from_millis(50));
        let orch = BurnOrchestrator::new(engine);

        let report = orch
            .run_controlled_burn(&BurnConfig::new("Gamma").with_checkpoints(checkpoints()))
            .await;

        assert_eq!(report.outcome.status, BurnStatus::Fail);
        assert_eq!(report.outcome.reasons, vec![CYCLE_FAILURE_REASON]);
        assert!(report.outcome.satisfied_checkpoints.is_empty());
        assert!(report.mrj_path.is_none());
        assert!(report.md_path.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unwritable_snapshot_still_reports() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(SNAPSHOT_FILE)).unwrap();
        let orch = orchestrator(FallbackModel::offline(), &dir);

        let report = orch
            .run_controlled_burn(&BurnConfig::new("Gamma").with_checkpoints(checkpoints()))
            .await;

        assert_ne!(report.outcome.status, BurnStatus::Fail);
        assert!(
            dir.path()
                .join(format!("{}.err.txt", SNAPSHOT_FILE))
                .exists()
        );
        assert!(report.snapshot_path.is_none());
        let mrj: RunRecord = serde_json::from_str(
            &std::fs::read_to_string(report.mrj_path.as_ref().unwrap()).unwrap(),
        )
        .unwrap();
        assert_eq!(mrj.artifacts.snapshot_path, "");
        assert!(report.md_path.as_ref().unwrap().exists());
    }

    #[test]
    fn test_unwritable_report_is_not_advertised() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(FallbackModel::offline(), &dir);
        let cfg = BurnConfig::new("Gamma").with_checkpoints(checkpoints());
        let run_id = "burn_blocked";
        std::fs::create_dir(dir.path().join(format!("{}.md", run_id))).unwrap();

        let mut report = BurnReport {
            concept: "Gamma".into(),
            handshake_answer: "x".into(),
            monitor_log: vec![MonitorEvent::new("t0", Signal::LiteralFallback)],
            outcome: BurnOutcome::scored(Vec::new(), checkpoints(), Vec::new()),
            run_id: Some(run_id.to_string()),
            snapshot_path: None,
            mrj_path: None,
            md_path: None,
            backend_used: Some("mock".into()),
        };
        orch.emit_artifacts(&cfg, run_id, &mut report);

        assert!(report.md_path.is_none());
        assert!(dir.path().join(format!("{}.md.err.txt", run_id)).exists());
        let mrj_path = report.mrj_path.clone().unwrap();
        assert_eq!(mrj_path, dir.path().join(format!("{}.mrj.json", run_id)));
        let mrj: RunRecord =
            serde_json::from_str(&std::fs::read_to_string(&mrj_path).unwrap()).unwrap();
        assert_eq!(mrj.artifacts.report_path, "");
    }

    #[tokio::test]
    async fn test_failing_head_reports_offline_backend() {
        let dir = TempDir::new().unwrap();
        let head = Arc::new(ScriptedClient::refusing("primary"));
        let orch = orchestrator(FallbackModel::new(vec![head.clone()]).unwrap(), &dir);

        let report = orch
            .run_controlled_burn(&BurnConfig::new("Gamma").with_checkpoints(checkpoints()))
            .await;

        assert_eq!(report.backend_used.as_deref(), Some("offline"));
        assert!(report.handshake_answer.starts_with("[MOCK RESPONSE]"));
        // Head selection keeps calling the degraded head: handshake plus three cycle calls.
        assert_eq!(head.prompts().len(), 4);
        let md = std::fs::read_to_string(report.md_path.unwrap()).unwrap();
        assert!(md.contains("- Backend: offline"));
    }

    #[test]
    fn test_markdown_lists_reasons() {
        let report = BurnReport {
            concept: "Gamma".into(),
            handshake_answer: "x".into(),
            monitor_log: vec![MonitorEvent::new("t0", Signal::LiteralFallback)],
            outcome: BurnOutcome::scored(
                vec!["Missing checkpoint: Ethics".into()],
                vec!["Purpose".into()],
                vec![],
            ),
            run_id: None,
            snapshot_path: None,
            mrj_path: None,
            md_path: None,
            backend_used: None,
        };
        let md = render_markdown("burn_1", &report);
        assert!(md.starts_with("# Burn Report for burn_1\n\nStatus: partial_pass"));
        assert!(md.contains("- Handshake: literal_fallback"));
        assert!(md.contains("- Satisfied checkpoints: Purpose"));
        assert!(md.contains("## Reasons\n\n- Missing checkpoint: Ethics\n"));
        assert!(!md.contains("Backend"));
    }
}
