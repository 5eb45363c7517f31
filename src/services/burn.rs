//! Controlled burns against registered instances.

use aurora_common::{BurnReport, BurnSummary};
use serde_json::Value;

use crate::burn::{BurnConfig, BurnOrchestrator};
use crate::config::BurnSection;
use crate::errors::ServiceError;
use crate::registry::InstanceRegistry;

/// Concept a burn tests for an instance of `blueprint_id`.
pub fn self_analysis_concept(blueprint_id: &str) -> String {
    format!("Self-analysis of the {} persona protocol", blueprint_id)
}

pub struct BurnService {
    registry: InstanceRegistry,
    orchestrator: BurnOrchestrator,
    defaults: BurnSection,
}

impl BurnService {
    pub fn new(registry: InstanceRegistry, orchestrator: BurnOrchestrator, defaults: BurnSection) -> Self {
        Self {
            registry,
            orchestrator,
            defaults,
        }
    }

    pub fn orchestrator(&self) -> &BurnOrchestrator {
        &self.orchestrator
    }

    /// Burn configuration for `blueprint_id` built from the configured defaults.
    pub fn config_for(&self, blueprint_id: &str) -> BurnConfig {
        BurnConfig::from_section(self_analysis_concept(blueprint_id), &self.defaults)
    }

    /// Run the standard self-analysis burn for an instance.
    pub async fn run_controlled_burn(&self, instance_id: &str) -> Result<BurnSummary, ServiceError> {
        let report = self.run_report(instance_id, None).await?;
        Ok(report.summary())
    }

    /// Run a burn for an instance, with `config` overriding the standard one.
    pub async fn run_report(
        &self,
        instance_id: &str,
        config: Option<BurnConfig>,
    ) -> Result<BurnReport, ServiceError> {
        let instance = self
            .registry
            .snapshot(instance_id)
            .await
            .ok_or_else(|| ServiceError::InstanceNotFound {
                id: instance_id.to_string(),
            })?;
        let cfg = config.unwrap_or_else(|| self.config_for(&instance.blueprint_id));

        self.orchestrator.engine().writer().ensure_dir();
        let report = self.orchestrator.run_controlled_burn(&cfg).await;
        tracing::info!(
            instance_id,
            status = %report.outcome.status,
            backend = report.backend_used.as_deref().unwrap_or("unknown"),
            "Controlled burn finished"
        );

        self.registry
            .update(instance_id, |inst| {
                inst.session_context.insert(
                    "last_burn_status".into(),
                    Value::from(report.outcome.status.as_str()),
                );
                if let Some(run_id) = &report.run_id {
                    inst.session_context
                        .insert("last_burn_run_id".into(), Value::from(run_id.as_str()));
                }
            })
            .await;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactWriter;
    use crate::model::FallbackModel;
    use crate::reflection::ReflectionEngine;
    use aurora_common::{BurnStatus, PersonaInstance};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn service(dir: &TempDir, registry: &InstanceRegistry) -> BurnService {
        let engine = ReflectionEngine::new(
            Arc::new(FallbackModel::offline()),
            ArtifactWriter::new(dir.path().join("out")),
        );
        BurnService::new(
            registry.clone(),
            BurnOrchestrator::new(engine),
            BurnSection::default(),
        )
    }

    #[test]
    fn test_concept_names_blueprint() {
        assert_eq!(
            self_analysis_concept("Jester_Pippin_v1.0"),
            "Self-analysis of the Jester_Pippin_v1.0 persona protocol"
        );
    }

    #[tokio::test]
    async fn test_burn_summary_and_session_context() {
        let dir = TempDir::new().unwrap();
        let registry = InstanceRegistry::new();
        registry
            .register(PersonaInstance::new("active_p_1", "Pippin"))
            .await;
        let svc = service(&dir, &registry);

        let summary = svc.run_controlled_burn("active_p_1").await.unwrap();

        assert_eq!(summary.status, BurnStatus::Pass);
        assert_eq!(summary.backend_used.as_deref(), Some("mock"));
        assert!(summary.mrj_report_path.unwrap().exists());
        assert!(summary.markdown_report_path.unwrap().exists());

        let snap = registry.snapshot("active_p_1").await.unwrap();
        assert_eq!(snap.session_context["last_burn_status"], json!("pass"));
        assert!(
            snap.session_context["last_burn_run_id"]
                .as_str()
                .unwrap()
                .starts_with("burn_")
        );
    }

    #[tokio::test]
    async fn test_burn_unknown_instance_is_not_found() {
        let dir = TempDir::new().unwrap();
        let registry = InstanceRegistry::new();
        let svc = service(&dir, &registry);

        let err = svc.run_controlled_burn("ghost").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_config_for_uses_standard_checkpoints() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, &InstanceRegistry::new());
        let cfg = svc.config_for("Pippin");
        assert_eq!(
            cfg.checkpoints(),
            ["Purpose", "Methodology", "Ethics", "Recovery"]
        );
        assert_eq!(cfg.glyph(), "🔥");
        assert_eq!(cfg.compression_phrase(), "Tanagra at the Firebreak");
    }
}
