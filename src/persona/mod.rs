//! Persona blueprints and instantiation.
//!
//! Blueprints are looked up through a [`BlueprintSource`]. Two are provided:
//! [`MockBlueprints`], which fabricates a blueprint for any non-empty id,
//! and [`DirectoryBlueprints`], which reads `{dir}/{id}.json`.

pub mod instantiation;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use aurora_common::PersonaBlueprint;

pub use instantiation::{InstantiationService, instance_id_for};

/// Where persona blueprints come from.
#[async_trait]
pub trait BlueprintSource: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when no blueprint exists for `persona_id`.
    async fn fetch(&self, persona_id: &str) -> Result<Option<PersonaBlueprint>>;
}

/// Fabricates a minimal blueprint for any non-empty id.
#[derive(Debug, Clone, Default)]
pub struct MockBlueprints;

#[async_trait]
impl BlueprintSource for MockBlueprints {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, persona_id: &str) -> Result<Option<PersonaBlueprint>> {
        tracing::debug!(persona_id, "Fetching mock blueprint");
        if persona_id.is_empty() {
            return Ok(None);
        }
        let mut outline = serde_json::Map::new();
        outline.insert("id".into(), persona_id.into());
        outline.insert("description".into(), "A mock blueprint.".into());
        Ok(Some(PersonaBlueprint {
            id: persona_id.to_string(),
            part1_technical_outline: outline,
            part2_narrative_soul: String::new(),
            optional_modules: Vec::new(),
        }))
    }
}

/// Flat directory of `{id}.json` blueprint files.
#[derive(Debug, Clone)]
pub struct DirectoryBlueprints {
    dir: PathBuf,
}

impl DirectoryBlueprints {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, persona_id: &str) -> Option<PathBuf> {
        let valid = !persona_id.is_empty()
            && persona_id != "."
            && persona_id != ".."
            && !persona_id.contains(['/', '\\']);
        valid.then(|| self.dir.join(format!("{}.json", persona_id)))
    }
}

#[async_trait]
impl BlueprintSource for DirectoryBlueprints {
    fn name(&self) -> &str {
        "directory"
    }

    async fn fetch(&self, persona_id: &str) -> Result<Option<PersonaBlueprint>> {
        let Some(path) = self.path_for(persona_id) else {
            return Ok(None);
        };
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        let blueprint: PersonaBlueprint = serde_json::from_str(&content)
            .with_context(|| format!("Invalid blueprint file {}", path.display()))?;
        Ok(Some(blueprint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_mock_blueprints() {
        let source = MockBlueprints;
        let bp = source.fetch("Jester_Pippin_v1.0").await.unwrap().unwrap();
        assert_eq!(bp.id, "Jester_Pippin_v1.0");
        assert_eq!(bp.part1_technical_outline["description"], "A mock blueprint.");
        assert!(source.fetch("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_directory_blueprints_reads_json() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("Jester_Pippin_v1.0.json"),
            r#"{
                "id": "Jester_Pippin_v1.0",
                "part1_technical_outline": {"core_type": "Emergent Chaotic Good Companion"},
                "part2_narrative_soul": "I am Pippin, a spark of whimsy in the grand machine...",
                "optional_modules": ["Stylized & Expressive Communication"]
            }"#,
        )
        .unwrap();
        let source = DirectoryBlueprints::new(dir.path());

        let bp = source.fetch("Jester_Pippin_v1.0").await.unwrap().unwrap();
        assert_eq!(bp.optional_modules.len(), 1);
        assert!(bp.definition().contains("spark of whimsy"));

        assert!(source.fetch("Unknown_v0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_directory_blueprints_rejects_path_ids() {
        let dir = TempDir::new().unwrap();
        let source = DirectoryBlueprints::new(dir.path().join("inner"));
        std::fs::create_dir(source.dir()).unwrap();
        std::fs::write(dir.path().join("secret.json"), r#"{"id": "secret"}"#).unwrap();

        assert!(source.fetch("../secret").await.unwrap().is_none());
        assert!(source.fetch("..").await.unwrap().is_none());
        assert!(source.fetch("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_directory_blueprints_invalid_json_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ nope").unwrap();
        let source = DirectoryBlueprints::new(dir.path());

        let err = source.fetch("broken").await.unwrap_err();
        assert!(err.to_string().contains("Invalid blueprint file"));
    }
}
