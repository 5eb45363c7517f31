//! Service layer shared by the HTTP API and the CLI.
//!
//! [`AuroraRuntime`] wires one model chain, one artifact directory and one
//! instance registry into the four services. Nothing here is global; every
//! caller holds its own runtime.

pub mod burn;
pub mod genesis;
pub mod turn;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::artifacts::ArtifactWriter;
use crate::burn::BurnOrchestrator;
use crate::config::{BurnSection, Config};
use crate::model::{FallbackModel, GenerateOptions, build_fallback_model};
use crate::persona::{BlueprintSource, DirectoryBlueprints, InstantiationService, MockBlueprints};
use crate::reflection::ReflectionEngine;
use crate::reflection::baseline::BaselineEngine;
use crate::registry::InstanceRegistry;

pub use burn::{BurnService, self_analysis_concept};
pub use genesis::GenesisService;
pub use turn::{TurnService, build_turn_prompt};

pub struct AuroraRuntime {
    pub registry: InstanceRegistry,
    pub model: Arc<FallbackModel>,
    pub personas: InstantiationService,
    pub turns: TurnService,
    pub burns: BurnService,
    pub genesis: GenesisService,
}

impl AuroraRuntime {
    /// Runtime described by `config`. Blueprints come from
    /// `[personas] blueprint_dir` when set, otherwise they are mocked.
    pub fn from_config(config: &Config) -> Result<Self> {
        let model = Arc::new(build_fallback_model(&config.toml.model)?);
        let writer = ArtifactWriter::new(config.save_path());
        let mut builder = RuntimeBuilder::new(model, writer)
            .options(config.toml.model.options())
            .burn_defaults(config.toml.burn.clone());
        if let Some(dir) = &config.toml.personas.blueprint_dir {
            builder = builder.blueprints(Arc::new(DirectoryBlueprints::new(dir)));
        }
        Ok(builder.build())
    }

    /// Offline runtime writing artifacts under `writer`.
    pub fn offline(writer: ArtifactWriter) -> Self {
        RuntimeBuilder::new(Arc::new(FallbackModel::offline()), writer).build()
    }
}

pub struct RuntimeBuilder {
    model: Arc<FallbackModel>,
    writer: ArtifactWriter,
    options: GenerateOptions,
    burn_defaults: BurnSection,
    blueprints: Arc<dyn BlueprintSource>,
    registry: InstanceRegistry,
}

impl RuntimeBuilder {
    pub fn new(model: Arc<FallbackModel>, writer: ArtifactWriter) -> Self {
        Self {
            model,
            writer,
            options: GenerateOptions::default(),
            burn_defaults: BurnSection::default(),
            blueprints: Arc::new(MockBlueprints),
            registry: InstanceRegistry::new(),
        }
    }

    pub fn options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn burn_defaults(mut self, section: BurnSection) -> Self {
        self.burn_defaults = section;
        self
    }

    pub fn blueprints(mut self, source: Arc<dyn BlueprintSource>) -> Self {
        self.blueprints = source;
        self
    }

    pub fn registry(mut self, registry: InstanceRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> AuroraRuntime {
        let engine = ReflectionEngine::new(self.model.clone(), self.writer)
            .with_options(self.options)
            .with_cycle_timeout(Duration::from_secs(self.burn_defaults.cycle_timeout_secs));
        let registry = self.registry;
        AuroraRuntime {
            personas: InstantiationService::new(self.blueprints, registry.clone()),
            turns: TurnService::new(registry.clone(), self.model.clone(), self.options),
            burns: BurnService::new(
                registry.clone(),
                BurnOrchestrator::new(engine),
                self.burn_defaults,
            ),
            genesis: GenesisService::new(
                registry.clone(),
                BaselineEngine::new(self.model.clone()).with_options(self.options),
            ),
            model: self.model,
            registry,
        }
    }
}
