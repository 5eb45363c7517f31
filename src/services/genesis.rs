//! Dynamic persona generation.

use aurora_common::{PersonaInstance, StateMap};
use serde_json::Value;

use crate::errors::ServiceError;
use crate::persona::instance_id_for;
use crate::reflection::baseline::BaselineEngine;
use crate::registry::InstanceRegistry;

fn generated_state() -> StateMap {
    let mut state = StateMap::new();
    state.insert("mood".into(), Value::from("neutral"));
    state.insert("confidence".into(), Value::from(0.7));
    state.insert("focus".into(), Value::from("initial_interaction"));
    state
}

pub struct GenesisService {
    registry: InstanceRegistry,
    engine: BaselineEngine,
}

impl GenesisService {
    pub fn new(registry: InstanceRegistry, engine: BaselineEngine) -> Self {
        Self { registry, engine }
    }

    /// Generate a new persona from `directive`, register it and return it.
    pub async fn generate_persona(&self, directive: &str) -> Result<PersonaInstance, ServiceError> {
        let directive = directive.trim();
        if directive.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "creation directive must not be empty".to_string(),
            ));
        }

        let generated = self.engine.run_genesis(directive).await;

        let mut instance = PersonaInstance::new(
            instance_id_for(&generated.persona_id),
            generated.persona_id.clone(),
        );
        instance.current_state_vector = generated_state();
        instance
            .session_context
            .insert("session_topic".into(), Value::from("Initiation"));
        instance.definition = Some(generated.definition);

        self.registry.register(instance.clone()).await;
        Ok(instance)
    }
}
