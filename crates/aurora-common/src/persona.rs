use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named attributes (state vector) or free-form interaction metadata
/// (session context). Ordered so prompts built from it are reproducible.
pub type StateMap = BTreeMap<String, Value>;

/// The stored, static definition of a persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaBlueprint {
    pub id: String,
    #[serde(default)]
    pub part1_technical_outline: serde_json::Map<String, Value>,
    #[serde(default)]
    pub part2_narrative_soul: String,
    #[serde(default)]
    pub optional_modules: Vec<String>,
}

impl PersonaBlueprint {
    /// Render the blueprint as the "core definition" text embedded in turn prompts.
    pub fn definition(&self) -> String {
        let outline = serde_json::to_string_pretty(&self.part1_technical_outline)
            .unwrap_or_else(|_| "{}".to_string());
        if self.part2_narrative_soul.is_empty() {
            outline
        } else {
            format!("{}\n\n{}", outline, self.part2_narrative_soul)
        }
    }
}

/// An activated persona with mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaInstance {
    pub instance_id: String,
    pub blueprint_id: String,
    #[serde(default = "default_state_vector")]
    pub current_state_vector: StateMap,
    #[serde(default)]
    pub session_context: StateMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

fn default_state_vector() -> StateMap {
    let mut state = StateMap::new();
    state.insert("mood".to_string(), Value::from("neutral"));
    state.insert("focus".to_string(), Value::from("initialization"));
    state
}

impl PersonaInstance {
    pub fn new(instance_id: impl Into<String>, blueprint_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            blueprint_id: blueprint_id.into(),
            current_state_vector: default_state_vector(),
            session_context: StateMap::new(),
            definition: None,
        }
    }

    /// Apply `updates` to the state vector. Keys the vector does not already
    /// carry are ignored. Returns the keys that changed, in update order.
    pub fn update_state(&mut self, updates: &StateMap) -> Vec<String> {
        let mut applied = Vec::new();
        for (key, value) in updates {
            if let Some(slot) = self.current_state_vector.get_mut(key) {
                *slot = value.clone();
                applied.push(key.clone());
            }
        }
        applied
    }
}
