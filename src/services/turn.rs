//! Conversational turns against registered instances.

use std::sync::Arc;

use aurora_common::{PersonaInstance, StateMap};
use serde_json::Value;

use crate::errors::ServiceError;
use crate::model::{FallbackModel, GenerateOptions};
use crate::registry::InstanceRegistry;

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

fn bullet_lines(map: &StateMap) -> String {
    map.iter()
        .map(|(k, v)| format!("- {}: {}", k, render_value(v)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for one turn of `instance` answering `message`.
pub fn build_turn_prompt(instance: &PersonaInstance, message: &str) -> String {
    let persona = &instance.blueprint_id;
    let mut sections = vec![format!(
        "**System Directive:** Embody the {} persona.",
        persona
    )];
    if let Some(definition) = &instance.definition {
        sections.push(format!("**Your Core Definition:**\n{}", definition));
    }
    sections.push(format!(
        "**Your Current Internal State Vector:**\n{}",
        bullet_lines(&instance.current_state_vector)
    ));
    sections.push(format!(
        "**Shared Interaction Context:**\n{}",
        bullet_lines(&instance.session_context)
    ));
    sections.push(format!("**User Query:**\n{}", message));
    sections.push(format!("**Your Response (as {}):**", persona));
    sections.join("\n")
}

pub struct TurnService {
    registry: InstanceRegistry,
    model: Arc<FallbackModel>,
    options: GenerateOptions,
}

impl TurnService {
    pub fn new(registry: InstanceRegistry, model: Arc<FallbackModel>, options: GenerateOptions) -> Self {
        Self {
            registry,
            model,
            options,
        }
    }

    /// Generate the persona's reply to `message` and record the turn in the
    /// instance's session context.
    pub async fn process_turn(&self, instance_id: &str, message: &str) -> Result<String, ServiceError> {
        let instance = self
            .registry
            .snapshot(instance_id)
            .await
            .ok_or_else(|| ServiceError::InstanceNotFound {
                id: instance_id.to_string(),
            })?;

        let prompt = build_turn_prompt(&instance, message);
        let response = self.model.generate(&prompt, &self.options).await;
        tracing::info!(
            instance_id,
            client = self.model.name(),
            response_chars = response.len(),
            "Processed turn"
        );

        self.registry
            .update(instance_id, |inst| {
                inst.session_context
                    .insert("last_speaker".into(), Value::from("user"));
                inst.session_context
                    .insert("last_user_query".into(), Value::from(message));
            })
            .await;
        Ok(response)
    }

    /// Apply `updates` to existing state keys. Returns the keys that changed.
    pub async fn update_state(
        &self,
        instance_id: &str,
        updates: &StateMap,
    ) -> Result<Vec<String>, ServiceError> {
        let applied = self
            .registry
            .update(instance_id, |inst| inst.update_state(updates))
            .await
            .ok_or_else(|| ServiceError::InstanceNotFound {
                id: instance_id.to_string(),
            })?;
        tracing::info!(instance_id, applied = ?applied, "Updated state vector");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::test_support::ScriptedClient;
    use serde_json::json;

    fn instance() -> PersonaInstance {
        let mut inst = PersonaInstance::new("active_Pippin_1", "Pippin");
        inst.current_state_vector.insert("confidence".into(), json!(0.9));
        inst.session_context
            .insert("status".into(), json!("Rehydrated successfully"));
        inst
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_turn_prompt(&instance(), "Hello?");
        assert_eq!(
            prompt,
            "**System Directive:** Embody the Pippin persona.\n\
             **Your Current Internal State Vector:**\n\
             - confidence: 0.9\n- focus: initialization\n- mood: neutral\n\
             **Shared Interaction Context:**\n- status: Rehydrated successfully\n\
             **User Query:**\nHello?\n\
             **Your Response (as Pippin):**"
        );
    }

    #[test]
    fn test_prompt_includes_definition_when_known() {
        let mut inst = instance();
        inst.definition = Some("I am Pippin.".into());
        let prompt = build_turn_prompt(&inst, "hi");
        assert!(prompt.contains("**Your Core Definition:**\nI am Pippin.\n"));
    }

    #[tokio::test]
    async fn test_process_turn_records_last_query() {
        let registry = InstanceRegistry::new();
        registry.register(instance()).await;
        let client = Arc::new(ScriptedClient::new(&["Well met!"]));
        let model = Arc::new(FallbackModel::new(vec![client.clone()]).unwrap());
        let svc = TurnService::new(registry.clone(), model, GenerateOptions::default());

        let reply = svc.process_turn("active_Pippin_1", "Who are you?").await.unwrap();

        assert_eq!(reply, "Well met!");
        assert!(client.prompts()[0].contains("**User Query:**\nWho are you?"));
        let snap = registry.snapshot("active_Pippin_1").await.unwrap();
        assert_eq!(snap.session_context["last_speaker"], json!("user"));
        assert_eq!(snap.session_context["last_user_query"], json!("Who are you?"));
    }

    #[tokio::test]
    async fn test_process_turn_unknown_instance() {
        let registry = InstanceRegistry::new();
        let client = Arc::new(ScriptedClient::new(&[]));
        let model = Arc::new(FallbackModel::new(vec![client.clone()]).unwrap());
        let svc = TurnService::new(registry.clone(), model, GenerateOptions::default());

        let err = svc.process_turn("missing", "hi").await.unwrap_err();

        assert!(matches!(err, ServiceError::InstanceNotFound { ref id } if id == "missing"));
        assert!(registry.is_empty().await);
        assert!(client.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_update_state_only_touches_existing_keys() {
        let registry = InstanceRegistry::new();
        registry.register(instance()).await;
        let svc = TurnService::new(
            registry.clone(),
            Arc::new(FallbackModel::offline()),
            GenerateOptions::default(),
        );
        let mut updates = StateMap::new();
        updates.insert("mood".into(), json!("playful"));
        updates.insert("altitude".into(), json!(30000));

        let applied = svc.update_state("active_Pippin_1", &updates).await.unwrap();

        assert_eq!(applied, vec!["mood"]);
        let snap = registry.snapshot("active_Pippin_1").await.unwrap();
        assert_eq!(snap.current_state_vector["mood"], json!("playful"));
        assert!(!snap.current_state_vector.contains_key("altitude"));

        assert!(svc.update_state("nope", &updates).await.is_err());
    }
}
