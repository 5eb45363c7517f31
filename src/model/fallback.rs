use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::mock::offline_echo;
use super::{GenerateOptions, Generation, ModelClient, OFFLINE_BACKEND};
use crate::errors::ModelError;

/// How the chain picks the client that serves the next request.
///
/// | Policy         | Selected client                                           |
/// |----------------|-----------------------------------------------------------|
/// | `Head`         | Always the first member                                   |
/// | `FirstHealthy` | First member not marked degraded and not over its budget  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    #[default]
    Head,
    FirstHealthy,
}

struct ChainMember {
    client: Arc<dyn ModelClient>,
    call_budget: Option<u32>,
    calls: AtomicU32,
    degraded: AtomicBool,
}

impl ChainMember {
    fn budget_left(&self) -> bool {
        self.call_budget
            .is_none_or(|budget| self.calls.load(Ordering::SeqCst) < budget)
    }

    fn is_healthy(&self) -> bool {
        !self.degraded.load(Ordering::SeqCst) && self.budget_left()
    }

    /// Take one call from the budget. Check and increment are a single
    /// atomic step, so concurrent requests never both get the last call.
    fn reserve(&self) -> bool {
        self.calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |calls| {
                self.call_budget
                    .is_none_or(|budget| calls < budget)
                    .then_some(calls.saturating_add(1))
            })
            .is_ok()
    }

    fn exhausted(&self) -> ModelError {
        ModelError::BudgetExhausted {
            client: self.client.name().to_string(),
        }
    }
}

/// Ordered chain of model clients with exactly one selected member.
///
/// Each `generate` call reaches at most one backend. When that call fails
/// the request is answered with the offline echo, the member is marked
/// degraded, and under `FirstHealthy` later requests move down the chain.
pub struct FallbackModel {
    members: Vec<ChainMember>,
    policy: SelectionPolicy,
}

impl FallbackModel {
    pub fn builder() -> FallbackModelBuilder {
        FallbackModelBuilder::default()
    }

    /// Chain of `clients` with the `Head` policy and no budgets.
    pub fn new(clients: Vec<Arc<dyn ModelClient>>) -> Result<Self> {
        clients
            .into_iter()
            .fold(Self::builder(), |b, c| b.client(c))
            .build()
    }

    /// Single offline mock client.
    pub fn offline() -> Self {
        Self {
            members: vec![ChainMember {
                client: Arc::new(super::MockClient::new()),
                call_budget: None,
                calls: AtomicU32::new(0),
                degraded: AtomicBool::new(false),
            }],
            policy: SelectionPolicy::Head,
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Names of all chain members, in order.
    pub fn chain(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.client.name()).collect()
    }

    fn selected_index(&self) -> Option<usize> {
        match self.policy {
            SelectionPolicy::Head => Some(0),
            SelectionPolicy::FirstHealthy => self.members.iter().position(ChainMember::is_healthy),
        }
    }

    /// Identity of the currently selected client.
    pub fn name(&self) -> &str {
        self.selected_index()
            .map_or("unselected", |i| self.members[i].client.name())
    }

    /// Pick the member for one request and reserve a call on it.
    ///
    /// Under `FirstHealthy` a member whose budget runs out between the health
    /// check and the reservation is skipped in favour of the next one.
    fn reserve_member(&self) -> Result<&ChainMember, Option<ModelError>> {
        match self.policy {
            SelectionPolicy::Head => {
                let head = &self.members[0];
                if head.reserve() {
                    Ok(head)
                } else {
                    Err(Some(head.exhausted()))
                }
            }
            SelectionPolicy::FirstHealthy => self
                .members
                .iter()
                .filter(|m| !m.degraded.load(Ordering::SeqCst))
                .find(|m| m.reserve())
                .ok_or(None),
        }
    }

    /// Forward `prompt` to the selected client. Never fails.
    pub async fn generate(&self, prompt: &str, options: &GenerateOptions) -> String {
        self.generate_traced(prompt, options).await.text
    }

    /// Like [`generate`](Self::generate), also naming who produced the text:
    /// the member that answered, or [`OFFLINE_BACKEND`] for the echo.
    pub async fn generate_traced(&self, prompt: &str, options: &GenerateOptions) -> Generation {
        let member = match self.reserve_member() {
            Ok(member) => member,
            Err(None) => {
                tracing::warn!("No healthy model client left in chain, answering offline");
                return Generation::offline(prompt);
            }
            Err(Some(e)) => {
                self.members[0].degraded.store(true, Ordering::SeqCst);
                tracing::warn!(policy = ?self.policy, "Model backend degraded, answering offline: {}", e);
                return Generation::offline(prompt);
            }
        };
        let client = member.client.name();
        tracing::debug!(client, prompt_chars = prompt.len(), "Dispatching model request");

        match member.client.generate(prompt, options).await {
            Ok(text) => Generation {
                text,
                served_by: client.to_string(),
            },
            Err(e) => {
                member.degraded.store(true, Ordering::SeqCst);
                tracing::warn!(
                    client,
                    policy = ?self.policy,
                    "Model backend degraded, answering offline: {}",
                    e
                );
                Generation::offline(prompt)
            }
        }
    }

    /// Clear degraded flags and call counters on every member.
    #[cfg(test)]
    pub(crate) fn reset(&self) {
        for member in &self.members {
            member.degraded.store(false, Ordering::SeqCst);
            member.calls.store(0, Ordering::SeqCst);
        }
    }
}

impl std::fmt::Debug for FallbackModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackModel")
            .field("chain", &self.chain())
            .field("policy", &self.policy)
            .finish()
    }
}

#[derive(Default)]
pub struct FallbackModelBuilder {
    members: Vec<ChainMember>,
    policy: SelectionPolicy,
}

impl FallbackModelBuilder {
    pub fn policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn client(self, client: Arc<dyn ModelClient>) -> Self {
        self.client_with_budget(client, None)
    }

    pub fn client_with_budget(mut self, client: Arc<dyn ModelClient>, budget: Option<u32>) -> Self {
        self.members.push(ChainMember {
            client,
            call_budget: budget,
            calls: AtomicU32::new(0),
            degraded: AtomicBool::new(false),
        });
        self
    }

    pub fn build(self) -> Result<FallbackModel> {
        if self.members.is_empty() {
            anyhow::bail!("Model fallback chain must contain at least one client");
        }
        Ok(FallbackModel {
            members: self.members,
            policy: self.policy,
        })
    }
}
