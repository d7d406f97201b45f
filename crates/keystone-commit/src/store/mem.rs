use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keystone_canon::EnvelopeHash;
use serde_json::Value;
use uuid::Uuid;

use super::{AgentRefs, CommitReceipt, StoreConnection, StoreFault};
use crate::package::{ActionLog, ArtifactBundle};

/// In-memory store implementing the full aperture semantics: reference-state
/// conflict detection, independent hash recomputation, atomic row insert plus
/// reference advance, and an action-log audit trail. Useful for unit tests
/// and local validation runs.
#[derive(Default, Clone)]
pub struct MemStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    agents: HashMap<String, AgentRefs>,
    envelopes: HashMap<EnvelopeHash, StoredEnvelope>,
    action_log: Vec<(String, ActionLog)>,
}

#[derive(Debug, Clone)]
struct StoredEnvelope {
    record_type: String,
    envelope: Value,
    computed_hash: EnvelopeHash,
}

impl std::fmt::Debug for MemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("MemStore")
            .field("agents", &inner.agents.len())
            .field("envelopes", &inner.envelopes.len())
            .field("action_log", &inner.action_log.len())
            .finish()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a reference row for a writer. Commits for an agent without
    /// one fail closed.
    pub fn bootstrap_agent(&self, agent_id: &str) -> AgentRefs {
        let refs = AgentRefs {
            activation_id: Uuid::new_v4().to_string(),
            snapshot_id: Uuid::new_v4().to_string(),
        };
        let mut inner = self.inner.lock().unwrap();
        inner.agents.insert(agent_id.to_string(), refs.clone());
        refs
    }

    /// Snapshot of the audit trail, in commit order.
    pub fn action_entries(&self) -> Vec<(String, ActionLog)> {
        self.inner.lock().unwrap().action_log.clone()
    }

    pub fn envelope_count(&self) -> usize {
        self.inner.lock().unwrap().envelopes.len()
    }

    /// Record type and envelope body persisted under a hash key, if any.
    pub fn get_envelope(&self, envelope_hash: EnvelopeHash) -> Option<(String, Value)> {
        self.inner
            .lock()
            .unwrap()
            .envelopes
            .get(&envelope_hash)
            .map(|stored| (stored.record_type.clone(), stored.envelope.clone()))
    }
}

#[async_trait]
impl StoreConnection for MemStore {
    async fn fetch_agent_refs(&self, agent_id: &str) -> Result<Option<AgentRefs>, StoreFault> {
        Ok(self.inner.lock().unwrap().agents.get(agent_id).cloned())
    }

    async fn commit_action(
        &self,
        agent_id: &str,
        action_log: &ActionLog,
        bundle: &ArtifactBundle,
        expected: &AgentRefs,
    ) -> Result<CommitReceipt, StoreFault> {
        let mut inner = self.inner.lock().unwrap();

        let current = inner
            .agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| StoreFault::Backend(format!("agent '{agent_id}' has no reference row")))?;
        if *expected != current {
            return Err(StoreFault::StaleRefs {
                agent_id: agent_id.to_string(),
                message: format!(
                    "expected ({}, {}) but current is ({}, {})",
                    expected.activation_id,
                    expected.snapshot_id,
                    current.activation_id,
                    current.snapshot_id
                ),
            });
        }

        let [artifact] = bundle.envelopes.as_slice() else {
            return Err(StoreFault::Backend(format!(
                "bundle must contain exactly one envelope, got {}",
                bundle.envelopes.len()
            )));
        };
        if action_log.envelope_hash != artifact.envelope_hash {
            return Err(StoreFault::Backend(
                "action log hash does not match bundled envelope hash".into(),
            ));
        }

        // Independent recomputation. Disagreement fails the transaction with
        // nothing persisted.
        let computed = EnvelopeHash::of_value(&artifact.envelope)
            .map_err(|err| StoreFault::Backend(err.to_string()))?;
        if computed != artifact.envelope_hash {
            return Err(StoreFault::Coherence {
                envelope_hash: artifact.envelope_hash,
                computed: Some(computed),
                message: format!(
                    "declared {} but store computed {computed}",
                    artifact.envelope_hash
                ),
            });
        }

        let advanced = AgentRefs {
            activation_id: current.activation_id,
            snapshot_id: Uuid::new_v4().to_string(),
        };
        inner.envelopes.insert(
            artifact.envelope_hash,
            StoredEnvelope {
                record_type: artifact.record_type.clone(),
                envelope: artifact.envelope.clone(),
                computed_hash: computed,
            },
        );
        inner
            .agents
            .insert(agent_id.to_string(), advanced.clone());
        inner
            .action_log
            .push((agent_id.to_string(), action_log.clone()));

        Ok(CommitReceipt {
            envelope_hash: artifact.envelope_hash,
            refs: advanced,
        })
    }

    async fn fetch_computed_hash(
        &self,
        envelope_hash: EnvelopeHash,
    ) -> Result<Option<EnvelopeHash>, StoreFault> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .envelopes
            .get(&envelope_hash)
            .map(|stored| stored.computed_hash))
    }
}
