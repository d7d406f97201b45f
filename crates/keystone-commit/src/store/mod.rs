pub mod mem;

pub use mem::MemStore;

use crate::package::{ActionLog, ArtifactBundle};
use async_trait::async_trait;
use keystone_canon::EnvelopeHash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub type DynStore = Arc<dyn StoreConnection>;

/// A writer's last-known position markers in the durable store. Fetched fresh
/// immediately before every commit attempt; any commit for the same writer
/// (by this process or another) advances them, so a cached copy is stale by
/// definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRefs {
    pub activation_id: String,
    pub snapshot_id: String,
}

/// Structured result of a successful aperture commit: the envelope key plus
/// the writer's advanced reference state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub envelope_hash: EnvelopeHash,
    pub refs: AgentRefs,
}

/// Faults raised by a store backend. `Coherence` and `StaleRefs` have
/// protocol meaning and are classified by the adapter; everything else is
/// re-raised to the caller unchanged.
#[derive(Debug, Clone, Error)]
pub enum StoreFault {
    #[error("hash coherence failure for envelope {envelope_hash}: {message}")]
    Coherence {
        envelope_hash: EnvelopeHash,
        computed: Option<EnvelopeHash>,
        message: String,
    },
    #[error("stale reference state for agent '{agent_id}': {message}")]
    StaleRefs { agent_id: String, message: String },
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Query capability over the durable store, injected into the adapter so the
/// protocol is testable without a live backend.
///
/// `commit_action` is the write aperture: the ONLY operation through which
/// envelope state may be mutated. A backend exposing any other write path for
/// envelopes breaks the protocol's integrity contract.
#[async_trait]
pub trait StoreConnection: Send + Sync {
    /// Fetch the writer's current reference state. `None` means the writer
    /// was never bootstrapped in this store.
    async fn fetch_agent_refs(&self, agent_id: &str) -> Result<Option<AgentRefs>, StoreFault>;

    /// The sanctioned commit entry point. The backend must independently
    /// recompute the envelope hash, fail the transaction on disagreement
    /// (`Coherence`), and reject commits whose `expected` refs no longer
    /// match the writer's current state (`StaleRefs`).
    async fn commit_action(
        &self,
        agent_id: &str,
        action_log: &ActionLog,
        bundle: &ArtifactBundle,
        expected: &AgentRefs,
    ) -> Result<CommitReceipt, StoreFault>;

    /// Read back the store's own computed hash for an envelope key. Purely a
    /// coherence diagnostic; the aperture has already enforced agreement.
    async fn fetch_computed_hash(
        &self,
        envelope_hash: EnvelopeHash,
    ) -> Result<Option<EnvelopeHash>, StoreFault>;
}
