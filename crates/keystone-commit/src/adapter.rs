use keystone_canon::EnvelopeHash;
use keystone_kernel::{Classification, Kernel, KernelError, Verdict, json_type_name};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::package;
use crate::store::{DynStore, StoreFault};

/// Process-wide last-resort writer identity, used when neither a per-call
/// override nor a configured default is present.
pub const FALLBACK_AGENT: &str = "agent-local";

/// Adapter configuration, passed explicitly at construction. No environment
/// lookups happen inside the protocol.
#[derive(Debug, Clone, Default)]
pub struct CommitConfig {
    /// Default writer identity when a call supplies no override.
    pub default_agent: Option<String>,
}

/// Unified caller-facing outcome of a commit attempt. Rejections and
/// coherence failures are data, not errors; `Validated` is never silently
/// equated with durable persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// Terminal rejection, pre-commit (kernel policy) or store-side
    /// (hash coherence). No envelope row persists.
    Rejected {
        classification: Classification,
        reason: String,
    },
    /// Kernel accepted but no store is configured: validation-only mode.
    Validated {
        agent_id: String,
        envelope_hash: EnvelopeHash,
    },
    /// Durably committed. `store_computed_hash` is the coherence read-back;
    /// `None` on success is an anomaly (logged) rather than a failure.
    Stored {
        agent_id: String,
        record_type: String,
        envelope_hash: EnvelopeHash,
        store_computed_hash: Option<EnvelopeHash>,
    },
}

/// Fault taxonomy for the commit call. Caller errors are raised before any
/// kernel or store contact; unclassified store faults pass through unchanged.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("envelope must be a JSON object, got {found}")]
    CallerEnvelope { found: &'static str },
    #[error("record type must be a non-empty identifier")]
    CallerRecordType,
    #[error("envelope field 'record_type' is {found:?} but caller declared '{declared}'")]
    RecordTypeMismatch {
        declared: String,
        found: Option<String>,
    },
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error("agent '{agent_id}' has no reference row; bootstrap it before committing")]
    BootstrapRequired { agent_id: String },
    #[error("commit lost a reference-state conflict for agent '{agent_id}': {message}")]
    StaleReferences { agent_id: String, message: String },
    #[error(transparent)]
    Store(StoreFault),
}

/// Orchestrator of the envelope commit protocol.
///
/// Sequences local validation, reference-state acquisition, packaging, the
/// aperture write, and the coherence read-back. Holds no mutable state across
/// calls, so concurrent commits (same or different writers) are safe; the
/// store detects ordering conflicts via the expected reference state.
pub struct CommitAdapter {
    kernel: Kernel,
    store: Option<DynStore>,
    config: CommitConfig,
}

impl CommitAdapter {
    /// Adapter without a store: kernel validation only, `commit` returns
    /// [`CommitOutcome::Validated`]. Used for dry runs and local testing.
    pub fn new(kernel: Kernel, config: CommitConfig) -> Self {
        Self {
            kernel,
            store: None,
            config,
        }
    }

    pub fn with_store(kernel: Kernel, config: CommitConfig, store: DynStore) -> Self {
        Self {
            kernel,
            store: Some(store),
            config,
        }
    }

    fn resolve_agent(&self, agent_override: Option<&str>) -> String {
        agent_override
            .map(str::to_string)
            .or_else(|| self.config.default_agent.clone())
            .unwrap_or_else(|| FALLBACK_AGENT.to_string())
    }

    /// Commit one envelope through the canonical write path.
    ///
    /// Exactly one durable mutation happens per successful call (the aperture
    /// write); every other step is read-only or local. No internal retries:
    /// re-submitting after a stale-reference conflict requires fresh
    /// reference state, which only a new call acquires.
    pub async fn commit(
        &self,
        envelope: &Value,
        record_type: &str,
        agent_override: Option<&str>,
    ) -> Result<CommitOutcome, CommitError> {
        let agent_id = self.resolve_agent(agent_override);

        // Caller errors, before any kernel or store contact.
        let fields = envelope.as_object().ok_or(CommitError::CallerEnvelope {
            found: json_type_name(envelope),
        })?;
        if record_type.trim().is_empty() {
            return Err(CommitError::CallerRecordType);
        }
        let marker = fields.get("record_type").and_then(Value::as_str);
        if marker != Some(record_type) {
            return Err(CommitError::RecordTypeMismatch {
                declared: record_type.to_string(),
                found: marker.map(str::to_string),
            });
        }

        let declared = EnvelopeHash::of_value(envelope).map_err(KernelError::from)?;

        let envelope_hash = match self.kernel.commit_action(record_type, declared, envelope)? {
            Verdict::Rejected {
                classification,
                reason,
            } => {
                log::debug!("kernel rejected '{record_type}' for '{agent_id}': {classification}");
                return Ok(CommitOutcome::Rejected {
                    classification,
                    reason,
                });
            }
            // The verdict's hash, not the raw declared one: stays correct
            // even if the kernel ever normalizes it.
            Verdict::Accepted { envelope_hash } => envelope_hash,
        };

        let Some(store) = &self.store else {
            log::debug!("no store configured; '{record_type}' validated only");
            return Ok(CommitOutcome::Validated {
                agent_id,
                envelope_hash,
            });
        };

        // Fresh reference state per attempt; a missing row means the writer
        // was never bootstrapped and the commit fails closed.
        let refs = store
            .fetch_agent_refs(&agent_id)
            .await
            .map_err(CommitError::Store)?
            .ok_or_else(|| CommitError::BootstrapRequired {
                agent_id: agent_id.clone(),
            })?;

        let (action_log, bundle) = package::package(record_type, envelope_hash, envelope.clone());

        match store
            .commit_action(&agent_id, &action_log, &bundle, &refs)
            .await
        {
            Ok(receipt) => {
                log::debug!(
                    "committed '{record_type}' {envelope_hash} for '{agent_id}' (request {})",
                    action_log.request_id
                );
                debug_assert_eq!(receipt.envelope_hash, envelope_hash);
            }
            Err(StoreFault::Coherence {
                envelope_hash,
                computed,
                message,
            }) => {
                log::warn!(
                    "hash coherence failure for {envelope_hash} (store computed {computed:?})"
                );
                return Ok(CommitOutcome::Rejected {
                    classification: Classification::HashCoherenceFailure,
                    reason: message,
                });
            }
            Err(StoreFault::StaleRefs { message, .. }) => {
                return Err(CommitError::StaleReferences { agent_id, message });
            }
            Err(fault) => return Err(CommitError::Store(fault)),
        }

        // Defense-in-depth read-back of the store's own hash column.
        let store_computed_hash = store
            .fetch_computed_hash(envelope_hash)
            .await
            .map_err(CommitError::Store)?;
        if store_computed_hash.is_none() {
            log::warn!("no computed-hash row found for {envelope_hash} after a successful commit");
        }

        Ok(CommitOutcome::Stored {
            agent_id,
            record_type: record_type.to_string(),
            envelope_hash,
            store_computed_hash,
        })
    }
}
