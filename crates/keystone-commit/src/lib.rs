//! The envelope commit protocol: dual-layer hashed, fail-closed persistence
//! of structured records.
//!
//! Every envelope is hashed twice — once by the in-process validation kernel
//! ([`keystone_kernel::Kernel`]) and once, independently, by the durable
//! store behind the [`StoreConnection`] aperture. The [`CommitAdapter`]
//! sequences local validation, fresh reference-state acquisition, artifact
//! packaging, the single sanctioned write, and a post-commit coherence
//! read-back; a disagreement between the two hash layers fails the commit
//! with nothing persisted.

pub mod adapter;
pub mod package;
pub mod store;

pub use adapter::{CommitAdapter, CommitConfig, CommitError, CommitOutcome, FALLBACK_AGENT};
pub use package::{ACTION_PERSIST_ENVELOPE, ActionLog, ArtifactBundle, EnvelopeArtifact};
pub use store::{AgentRefs, CommitReceipt, DynStore, MemStore, StoreConnection, StoreFault};
