//! Commit packager: pure construction of the action-log record and artifact
//! bundle the write aperture consumes. No I/O here.

use keystone_canon::EnvelopeHash;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// The single action the adapter performs through the aperture.
pub const ACTION_PERSIST_ENVELOPE: &str = "persist_envelope";

/// Description of the action being committed, recorded alongside the
/// envelope for audit traceability. Built fresh per call, never persisted on
/// its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    pub action: String,
    pub request_id: String,
    pub dry_run: bool,
    pub record_type: String,
    pub envelope_hash: EnvelopeHash,
}

/// One committed envelope artifact: authoritative hash, record type, and the
/// full envelope the store will independently re-hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeArtifact {
    pub envelope_hash: EnvelopeHash,
    pub record_type: String,
    pub envelope: Value,
}

/// Payload for the aperture, keyed by artifact kind. Envelope commits carry
/// exactly one entry under `envelopes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub envelopes: Vec<EnvelopeArtifact>,
}

/// Build the action log and artifact bundle for a single-envelope commit.
/// `envelope_hash` must be the verdict's authoritative hash.
pub fn package(
    record_type: &str,
    envelope_hash: EnvelopeHash,
    envelope: Value,
) -> (ActionLog, ArtifactBundle) {
    let action_log = ActionLog {
        action: ACTION_PERSIST_ENVELOPE.to_string(),
        request_id: request_id(),
        dry_run: false,
        record_type: record_type.to_string(),
        envelope_hash,
    };
    let bundle = ArtifactBundle {
        envelopes: vec![EnvelopeArtifact {
            envelope_hash,
            record_type: record_type.to_string(),
            envelope,
        }],
    };
    (action_log, bundle)
}

/// Writer-scoped, monotonically-likely-unique request token: millisecond
/// timestamp plus a random suffix. Practical per-writer uniqueness is all the
/// audit trail needs; global uniqueness is not a requirement.
pub fn request_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("req-{millis:x}-{}", &suffix[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bundle_carries_exactly_one_artifact_with_matching_hash() {
        let envelope = json!({"record_type": "model_call", "model": "m1"});
        let hash = EnvelopeHash::of_value(&envelope).expect("hash");
        let (action_log, bundle) = package("model_call", hash, envelope.clone());

        assert_eq!(action_log.action, ACTION_PERSIST_ENVELOPE);
        assert!(!action_log.dry_run);
        assert_eq!(action_log.record_type, "model_call");
        assert_eq!(action_log.envelope_hash, hash);

        assert_eq!(bundle.envelopes.len(), 1);
        assert_eq!(bundle.envelopes[0].envelope_hash, hash);
        assert_eq!(bundle.envelopes[0].record_type, "model_call");
        assert_eq!(bundle.envelopes[0].envelope, envelope);
    }

    #[test]
    fn request_ids_are_unique_per_call() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(request_id()));
        }
    }

    #[test]
    fn bundle_serializes_under_the_envelopes_key() {
        let envelope = json!({"record_type": "tool_call", "tool": "t"});
        let hash = EnvelopeHash::of_value(&envelope).expect("hash");
        let (_, bundle) = package("tool_call", hash, envelope);
        let json = serde_json::to_value(&bundle).expect("encode");
        assert!(json.get("envelopes").is_some());
        assert_eq!(json["envelopes"][0]["record_type"], "tool_call");
    }
}
