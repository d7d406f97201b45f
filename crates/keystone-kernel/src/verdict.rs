use keystone_canon::EnvelopeHash;
use serde::{Deserialize, Serialize};

/// Stable wire codes for terminal rejection classes. These appear verbatim in
/// caller-facing results and in the store's audit rows, so variants are
/// append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    RecordTypeForbidden,
    SchemaReject,
    DeclaredHashMismatch,
    HashCoherenceFailure,
}

impl Classification {
    pub fn code(&self) -> &'static str {
        match self {
            Classification::RecordTypeForbidden => "RECORD_TYPE_FORBIDDEN",
            Classification::SchemaReject => "SCHEMA_REJECT",
            Classification::DeclaredHashMismatch => "DECLARED_HASH_MISMATCH",
            Classification::HashCoherenceFailure => "HASH_COHERENCE_FAILURE",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of kernel validation. A rejection is terminal for the call: the
/// adapter must not contact the store once it sees one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Envelope accepted; `envelope_hash` is the authoritative digest all
    /// downstream packaging must use.
    Accepted { envelope_hash: EnvelopeHash },
    /// Envelope rejected by policy. Returned to the caller as data, never
    /// raised as a fault.
    Rejected {
        classification: Classification,
        reason: String,
    },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }

    pub(crate) fn reject(classification: Classification, reason: impl Into<String>) -> Self {
        Verdict::Rejected {
            classification,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_codes_are_stable() {
        assert_eq!(
            Classification::RecordTypeForbidden.code(),
            "RECORD_TYPE_FORBIDDEN"
        );
        assert_eq!(Classification::SchemaReject.code(), "SCHEMA_REJECT");
        assert_eq!(
            Classification::HashCoherenceFailure.code(),
            "HASH_COHERENCE_FAILURE"
        );
    }

    #[test]
    fn verdict_serializes_tagged() {
        let verdict = Verdict::reject(Classification::SchemaReject, "missing field");
        let json = serde_json::to_value(&verdict).expect("encode");
        assert_eq!(json["verdict"], "rejected");
        assert_eq!(json["classification"], "SCHEMA_REJECT");
    }
}
