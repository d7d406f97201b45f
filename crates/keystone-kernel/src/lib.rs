//! In-process validation kernel for the envelope commit protocol.
//!
//! The kernel is the first of the two independent hashing layers: it
//! canonicalizes the envelope, recomputes its digest, and applies record-type
//! policy. Policy failures come back as [`Verdict::Rejected`] data; only
//! structural problems (an envelope that cannot even be canonicalized) are
//! faults.

pub mod policy;
pub mod verdict;

pub use policy::{RecordPolicy, RecordRule};
pub use verdict::{Classification, Verdict};

use keystone_canon::{CanonError, EnvelopeHash};
use serde_json::Value;
use thiserror::Error;

/// Structural faults. Distinct from policy rejections: these propagate to the
/// caller as errors, carrying the original diagnostic.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("envelope must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error(transparent)]
    Canon(#[from] CanonError),
}

/// Name of the JSON type, for diagnostics.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validation kernel: record-type policy plus independent hash recomputation.
#[derive(Debug, Clone, Default)]
pub struct Kernel {
    policy: RecordPolicy,
}

impl Kernel {
    pub fn new(policy: RecordPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RecordPolicy {
        &self.policy
    }

    /// Validate an envelope against policy and recompute its canonical hash.
    ///
    /// On acceptance the returned verdict carries the authoritative hash,
    /// which equals `declared_hash` by construction; downstream packaging
    /// must use the verdict's value, not the caller's.
    pub fn commit_action(
        &self,
        record_type: &str,
        declared_hash: EnvelopeHash,
        envelope: &Value,
    ) -> Result<Verdict, KernelError> {
        let fields = envelope
            .as_object()
            .ok_or_else(|| KernelError::NotAnObject(json_type_name(envelope)))?;

        let Some(rule) = self.policy.rule(record_type) else {
            return Ok(Verdict::reject(
                Classification::RecordTypeForbidden,
                format!("record type '{record_type}' is not allowlisted"),
            ));
        };

        match fields.get("record_type").and_then(Value::as_str) {
            Some(marker) if marker == record_type => {}
            Some(marker) => {
                return Ok(Verdict::reject(
                    Classification::SchemaReject,
                    format!("envelope record_type '{marker}' does not match '{record_type}'"),
                ));
            }
            None => {
                return Ok(Verdict::reject(
                    Classification::SchemaReject,
                    "envelope is missing the 'record_type' string field",
                ));
            }
        }

        for field in rule.required_fields() {
            match fields.get(field) {
                Some(value) if !value.is_null() => {}
                _ => {
                    return Ok(Verdict::reject(
                        Classification::SchemaReject,
                        format!("missing required field '{field}' for '{record_type}'"),
                    ));
                }
            }
        }

        let computed = EnvelopeHash::of_value(envelope)?;
        if computed != declared_hash {
            return Ok(Verdict::reject(
                Classification::DeclaredHashMismatch,
                format!("declared hash {declared_hash} does not match recomputed {computed}"),
            ));
        }

        Ok(Verdict::Accepted {
            envelope_hash: computed,
        })
    }
}
