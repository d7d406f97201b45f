use std::collections::BTreeMap;

/// Per-record-type validation rule: the fields an envelope of this type must
/// carry (present and non-null) beyond the mandatory `record_type` marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordRule {
    required_fields: Vec<String>,
}

impl RecordRule {
    pub fn new<S: Into<String>>(required_fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            required_fields: required_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }
}

/// Allowlist of committable record types. Anything not listed is rejected
/// with `RECORD_TYPE_FORBIDDEN` before the store is ever contacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPolicy {
    rules: BTreeMap<String, RecordRule>,
}

impl RecordPolicy {
    /// Policy with no allowed record types. Every envelope is forbidden.
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// The standard gate-runtime record kinds.
    pub fn standard() -> Self {
        Self::empty()
            .allow("auth_context", ["agent_id"])
            .allow("policy_decision", ["decision"])
            .allow("model_call", ["model"])
            .allow("tool_call", ["tool"])
    }

    /// Builder-style addition of an allowed record type and its required
    /// fields.
    pub fn allow<S: Into<String>>(
        mut self,
        record_type: impl Into<String>,
        required_fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.rules
            .insert(record_type.into(), RecordRule::new(required_fields));
        self
    }

    pub fn rule(&self, record_type: &str) -> Option<&RecordRule> {
        self.rules.get(record_type)
    }

    pub fn is_allowed(&self, record_type: &str) -> bool {
        self.rules.contains_key(record_type)
    }
}

impl Default for RecordPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
