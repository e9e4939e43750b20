//! Rule engine error types.

/// Errors raised while parsing, validating, or evaluating rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Comparator string is not one of `eq, neq, gt, gte, lt, lte, in`.
    #[error("invalid comparator: {0}")]
    InvalidComparator(String),

    /// Rule shape violates an invariant (empty values, empty path, ...).
    #[error("invalid rule at group {group}, rule {rule}: {reason}")]
    InvalidRule {
        group: usize,
        rule: usize,
        reason: String,
    },

    /// Operand kind cannot take part in an ordering comparison.
    #[error("cannot coerce {kind} operand for comparator {comparator}")]
    TypeCoercion {
        comparator: &'static str,
        kind: &'static str,
    },

    /// Rule groups could not be decoded from JSON.
    #[error("rule parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
