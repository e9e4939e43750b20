//! Rule group evaluator.
//!
//! A [`Ruler`] is bound to one policy's rule groups. A record passes when
//! any group passes; a group passes when all of its rules pass; a rule
//! passes when any of its operands matches any resolved leaf.

use crate::compare::evaluate_value;
use crate::error::RuleError;
use crate::resolve::{resolve, Resolvable};
use crate::rule::{validate_rules, Rule, RuleGroups};

/// Compiled evaluator for one set of OR-of-AND rule groups.
#[derive(Debug, Clone)]
pub struct Ruler {
    rules: RuleGroups,
}

impl Ruler {
    /// Build a ruler after validating the groups.
    pub fn new(rules: RuleGroups) -> Result<Self, RuleError> {
        validate_rules(&rules)?;
        Ok(Self { rules })
    }

    /// Decode and validate rule groups from JSON.
    pub fn from_json(data: &[u8]) -> Result<Self, RuleError> {
        Self::new(RuleGroups::from_json(data)?)
    }

    pub fn rules(&self) -> &RuleGroups {
        &self.rules
    }

    /// Evaluate the rule groups against a record.
    ///
    /// No groups means no match. Stops at the first fully matching group.
    pub fn test(&self, subject: &dyn Resolvable) -> Result<bool, RuleError> {
        for group in self.rules.groups() {
            if Self::test_group(group, subject)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn test_group(group: &[Rule], subject: &dyn Resolvable) -> Result<bool, RuleError> {
        for rule in group {
            if !Self::test_rule(rule, subject)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// True when any operand matches any resolved leaf.
    pub fn test_rule(rule: &Rule, subject: &dyn Resolvable) -> Result<bool, RuleError> {
        let leaves = resolve(&rule.path, subject);
        for operand in &rule.values {
            for leaf in &leaves {
                if evaluate_value(rule.comparator, operand, leaf)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn or_of_and_over_json() {
        // First group fails (second rule has no matching c), second passes.
        let ruler = Ruler::from_json(
            br#"[
                [ {"comparator":"in","path":"a.b.c","values":[2,4,5,9]},
                  {"comparator":"in","path":"a.b.c","values":[1,3,6]} ],
                [ {"comparator":"in","path":"a.b.c","values":[9,56,46]},
                  {"comparator":"in","path":"a.f.g","values":[42,35,78]} ]
            ]"#,
        )
        .unwrap();

        let doc = json!({
            "a": [
                { "b": [ { "c": 9 }, { "d": 15 } ] },
                { "f": [ { "f": 9 }, { "g": 42 } ] }
            ]
        });
        assert!(ruler.test(&doc).unwrap());
    }

    #[test]
    fn no_groups_never_matches() {
        let ruler = Ruler::new(RuleGroups::default()).unwrap();
        assert!(!ruler.test(&json!({"a": 1})).unwrap());
    }

    #[test]
    fn invalid_groups_rejected_at_construction() {
        let result = Ruler::from_json(br#"[[{"comparator":"eq","path":"a","values":[1,2]}]]"#);
        assert!(matches!(result, Err(RuleError::InvalidRule { .. })));
    }

    #[test]
    fn coercion_error_propagates() {
        let ruler =
            Ruler::from_json(br#"[[{"comparator":"gt","path":"a","values":[1]}]]"#).unwrap();
        let result = ruler.test(&json!({"a": {"nested": true}}));
        assert!(matches!(result, Err(RuleError::TypeCoercion { .. })));
    }

    #[test]
    fn neq_matches_when_any_leaf_differs() {
        let ruler =
            Ruler::from_json(br#"[[{"comparator":"neq","path":"xs","values":[1]}]]"#).unwrap();
        assert!(ruler.test(&json!({"xs": [1, 2]})).unwrap());
        assert!(!ruler.test(&json!({"xs": [1, 1]})).unwrap());
        assert!(!ruler.test(&json!({"xs": []})).unwrap());
    }
}
