//! Rule definitions and structural validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RuleError;

// ── Comparator ──────────────────────────────────────────────────────

/// Comparison operator applied between a rule operand and a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl Comparator {
    pub const ALL: [Comparator; 7] = [
        Comparator::Eq,
        Comparator::Neq,
        Comparator::Gt,
        Comparator::Gte,
        Comparator::Lt,
        Comparator::Lte,
        Comparator::In,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "eq",
            Comparator::Neq => "neq",
            Comparator::Gt => "gt",
            Comparator::Gte => "gte",
            Comparator::Lt => "lt",
            Comparator::Lte => "lte",
            Comparator::In => "in",
        }
    }

    /// True for `gt`, `gte`, `lt`, `lte`.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Comparator::Gt | Comparator::Gte | Comparator::Lt | Comparator::Lte
        )
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Comparator::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| RuleError::InvalidComparator(s.to_string()))
    }
}

// ── Rule ────────────────────────────────────────────────────────────

/// A single `comparator` + `path` + `values` condition.
///
/// ```json
/// { "comparator": "gt", "path": "Meta.TotalValue", "values": [10000] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub comparator: Comparator,
    pub path: String,
    pub values: Vec<Value>,
}

impl Rule {
    pub fn new(comparator: Comparator, path: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            comparator,
            path: path.into(),
            values,
        }
    }

    /// Check the per-rule invariants. `Err` carries the reason only; the
    /// caller attaches the rule's position.
    fn check(&self) -> Result<(), String> {
        if self.path.is_empty() || self.path.split('.').any(str::is_empty) {
            return Err(format!("malformed path '{}'", self.path));
        }
        if self.values.is_empty() {
            return Err("rule must carry at least one value".to_string());
        }
        if self.comparator != Comparator::In && self.values.len() != 1 {
            return Err(format!(
                "comparator {} takes exactly one value, got {}",
                self.comparator,
                self.values.len()
            ));
        }
        Ok(())
    }
}

// ── RuleGroups ──────────────────────────────────────────────────────

/// OR-of-AND rule groups: the outer list is OR, each inner list is AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleGroups(pub Vec<Vec<Rule>>);

impl RuleGroups {
    pub fn new(groups: Vec<Vec<Rule>>) -> Self {
        Self(groups)
    }

    /// Decode rule groups from their JSON representation.
    pub fn from_json(data: &[u8]) -> Result<Self, RuleError> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn groups(&self) -> impl Iterator<Item = &[Rule]> {
        self.0.iter().map(Vec::as_slice)
    }

    /// Every rule across every group.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.0.iter().flatten()
    }
}

impl fmt::Display for RuleGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Ok(()),
        }
    }
}

/// Validate every rule in every group.
///
/// Empty groups are rejected: an AND over nothing would match every event.
pub fn validate_rules(groups: &RuleGroups) -> Result<(), RuleError> {
    for (g, group) in groups.0.iter().enumerate() {
        if group.is_empty() {
            return Err(RuleError::InvalidRule {
                group: g,
                rule: 0,
                reason: "rule group is empty".to_string(),
            });
        }
        for (r, rule) in group.iter().enumerate() {
            rule.check().map_err(|reason| RuleError::InvalidRule {
                group: g,
                rule: r,
                reason,
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn comparator_round_trips_through_str() {
        for c in Comparator::ALL {
            assert_eq!(c.as_str().parse::<Comparator>().unwrap(), c);
        }
        assert!(matches!(
            "contains".parse::<Comparator>(),
            Err(RuleError::InvalidComparator(s)) if s == "contains"
        ));
    }

    #[test]
    fn deserialize_rule_groups() {
        let groups = RuleGroups::from_json(
            br#"[[{"comparator":"eq","path":"Victim.ShipTypeID","values":[670]},
                  {"comparator":"gt","path":"Meta.TotalValue","values":[10000]}]]"#,
        )
        .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.0[0][1].comparator, Comparator::Gt);
        assert_eq!(groups.0[0][0].values, vec![json!(670)]);
    }

    #[test]
    fn unknown_comparator_fails_to_parse() {
        let result = RuleGroups::from_json(br#"[[{"comparator":"like","path":"a","values":[1]}]]"#);
        assert!(matches!(result, Err(RuleError::Parse(_))));
    }

    #[test]
    fn in_allows_many_values() {
        let groups = RuleGroups::new(vec![vec![Rule::new(
            Comparator::In,
            "SolarSystemID",
            vec![json!(1), json!(2), json!(3)],
        )]]);
        assert!(validate_rules(&groups).is_ok());
    }

    #[test]
    fn eq_rejects_many_values() {
        let groups = RuleGroups::new(vec![vec![Rule::new(
            Comparator::Eq,
            "SolarSystemID",
            vec![json!(1), json!(2)],
        )]]);
        let err = validate_rules(&groups).unwrap_err();
        assert!(err.to_string().contains("exactly one value"), "{err}");
    }

    #[test]
    fn empty_values_rejected() {
        let groups = RuleGroups::new(vec![vec![Rule::new(Comparator::In, "a", vec![])]]);
        assert!(matches!(
            validate_rules(&groups),
            Err(RuleError::InvalidRule { group: 0, rule: 0, .. })
        ));
    }

    #[test]
    fn malformed_path_rejected() {
        let groups = RuleGroups::new(vec![
            vec![Rule::new(Comparator::Eq, "a", vec![json!(1)])],
            vec![Rule::new(Comparator::Eq, "Victim..ShipTypeID", vec![json!(1)])],
        ]);
        assert!(matches!(
            validate_rules(&groups),
            Err(RuleError::InvalidRule { group: 1, rule: 0, .. })
        ));
    }

    #[test]
    fn empty_group_rejected() {
        let groups = RuleGroups::new(vec![vec![]]);
        assert!(validate_rules(&groups).is_err());
    }

    #[test]
    fn display_is_json() {
        let groups = RuleGroups::new(vec![vec![Rule::new(Comparator::Eq, "ID", vec![json!(7)])]]);
        assert_eq!(
            groups.to_string(),
            r#"[[{"comparator":"eq","path":"ID","values":[7]}]]"#
        );
    }
}
