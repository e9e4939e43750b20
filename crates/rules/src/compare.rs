//! Comparator evaluation between a rule operand and a resolved value.
//!
//! Numbers of any width and booleans (as 0.0 / 1.0) are normalized to
//! `f64` before comparison. Strings compare as strings. Ordering
//! comparators only apply within one category; mixing a number and a
//! string is simply not a match.

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::RuleError;
use crate::rule::Comparator;

/// Comparison category of an operand.
enum Operand<'a> {
    Number(f64),
    Text(&'a str),
    Other(&'a Value),
}

fn classify(value: &Value) -> Operand<'_> {
    match value {
        Value::Number(n) => n.as_f64().map_or(Operand::Other(value), Operand::Number),
        Value::Bool(b) => Operand::Number(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => Operand::Text(s),
        other => Operand::Other(other),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decide whether `value` (resolved from the record) satisfies
/// `comparator` against `rule_value` (the rule's operand).
///
/// Ordering comparators read as `value <op> rule_value`.
pub fn evaluate_value(
    comparator: Comparator,
    rule_value: &Value,
    value: &Value,
) -> Result<bool, RuleError> {
    match comparator {
        Comparator::Eq | Comparator::In => Ok(equals(rule_value, value)),
        Comparator::Neq => Ok(!equals(rule_value, value)),
        Comparator::Gt | Comparator::Gte | Comparator::Lt | Comparator::Lte => {
            order(comparator, value, rule_value)
        }
    }
}

fn equals(a: &Value, b: &Value) -> bool {
    match (classify(a), classify(b)) {
        (Operand::Number(x), Operand::Number(y)) => x == y,
        (Operand::Text(x), Operand::Text(y)) => x == y,
        (Operand::Other(x), Operand::Other(y)) => x == y,
        _ => false,
    }
}

fn order(comparator: Comparator, actual: &Value, expected: &Value) -> Result<bool, RuleError> {
    let ordering = match (classify(actual), classify(expected)) {
        (Operand::Number(a), Operand::Number(b)) => a.partial_cmp(&b),
        (Operand::Text(a), Operand::Text(b)) => Some(a.cmp(b)),
        (Operand::Other(v), _) | (_, Operand::Other(v)) => {
            return Err(RuleError::TypeCoercion {
                comparator: comparator.as_str(),
                kind: kind_name(v),
            })
        }
        _ => return Ok(false),
    };

    let Some(ordering) = ordering else {
        return Ok(false);
    };

    Ok(match comparator {
        Comparator::Gt => ordering == Ordering::Greater,
        Comparator::Gte => ordering != Ordering::Less,
        Comparator::Lt => ordering == Ordering::Less,
        Comparator::Lte => ordering != Ordering::Greater,
        Comparator::Eq | Comparator::Neq | Comparator::In => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(c: Comparator, rule_value: Value, value: Value) -> bool {
        evaluate_value(c, &rule_value, &value).unwrap()
    }

    #[test]
    fn integer_equals_float() {
        assert!(eval(Comparator::Eq, json!(5), json!(5.0)));
        assert!(eval(Comparator::In, json!(5.0), json!(5u8)));
        assert!(!eval(Comparator::Neq, json!(5), json!(5.0)));
    }

    #[test]
    fn bool_normalizes_to_number() {
        assert!(eval(Comparator::Eq, json!(true), json!(true)));
        assert!(eval(Comparator::Eq, json!(1), json!(true)));
        assert!(eval(Comparator::Eq, json!(false), json!(0.0)));
        assert!(!eval(Comparator::Eq, json!(true), json!(false)));
    }

    #[test]
    fn strings_compare_as_strings() {
        assert!(eval(Comparator::Eq, json!("awox"), json!("awox")));
        assert!(!eval(Comparator::Eq, json!("5"), json!(5)));
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        // value "10" vs rule "9": lexicographically "10" < "9".
        assert!(!eval(Comparator::Gt, json!("9"), json!("10")));
        assert!(eval(Comparator::Lt, json!("9"), json!("10")));
    }

    #[test]
    fn numeric_ordering() {
        assert!(eval(Comparator::Gt, json!(10000), json!(15000.5)));
        assert!(!eval(Comparator::Gt, json!(10000), json!(10000)));
        assert!(eval(Comparator::Gte, json!(10000), json!(10000.0)));
        assert!(eval(Comparator::Lt, json!(3), json!(-1)));
        assert!(eval(Comparator::Lte, json!(3), json!(3)));
    }

    #[test]
    fn mixed_categories_do_not_match() {
        assert!(!eval(Comparator::Gt, json!(1), json!("2")));
        assert!(!eval(Comparator::Lte, json!("a"), json!(0)));
    }

    #[test]
    fn ordering_on_structured_value_is_coercion_error() {
        let err = evaluate_value(Comparator::Gt, &json!(1), &json!([1, 2])).unwrap_err();
        assert!(matches!(
            err,
            RuleError::TypeCoercion { comparator: "gt", kind: "array" }
        ));
        assert!(evaluate_value(Comparator::Lt, &Value::Null, &json!(1)).is_err());
    }

    #[test]
    fn structural_equality_for_other_values() {
        assert!(eval(Comparator::Eq, json!({"a": [1]}), json!({"a": [1]})));
        assert!(eval(Comparator::Eq, Value::Null, Value::Null));
        assert!(!eval(Comparator::Eq, json!([1]), json!(1)));
    }

    #[test]
    fn neq_is_negation_of_eq() {
        let samples = [
            json!(1),
            json!(1.0),
            json!(2),
            json!("1"),
            json!(true),
            json!(false),
            Value::Null,
            json!([1]),
            json!({"k": "v"}),
        ];
        for a in &samples {
            for b in &samples {
                let eq = evaluate_value(Comparator::Eq, a, b).unwrap();
                let neq = evaluate_value(Comparator::Neq, a, b).unwrap();
                assert_eq!(neq, !eq, "a={a} b={b}");
            }
        }
    }
}
