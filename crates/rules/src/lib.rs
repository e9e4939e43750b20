//! Boolean rule engine for killmail policies.
//!
//! This crate provides:
//! - `Rule` / `RuleGroups` with serde (de)serialization and validation
//! - `Resolvable` records and dotted-path resolution into leaf values
//! - Comparator evaluation with numeric coercion
//! - `Ruler`, which evaluates OR-of-AND rule groups against a record

pub mod compare;
pub mod error;
pub mod resolve;
pub mod rule;
pub mod ruler;

pub use compare::evaluate_value;
pub use error::RuleError;
pub use resolve::{resolve, resolve_node, Node, Resolvable};
pub use rule::{validate_rules, Comparator, Rule, RuleGroups};
pub use ruler::Ruler;
