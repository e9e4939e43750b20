//! Dotted-path resolution over nested records.
//!
//! A path such as `Attackers.ShipTypeID` is split on `.`; each segment
//! names a field of the current record. Lists apply the remaining path to
//! every element and concatenate the results, so one path can resolve to
//! many leaves. Missing fields and absent optionals resolve to nothing,
//! which makes any rule on that path unable to match.

use std::collections::HashSet;

use serde_json::Value;

// ── Resolvable ──────────────────────────────────────────────────────

/// A record whose fields can be addressed by name.
///
/// Implementations map exact, case-sensitive field names to [`Node`]s and
/// return `None` for names they do not know.
pub trait Resolvable {
    /// Look up a field by name.
    fn field(&self, name: &str) -> Option<Node<'_>>;

    /// Value used as the leaf when a path ends on this record.
    fn opaque(&self) -> Value {
        Value::Null
    }

    /// Identity of this record for cycle detection: address plus type.
    fn identity(&self) -> (usize, &'static str) {
        (
            self as *const Self as *const () as usize,
            std::any::type_name::<Self>(),
        )
    }
}

/// The value found at one step of a path.
pub enum Node<'a> {
    /// Absent optional value; yields no leaves.
    Nil,
    /// Primitive value.
    Leaf(Value),
    /// Nested record to descend into.
    Record(&'a dyn Resolvable),
    /// Collection; the remaining path applies to each element.
    List(Vec<Node<'a>>),
}

impl<'a> Node<'a> {
    pub fn leaf(value: impl Into<Value>) -> Self {
        Node::Leaf(value.into())
    }

    pub fn optional<T: Into<Value>>(value: Option<T>) -> Self {
        value.map_or(Node::Nil, Node::leaf)
    }

    pub fn record<R: Resolvable>(record: &'a R) -> Self {
        Node::Record(record)
    }

    pub fn optional_record<R: Resolvable>(record: Option<&'a R>) -> Self {
        record.map_or(Node::Nil, |r| Node::Record(r))
    }

    pub fn list<R: Resolvable>(items: &'a [R]) -> Self {
        Node::List(items.iter().map(|r| Node::Record(r)).collect())
    }
}

impl<'a> From<&'a Value> for Node<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Node::Nil,
            Value::Array(items) => Node::List(items.iter().map(Node::from).collect()),
            Value::Object(_) => Node::Record(value),
            other => Node::Leaf(other.clone()),
        }
    }
}

/// JSON objects resolve by key; this lets rules run against raw payloads.
impl Resolvable for Value {
    fn field(&self, name: &str) -> Option<Node<'_>> {
        self.as_object()?.get(name).map(Node::from)
    }

    fn opaque(&self) -> Value {
        self.clone()
    }
}

// ── Resolution ──────────────────────────────────────────────────────

/// Resolve `path` against a record, returning every leaf it reaches.
pub fn resolve(path: &str, root: &dyn Resolvable) -> Vec<Value> {
    resolve_node(path, Node::Record(root))
}

/// Resolve `path` starting from an arbitrary node.
pub fn resolve_node(path: &str, root: Node<'_>) -> Vec<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut leaves = Vec::new();
    let mut visited = HashSet::new();
    walk(root, &segments, &mut visited, &mut leaves);
    leaves
}

fn walk(
    node: Node<'_>,
    segments: &[&str],
    visited: &mut HashSet<(usize, &'static str)>,
    leaves: &mut Vec<Value>,
) {
    match node {
        Node::Nil => {}
        // A primitive cannot be descended into; leftover segments miss.
        Node::Leaf(value) => {
            if segments.is_empty() {
                leaves.push(value);
            }
        }
        Node::List(items) => {
            for item in items {
                walk(item, segments, visited, leaves);
            }
        }
        Node::Record(record) => {
            let id = record.identity();
            // Already on the current path: a cycle.
            if !visited.insert(id) {
                return;
            }
            match segments.split_first() {
                None => leaves.push(record.opaque()),
                Some((head, rest)) => {
                    if let Some(child) = record.field(head) {
                        walk(child, rest, visited, leaves);
                    }
                }
            }
            visited.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Pilot {
        ship: Option<u64>,
    }

    impl Resolvable for Pilot {
        fn field(&self, name: &str) -> Option<Node<'_>> {
            match name {
                "Ship" => Some(Node::optional(self.ship)),
                _ => None,
            }
        }
    }

    struct Fleet {
        name: String,
        pilots: Vec<Pilot>,
    }

    impl Resolvable for Fleet {
        fn field(&self, name: &str) -> Option<Node<'_>> {
            match name {
                "Name" => Some(Node::leaf(self.name.as_str())),
                "Pilots" => Some(Node::list(&self.pilots)),
                _ => None,
            }
        }
    }

    fn fleet() -> Fleet {
        Fleet {
            name: "alpha".to_string(),
            pilots: vec![
                Pilot { ship: Some(670) },
                Pilot { ship: None },
                Pilot { ship: Some(587) },
            ],
        }
    }

    #[test]
    fn list_fans_out_and_skips_nil() {
        let leaves = resolve("Pilots.Ship", &fleet());
        assert_eq!(leaves, vec![json!(670), json!(587)]);
    }

    #[test]
    fn unknown_field_resolves_empty() {
        assert!(resolve("Pilots.Hull", &fleet()).is_empty());
        assert!(resolve("pilots.Ship", &fleet()).is_empty());
    }

    #[test]
    fn primitive_cannot_be_descended() {
        assert!(resolve("Name.Length", &fleet()).is_empty());
    }

    #[test]
    fn record_at_end_of_path_is_opaque_leaf() {
        let leaves = resolve("Pilots", &fleet());
        assert_eq!(leaves, vec![Value::Null; 3]);
    }

    #[test]
    fn json_objects_resolve_by_key() {
        let doc = json!({
            "a": [
                { "b": [ { "c": 9 }, { "d": 15 } ] },
                { "f": [ { "f": 9 }, { "g": 42 } ] }
            ]
        });
        assert_eq!(resolve("a.b.c", &doc), vec![json!(9)]);
        assert_eq!(resolve("a.f.g", &doc), vec![json!(42)]);
        assert!(resolve("a.b.g", &doc).is_empty());
    }

    #[test]
    fn resolve_from_list_root() {
        let doc = json!([{ "x": 1 }, { "x": 2 }, null]);
        assert_eq!(resolve_node("x", Node::from(&doc)), vec![json!(1), json!(2)]);
    }
}
