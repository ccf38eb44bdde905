//! Wrapped instance-id tokens
//!
//! Call arguments reference other managed instances by id. To keep those
//! references unambiguous against ordinary string literals, ids travel in a
//! canonical wrapped form: the literal prefix `instance:${`, the id, then a
//! closing `}`. Ids must not themselves contain the closing delimiter; this
//! is a precondition of the wire format and is not validated here.

use crate::state::StateNode;

/// Literal prefix of a wrapped instance-id token.
pub const WRAP_PREFIX: &str = "instance:${";

/// Literal suffix of a wrapped instance-id token.
pub const WRAP_SUFFIX: &str = "}";

/// Wrap an instance id in its canonical token form.
///
/// ```
/// assert_eq!(scene_sync::codec::wrap("actor1"), "instance:${actor1}");
/// ```
pub fn wrap(id: &str) -> String {
    format!("{WRAP_PREFIX}{id}{WRAP_SUFFIX}")
}

/// Extract the id from a wrapped token, or `None` if the argument is not in
/// canonical form (in which case it is an ordinary literal).
pub fn try_unwrap(argument: &str) -> Option<&str> {
    argument.strip_prefix(WRAP_PREFIX)?.strip_suffix(WRAP_SUFFIX)
}

/// Collect the ids of every descendant of `state`, depth-first.
///
/// The walk is pre-order over `dependencies` (each child's id before its own
/// descendants), visits every node exactly once, and is deterministic - a
/// requirement for reproducible skip-set construction. The root's own id is
/// not included.
pub fn extract_dependency_ids(state: &StateNode) -> Vec<String> {
    let mut ids = Vec::new();
    collect_ids(state, &mut ids);
    ids
}

fn collect_ids(node: &StateNode, out: &mut Vec<String>) {
    for child in &node.dependencies {
        out.push(child.id.clone());
        collect_ids(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap_identity() {
        for id in ["actor1", "a-b.c", "1", ""] {
            assert_eq!(try_unwrap(&wrap(id)), Some(id));
        }
    }

    #[test]
    fn test_try_unwrap_rejects_literals() {
        assert_eq!(try_unwrap("actor1"), None);
        assert_eq!(try_unwrap("instance:actor1"), None);
        assert_eq!(try_unwrap("instance:${actor1"), None);
        assert_eq!(try_unwrap("${actor1}"), None);
        assert_eq!(try_unwrap(""), None);
    }

    #[test]
    fn test_extract_dependency_ids_preorder() {
        let tree = StateNode::new("root", "RenderWindow").with_dependency(
            StateNode::new("ren1", "Renderer")
                .with_dependency(
                    StateNode::new("actor1", "Actor")
                        .with_dependency(StateNode::new("mapper1", "Mapper")),
                )
                .with_dependency(StateNode::new("camera1", "Camera")),
        );

        let ids = extract_dependency_ids(&tree);
        assert_eq!(ids, vec!["ren1", "actor1", "mapper1", "camera1"]);
    }

    #[test]
    fn test_extract_dependency_ids_visits_each_node_once() {
        let mut tree = StateNode::new("root", "RenderWindow");
        for i in 0..5 {
            tree = tree.with_dependency(StateNode::new(format!("child{i}"), "Actor"));
        }

        let ids = extract_dependency_ids(&tree);
        assert_eq!(ids.len(), 5);
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn test_extract_dependency_ids_empty_tree() {
        let leaf = StateNode::new("leaf", "Actor");
        assert!(extract_dependency_ids(&leaf).is_empty());
    }
}
