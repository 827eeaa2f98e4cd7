//! Selection filtering on data trees
//!
//! The pipeline selects nodes with XPath, marks them with the `MARK` scratch
//! flag, prunes everything outside the selection and clears the flag again.
//! `MARK` never survives a top-level operation.

use crate::schema::{self, SchemaRegistry};
use crate::tree::{NodeArena, NodeFlags, NodeId};

/// Set `MARK` on each given node
pub fn mark(arena: &mut NodeArena, nodes: &[NodeId]) {
    for &id in nodes {
        arena.set_flag(id, NodeFlags::MARK);
    }
}

/// Clear flags across a subtree, including `root` itself
pub fn reset_flags(arena: &mut NodeArena, root: NodeId, flags: NodeFlags) {
    for id in arena.descendant_elements(root) {
        arena.clear_flag(id, flags);
    }
}

/// True when some element below `id` carries any of `flags`
pub fn has_flagged_descendant(arena: &NodeArena, id: NodeId, flags: NodeFlags) -> bool {
    arena
        .element_children(id)
        .into_iter()
        .any(|c| arena.has_flag(c, flags) || has_flagged_descendant(arena, c, flags))
}

/// Prune the tree to the marked selection
///
/// Retains every element that is marked (the whole subtree below it is kept)
/// or that has a marked descendant. When the root itself is marked the tree
/// is already fully covered and nothing is removed.
pub fn prune_unmarked(arena: &mut NodeArena, root: NodeId) {
    if arena.has_flag(root, NodeFlags::MARK) {
        return;
    }
    prune_children(arena, root);
}

fn prune_children(arena: &mut NodeArena, id: NodeId) {
    for child in arena.element_children(id) {
        if arena.has_flag(child, NodeFlags::MARK) {
            continue;
        }
        if has_flagged_descendant(arena, child, NodeFlags::MARK) {
            prune_children(arena, child);
        } else {
            arena.detach(child);
        }
    }
}

/// Prune elements whose flags match `mask` exactly equal to `test`
///
/// An element is removed when `flags & mask == test`. Used by the
/// with-defaults processor to drop default-flagged configuration.
pub fn prune_flagged(arena: &mut NodeArena, root: NodeId, mask: NodeFlags, test: NodeFlags) {
    for child in arena.element_children(root) {
        if arena.flags(child) & mask == test {
            arena.detach(child);
        } else {
            prune_flagged(arena, child, mask, test);
        }
    }
}

/// Mark every state element of the tree
///
/// An element is state when its schema node is `config false`, when any
/// schema ancestor is, or when it has no schema binding at all (monitoring
/// augmentations and plugin state outside the loaded modules).
pub fn mark_nonconfig(arena: &mut NodeArena, root: NodeId, registry: &SchemaRegistry) {
    for id in arena.descendant_elements(root) {
        if id == root {
            continue;
        }
        if schema::is_nonconfig(registry, arena, id) {
            arena.set_flag(id, NodeFlags::MARK);
        }
    }
}

/// True when the element's body equals its schema default value
pub fn is_schema_default(arena: &NodeArena, registry: &SchemaRegistry, id: NodeId) -> bool {
    let Some(body) = arena.body(id) else {
        return false;
    };
    let Some(sid) = arena.schema(id) else {
        return false;
    };
    match registry.node(sid).default_value.as_deref() {
        Some(default) => body == default,
        None => false,
    }
}

/// Remove containers emptied by a pruning pass
///
/// Walks bottom-up and detaches schema containers that have neither element
/// children nor a body.
pub fn remove_empty_containers(arena: &mut NodeArena, root: NodeId, registry: &SchemaRegistry) {
    let mut ids = arena.descendant_elements(root);
    ids.reverse();
    for id in ids {
        if id == root {
            continue;
        }
        let is_container = arena
            .schema(id)
            .map(|sid| registry.node(sid).keyword == crate::schema::YangKeyword::Container)
            .unwrap_or(false);
        if is_container
            && arena.element_children(id).is_empty()
            && arena.body(id).is_none()
        {
            arena.detach(id);
        }
    }
}

/// Count elements still carrying `flags` (diagnostics and tests)
pub fn count_flagged(arena: &NodeArena, root: NodeId, flags: NodeFlags) -> usize {
    arena
        .descendant_elements(root)
        .into_iter()
        .filter(|&id| arena.has_flag(id, flags))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::YangKeyword;

    #[test]
    fn test_mark_and_prune() {
        let mut arena =
            NodeArena::parse("<config><top><a>1</a><a>2</a><b/></top></config>").unwrap();
        let root = arena.root();
        let top = arena.find_child(root, "top").unwrap();
        let second = arena.element_children(top)[1];
        mark(&mut arena, &[second]);
        prune_unmarked(&mut arena, root);

        let kids = arena.element_children(top);
        assert_eq!(kids, vec![second]);
        assert_eq!(arena.body(second), Some("2"));
    }

    #[test]
    fn test_marked_node_keeps_subtree() {
        let mut arena =
            NodeArena::parse("<config><top><a><x>1</x></a><b/></top></config>").unwrap();
        let root = arena.root();
        let top = arena.find_child(root, "top").unwrap();
        let a = arena.find_child(top, "a").unwrap();
        mark(&mut arena, &[a]);
        prune_unmarked(&mut arena, root);

        assert!(arena.find_child(top, "b").is_none());
        let x = arena.find_child(a, "x").unwrap();
        assert_eq!(arena.body(x), Some("1"));
    }

    #[test]
    fn test_marked_root_keeps_everything() {
        let mut arena = NodeArena::parse("<config><top><a/><b/></top></config>").unwrap();
        let root = arena.root();
        mark(&mut arena, &[root]);
        prune_unmarked(&mut arena, root);
        let top = arena.find_child(root, "top").unwrap();
        assert_eq!(arena.element_children(top).len(), 2);
    }

    #[test]
    fn test_prune_is_idempotent_on_marked_tree() {
        let mut arena =
            NodeArena::parse("<config><top><a>1</a><a>2</a></top></config>").unwrap();
        let root = arena.root();
        let top = arena.find_child(root, "top").unwrap();
        let first = arena.element_children(top)[0];
        mark(&mut arena, &[first]);
        prune_unmarked(&mut arena, root);
        let after_first: Vec<_> = arena.element_children(top);
        prune_unmarked(&mut arena, root);
        assert_eq!(arena.element_children(top), after_first);
    }

    #[test]
    fn test_reset_flags() {
        let mut arena = NodeArena::parse("<config><top><a/></top></config>").unwrap();
        let root = arena.root();
        let top = arena.find_child(root, "top").unwrap();
        let a = arena.find_child(top, "a").unwrap();
        mark(&mut arena, &[top, a]);
        reset_flags(&mut arena, root, NodeFlags::MARK);
        assert_eq!(count_flagged(&arena, root, NodeFlags::MARK), 0);
    }

    #[test]
    fn test_mark_nonconfig() {
        let mut reg = SchemaRegistry::new();
        reg.add_module("m", "u", "m").unwrap();
        let top = reg
            .add_node("m", None, YangKeyword::Container, "top", true)
            .unwrap();
        reg.add_node("m", Some(top), YangKeyword::Leaf, "a", true)
            .unwrap();
        reg.add_node("m", Some(top), YangKeyword::Leaf, "counter", false)
            .unwrap();

        let mut arena = NodeArena::parse(
            "<config><top xmlns=\"u\"><a>1</a><counter>9</counter></top></config>",
        )
        .unwrap();
        let root = arena.root();
        reg.bind_tree(&mut arena, root);
        mark_nonconfig(&mut arena, root, &reg);

        let top = arena.find_child(root, "top").unwrap();
        let a = arena.find_child(top, "a").unwrap();
        let counter = arena.find_child(top, "counter").unwrap();
        assert!(!arena.has_flag(a, NodeFlags::MARK));
        assert!(arena.has_flag(counter, NodeFlags::MARK));
    }

    #[test]
    fn test_prune_flagged_default_only() {
        let mut arena = NodeArena::parse(
            "<config><top><a>5</a><b>7</b><c>8</c></top></config>",
        )
        .unwrap();
        let root = arena.root();
        let top = arena.find_child(root, "top").unwrap();
        let a = arena.find_child(top, "a").unwrap();
        let c = arena.find_child(top, "c").unwrap();
        arena.set_flag(a, NodeFlags::DEFAULT);
        arena.set_flag(c, NodeFlags::DEFAULT);
        arena.set_flag(c, NodeFlags::MARK); // state node: survives

        prune_flagged(
            &mut arena,
            root,
            NodeFlags::MARK | NodeFlags::DEFAULT,
            NodeFlags::DEFAULT,
        );
        assert!(arena.find_child(top, "a").is_none());
        assert!(arena.find_child(top, "b").is_some());
        assert!(arena.find_child(top, "c").is_some());
    }

    #[test]
    fn test_remove_empty_containers() {
        let mut reg = SchemaRegistry::new();
        reg.add_module("m", "u", "m").unwrap();
        let top = reg
            .add_node("m", None, YangKeyword::Container, "top", true)
            .unwrap();
        let inner = reg
            .add_node("m", Some(top), YangKeyword::Container, "inner", true)
            .unwrap();
        reg.add_node("m", Some(inner), YangKeyword::Leaf, "x", true)
            .unwrap();

        let mut arena =
            NodeArena::parse("<config><top xmlns=\"u\"><inner/></top></config>").unwrap();
        let root = arena.root();
        reg.bind_tree(&mut arena, root);
        remove_empty_containers(&mut arena, root, &reg);
        let top = arena.find_child(root, "top").unwrap();
        assert!(arena.find_child(top, "inner").is_none());
        // top itself emptied on the next sweep
        remove_empty_containers(&mut arena, root, &reg);
        assert!(arena.find_child(root, "top").is_none());
    }
}
