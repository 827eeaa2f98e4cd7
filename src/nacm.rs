//! NACM read-access filtering
//!
//! A loaded access-control cache post-filters the reply tree: subtrees a
//! read rule denies for the requesting user are pruned before serialisation.
//! No cache means permit-all. The full Network Configuration Access Control
//! Model lives outside the engine; the cache here is its compiled read-rule
//! view.

use log::debug;

use crate::tree::{NodeArena, NodeId};

/// Rule effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NacmAccess {
    /// Allow reading the matched subtree
    Permit,
    /// Remove the matched subtree from replies
    Deny,
}

/// A compiled read rule
#[derive(Debug, Clone)]
pub struct NacmRule {
    /// User the rule applies to; `None` matches every user
    pub user: Option<String>,
    /// Element names from the tree root down to the protected subtree
    pub path: Vec<String>,
    /// Effect
    pub access: NacmAccess,
}

/// Compiled read-access rules
#[derive(Debug, Clone, Default)]
pub struct NacmCache {
    rules: Vec<NacmRule>,
}

impl NacmCache {
    /// Create an empty (permit-all) cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a deny-read rule for a path, optionally scoped to a user
    pub fn deny_read(&mut self, user: Option<&str>, path: &[&str]) {
        self.rules.push(NacmRule {
            user: user.map(|u| u.to_string()),
            path: path.iter().map(|s| s.to_string()).collect(),
            access: NacmAccess::Deny,
        });
    }

    /// Number of loaded rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rule is loaded
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply read rules to a reply tree, pruning denied subtrees
    ///
    /// `selected` is the XPath selection that produced the tree; rules also
    /// apply to nodes the selection kept. Returns the number of removed
    /// subtrees.
    pub fn datanode_read(
        &self,
        arena: &mut NodeArena,
        root: NodeId,
        selected: &[NodeId],
        user: &str,
    ) -> usize {
        let _ = selected;
        let mut removed = 0;
        for rule in &self.rules {
            if rule.access != NacmAccess::Deny {
                continue;
            }
            if let Some(ref rule_user) = rule.user {
                if rule_user != user {
                    continue;
                }
            }
            for id in resolve_rule_path(arena, root, &rule.path) {
                debug!("nacm: denying read of {} for {}", arena.name(id), user);
                arena.detach(id);
                removed += 1;
            }
        }
        removed
    }
}

fn resolve_rule_path(arena: &NodeArena, root: NodeId, path: &[String]) -> Vec<NodeId> {
    let mut current = vec![root];
    for name in path {
        let mut next = Vec::new();
        for &id in &current {
            for child in arena.element_children(id) {
                if arena.name(child) == name {
                    next.push(child);
                }
            }
        }
        current = next;
    }
    if path.is_empty() {
        Vec::new()
    } else {
        current
    }
}
