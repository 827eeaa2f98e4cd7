//! With-defaults processing (RFC 6243)
//!
//! A `<with-defaults>` parameter selects how default-valued data appears in
//! a reply. Default leaves inserted by [`apply_defaults`] carry the
//! `DEFAULT` flag, which the four modes consume.

use crate::error::{Error, Result};
use crate::filter;
use crate::namespaces::WITH_DEFAULTS_NAMESPACE;
use crate::schema::SchemaRegistry;
use crate::tree::{NodeArena, NodeFlags, NodeId};

/// The four retrieval modes of RFC 6243
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithDefaultsMode {
    /// Report all data nodes
    ReportAll,
    /// Report only explicitly-set data
    Explicit,
    /// Report no default-valued data
    Trim,
    /// Report all data nodes, tagging defaults with `wd:default="true"`
    ReportAllTagged,
}

impl std::str::FromStr for WithDefaultsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "report-all" => Ok(WithDefaultsMode::ReportAll),
            "explicit" => Ok(WithDefaultsMode::Explicit),
            "trim" => Ok(WithDefaultsMode::Trim),
            "report-all-tagged" => Ok(WithDefaultsMode::ReportAllTagged),
            other => Err(Error::Other(format!(
                "unknown with-defaults mode: {}",
                other
            ))),
        }
    }
}

/// Insert missing default-valued leaves below every bound element
///
/// For each element bound to a container or list schema node, leaf children
/// that have a schema default and are absent from the tree are created with
/// the default as body and flagged `DEFAULT`.
pub fn apply_defaults(arena: &mut NodeArena, root: NodeId, registry: &SchemaRegistry) {
    for id in arena.descendant_elements(root) {
        let Some(sid) = arena.schema(id) else {
            continue;
        };
        for &child_sid in registry.children(sid) {
            let child = registry.node(child_sid);
            let Some(default) = child.default_value.as_deref() else {
                continue;
            };
            if arena.find_child(id, &child.name).is_some() {
                continue;
            }
            let prefix = arena.prefix(id).map(|p| p.to_string());
            let new = arena.new_element(id, child.name.clone(), prefix.as_deref());
            arena.set_body(new, default);
            arena.set_schema(new, Some(child_sid));
            arena.set_flag(new, NodeFlags::DEFAULT);
        }
    }
}

/// Apply a with-defaults mode to a reply tree
///
/// The `MARK` scratch flag is used internally and is clear again on return.
pub fn apply_with_defaults(
    arena: &mut NodeArena,
    root: NodeId,
    registry: &SchemaRegistry,
    mode: WithDefaultsMode,
) {
    match mode {
        WithDefaultsMode::ReportAll => {}
        WithDefaultsMode::Explicit => {
            filter::reset_flags(arena, root, NodeFlags::MARK);
            // State nodes keep their defaults; only explicit-default config
            // is dropped.
            filter::mark_nonconfig(arena, root, registry);
            filter::prune_flagged(
                arena,
                root,
                NodeFlags::MARK | NodeFlags::DEFAULT,
                NodeFlags::DEFAULT,
            );
            filter::reset_flags(arena, root, NodeFlags::MARK);
            filter::remove_empty_containers(arena, root, registry);
        }
        WithDefaultsMode::Trim => {
            filter::prune_flagged(arena, root, NodeFlags::DEFAULT, NodeFlags::DEFAULT);
            // Explicitly-set leaves whose body happens to equal the schema
            // default are trimmed as well.
            for id in arena.descendant_elements(root) {
                if id != root && filter::is_schema_default(arena, registry, id) {
                    arena.set_flag(id, NodeFlags::MARK);
                }
            }
            filter::prune_flagged(arena, root, NodeFlags::MARK, NodeFlags::MARK);
            filter::reset_flags(arena, root, NodeFlags::MARK);
            filter::remove_empty_containers(arena, root, registry);
        }
        WithDefaultsMode::ReportAllTagged => {
            arena.declare_namespace(root, Some("wd"), WITH_DEFAULTS_NAMESPACE);
            for id in arena.descendant_elements(root) {
                if id != root && filter::is_schema_default(arena, registry, id) {
                    arena.set_flag(id, NodeFlags::MARK);
                }
            }
            let tagged: Vec<NodeId> = arena
                .descendant_elements(root)
                .into_iter()
                .filter(|&id| {
                    id != root && arena.has_flag(id, NodeFlags::DEFAULT | NodeFlags::MARK)
                })
                .collect();
            for id in tagged {
                arena.new_attribute(id, "default", Some("wd"), "true");
            }
            filter::reset_flags(arena, root, NodeFlags::MARK);
        }
    }
}
