//! List pagination planning
//!
//! A `<list-pagination>` parameter narrows a `<get>`/`<get-config>` to a
//! window of list entries. The target of the request's XPath must be a
//! `list` or `leaf-list` schema node whose config classification agrees with
//! the requested content class.
//!
//! The window is carried as a structured value and applied to the selected
//! node-set after XPath evaluation, in document order. (Rewriting the XPath
//! with a `[offset <= position() and position() < offset+limit]` predicate
//! composes incorrectly when the path already ends in a predicate.) State
//! lists delegate the window to the registered pagination callback instead.

use log::debug;

use crate::error::RpcError;
use crate::schema::{SchemaId, SchemaRegistry, YangKeyword};
use crate::tree::{NodeArena, NodeId};
use crate::xpath::XPath;

/// A pagination window over a list in document order
///
/// `offset` 0 starts at the first entry; `limit` 0 means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    /// Number of leading entries to skip
    pub offset: u32,
    /// Maximum number of entries to return; 0 is unlimited
    pub limit: u32,
}

impl Window {
    /// Apply the window to a node-set in document order
    pub fn apply(&self, nodes: Vec<NodeId>) -> Vec<NodeId> {
        let iter = nodes.into_iter().skip(self.offset as usize);
        if self.limit == 0 {
            iter.collect()
        } else {
            iter.take(self.limit as usize).collect()
        }
    }

    /// True when the window passes everything through
    pub fn is_unbounded(&self) -> bool {
        self.offset == 0 && self.limit == 0
    }
}

/// Parse one numeric pagination element with its "no value" keyword
///
/// `offset` defaults to `none`, `limit` to `unbounded`; both map to 0.
fn element_value(
    arena: &NodeArena,
    pagination: NodeId,
    name: &str,
    default_word: &str,
) -> Result<u32, RpcError> {
    let Some(el) = arena.find_child(pagination, name) else {
        return Ok(0);
    };
    let Some(body) = arena.body(el) else {
        return Ok(0);
    };
    if body == default_word {
        return Ok(0);
    }
    body.parse::<u32>().map_err(|_| {
        RpcError::bad_attribute(name, format!("Unrecognized value of {} element", name))
    })
}

/// Parse the `<list-pagination>` element into a window
///
/// `direction` is validated but windows are always produced in document
/// order; `sort-by` and `where` are accepted and ignored.
pub fn parse_window(arena: &NodeArena, pagination: NodeId) -> Result<Window, RpcError> {
    let offset = element_value(arena, pagination, "offset", "none")?;
    let limit = element_value(arena, pagination, "limit", "unbounded")?;
    if let Some(direction) = arena
        .find_child(pagination, "direction")
        .and_then(|el| arena.body(el))
    {
        if direction != "forward" && direction != "reverse" {
            return Err(RpcError::bad_attribute(
                "direction",
                "Unrecognized value of direction attribute",
            ));
        }
    }
    debug!("list-pagination window offset={} limit={}", offset, limit);
    Ok(Window { offset, limit })
}

/// The classified pagination target
#[derive(Debug, Clone, Copy)]
pub struct Target {
    /// The list or leaf-list schema node
    pub schema: SchemaId,
    /// True when the target (and its whole ancestor chain) is config
    pub config: bool,
}

/// Resolve and sanity-check the pagination target
///
/// The XPath must be a plain path resolving to a `list` or `leaf-list`
/// schema node.
pub fn resolve_target(
    registry: &SchemaRegistry,
    xpath: Option<&XPath>,
) -> Result<Target, RpcError> {
    let Some(xpath) = xpath else {
        return Err(RpcError::invalid_value(
            "list-pagination requires an XPath filter naming a list or leaf-list",
        ));
    };
    let names: Vec<&str> = match xpath.plain_steps() {
        Some(steps) => steps.iter().map(|&(_, local)| local).collect(),
        None => {
            return Err(RpcError::invalid_value(format!(
                "Netconf get list-pagination: \"{}\" not found",
                xpath.as_str()
            )))
        }
    };
    let Some(schema) = registry.resolve_path(&names) else {
        return Err(RpcError::invalid_value(format!(
            "Netconf get list-pagination: \"{}\" not found",
            xpath.as_str()
        )));
    };
    match registry.node(schema).keyword {
        YangKeyword::List | YangKeyword::LeafList => {}
        _ => {
            return Err(RpcError::invalid_value(
                "list-pagination is enabled but target is not list or leaf-list",
            ))
        }
    }
    Ok(Target {
        schema,
        config: registry.config_chain(schema),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        let mut reg = SchemaRegistry::new();
        reg.add_module("m", "u", "m").unwrap();
        let top = reg
            .add_node("m", None, YangKeyword::Container, "top", true)
            .unwrap();
        reg.add_node("m", Some(top), YangKeyword::List, "server", true)
            .unwrap();
        reg.add_node("m", Some(top), YangKeyword::Leaf, "name", true)
            .unwrap();
        let stats = reg
            .add_node("m", Some(top), YangKeyword::Container, "stats", false)
            .unwrap();
        reg.add_node("m", Some(stats), YangKeyword::List, "session", false)
            .unwrap();
        reg
    }

    fn ids(n: usize) -> Vec<NodeId> {
        let mut arena = NodeArena::new("config");
        let root = arena.root();
        (0..n).map(|i| arena.new_element(root, format!("e{}", i), None)).collect()
    }

    #[test]
    fn test_window_boundaries() {
        let all = ids(10);
        assert_eq!(Window::default().apply(all.clone()), all);
        assert_eq!(
            Window { offset: 3, limit: 2 }.apply(all.clone()),
            all[3..5].to_vec()
        );
        assert!(Window { offset: 11, limit: 0 }.apply(all.clone()).is_empty());
        assert_eq!(
            Window { offset: 0, limit: 1 }.apply(all.clone()),
            all[0..1].to_vec()
        );
        assert_eq!(Window { offset: 8, limit: 5 }.apply(all).len(), 2);
    }

    #[test]
    fn test_parse_window_defaults() {
        let arena = NodeArena::parse(
            "<get><list-pagination><offset>none</offset><limit>unbounded</limit>\
             </list-pagination></get>",
        )
        .unwrap();
        let lp = arena.find_child(arena.root(), "list-pagination").unwrap();
        let w = parse_window(&arena, lp).unwrap();
        assert!(w.is_unbounded());
    }

    #[test]
    fn test_parse_window_values() {
        let arena = NodeArena::parse(
            "<get><list-pagination><offset>3</offset><limit>2</limit>\
             </list-pagination></get>",
        )
        .unwrap();
        let lp = arena.find_child(arena.root(), "list-pagination").unwrap();
        let w = parse_window(&arena, lp).unwrap();
        assert_eq!(w, Window { offset: 3, limit: 2 });
    }

    #[test]
    fn test_parse_window_direction() {
        let arena = NodeArena::parse(
            "<get><list-pagination><direction>reverse</direction></list-pagination></get>",
        )
        .unwrap();
        let lp = arena.find_child(arena.root(), "list-pagination").unwrap();
        assert!(parse_window(&arena, lp).is_ok());

        let arena = NodeArena::parse(
            "<get><list-pagination><direction>sideways</direction></list-pagination></get>",
        )
        .unwrap();
        let lp = arena.find_child(arena.root(), "list-pagination").unwrap();
        let err = parse_window(&arena, lp).unwrap_err();
        assert_eq!(err.bad_element.as_deref(), Some("direction"));
    }

    #[test]
    fn test_parse_window_rejects_garbage() {
        let arena = NodeArena::parse(
            "<get><list-pagination><offset>minus-one</offset></list-pagination></get>",
        )
        .unwrap();
        let lp = arena.find_child(arena.root(), "list-pagination").unwrap();
        let err = parse_window(&arena, lp).unwrap_err();
        assert_eq!(err.bad_element.as_deref(), Some("offset"));
    }

    #[test]
    fn test_resolve_target() {
        let reg = registry();
        let xp = XPath::parse("/top/server").unwrap();
        let target = resolve_target(&reg, Some(&xp)).unwrap();
        assert!(target.config);

        let xp = XPath::parse("/top/stats/session").unwrap();
        let target = resolve_target(&reg, Some(&xp)).unwrap();
        assert!(!target.config);
    }

    #[test]
    fn test_resolve_target_rejects_non_lists() {
        let reg = registry();
        let xp = XPath::parse("/top/name").unwrap();
        let err = resolve_target(&reg, Some(&xp)).unwrap_err();
        assert!(err.message.contains("not list or leaf-list"));

        let xp = XPath::parse("/top/missing").unwrap();
        assert!(resolve_target(&reg, Some(&xp)).is_err());
        assert!(resolve_target(&reg, None).is_err());
    }
}
