//! XML namespace handling
//!
//! A [`NamespaceContext`] is an ordered mapping from prefix to namespace URI,
//! computed from the `xmlns` / `xmlns:p` declarations in scope at a specific
//! element. RFC 6241 section 8.9.1 makes this the context for XPath filters:
//! the namespace declarations are those in scope on the `<filter>` element.

use indexmap::IndexMap;

use crate::tree::{NodeArena, NodeId};

/// NETCONF base protocol namespace (RFC 6241)
pub const NETCONF_BASE_NAMESPACE: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// With-defaults metadata namespace (RFC 6243)
pub const WITH_DEFAULTS_NAMESPACE: &str = "urn:ietf:params:xml:ns:netconf:default:1.0";

/// Event stream discovery namespace (RFC 5277)
pub const NOTIFICATION_NAMESPACE: &str = "urn:ietf:params:xml:ns:netmod:notification";

/// RESTCONF monitoring namespace (RFC 8040)
pub const RESTCONF_MONITORING_NAMESPACE: &str =
    "urn:ietf:params:xml:ns:yang:ietf-restconf-monitoring";

/// YANG library namespace (RFC 7895)
pub const YANG_LIBRARY_NAMESPACE: &str = "urn:ietf:params:xml:ns:yang:ietf-yang-library";

/// Ordered mapping from prefix to namespace URI
///
/// The empty prefix denotes the default namespace. Insertion order is
/// preserved; the first binding for a prefix wins, which gives the
/// nearest-declaration-wins rule when filling the map from an ancestor walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceContext {
    map: IndexMap<String, String>,
}

impl NamespaceContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a prefix unless it is already bound
    ///
    /// `None` binds the default namespace.
    pub fn add(&mut self, prefix: Option<&str>, uri: impl Into<String>) {
        let key = prefix.unwrap_or("").to_string();
        self.map.entry(key).or_insert_with(|| uri.into());
    }

    /// Resolve a prefix to a namespace URI
    ///
    /// `None` resolves the default namespace.
    pub fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        self.map.get(prefix.unwrap_or("")).map(|s| s.as_str())
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no prefix is bound
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate bindings in declaration order; the default namespace has an
    /// empty prefix
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for NamespaceContext {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut nsc = NamespaceContext::new();
        for (prefix, uri) in iter {
            let p = if prefix.is_empty() { None } else { Some(prefix.as_str()) };
            nsc.add(p, uri.clone());
        }
        nsc
    }
}

/// Compute the namespace context in scope at an element
///
/// Walks ancestor-or-self collecting `xmlns` and `xmlns:p` attribute
/// declarations; the nearest declaration for each prefix wins.
pub fn for_element(arena: &NodeArena, id: NodeId) -> NamespaceContext {
    let mut nsc = NamespaceContext::new();
    let mut cur = Some(id);
    while let Some(node) = cur {
        for attr in arena.attributes(node) {
            match (arena.prefix(attr), arena.name(attr)) {
                (None, "xmlns") => {
                    if let Some(uri) = arena.value(attr) {
                        nsc.add(None, uri);
                    }
                }
                (Some("xmlns"), prefix) => {
                    if let Some(uri) = arena.value(attr) {
                        nsc.add(Some(prefix), uri);
                    }
                }
                _ => {}
            }
        }
        cur = arena.parent(node);
    }
    nsc
}

/// Resolve a prefix to its URI in the document scope of an element
///
/// `None` resolves the default namespace in scope. Returns `None` when no
/// declaration is visible.
pub fn lookup_prefix_uri(
    arena: &NodeArena,
    id: NodeId,
    prefix: Option<&str>,
) -> Option<String> {
    let mut cur = Some(id);
    while let Some(node) = cur {
        for attr in arena.attributes(node) {
            match (prefix, arena.prefix(attr), arena.name(attr)) {
                (None, None, "xmlns") => return arena.value(attr).map(|s| s.to_string()),
                (Some(p), Some("xmlns"), name) if name == p => {
                    return arena.value(attr).map(|s| s.to_string())
                }
                _ => {}
            }
        }
        cur = arena.parent(node);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_default_and_prefixed() {
        let mut nsc = NamespaceContext::new();
        nsc.add(None, "urn:example:config");
        nsc.add(Some("t"), "urn:example:types");

        assert_eq!(nsc.lookup(None), Some("urn:example:config"));
        assert_eq!(nsc.lookup(Some("t")), Some("urn:example:types"));
        assert_eq!(nsc.lookup(Some("x")), None);
    }

    #[test]
    fn test_first_binding_wins() {
        let mut nsc = NamespaceContext::new();
        nsc.add(Some("t"), "urn:near");
        nsc.add(Some("t"), "urn:far");
        assert_eq!(nsc.lookup(Some("t")), Some("urn:near"));
    }

    #[test]
    fn test_for_element_walks_ancestors() {
        let arena = NodeArena::parse(
            "<rpc xmlns=\"urn:base\"><get-config>\
             <filter xmlns:t=\"urn:t\" type=\"xpath\" select=\"/t:top\"/>\
             </get-config></rpc>",
        )
        .unwrap();
        let get = arena.find_child(arena.root(), "get-config").unwrap();
        let filter = arena.find_child(get, "filter").unwrap();
        let nsc = for_element(&arena, filter);
        assert_eq!(nsc.lookup(Some("t")), Some("urn:t"));
        assert_eq!(nsc.lookup(None), Some("urn:base"));
    }

    #[test]
    fn test_nearest_declaration_wins() {
        let arena = NodeArena::parse(
            "<a xmlns:p=\"urn:outer\"><b xmlns:p=\"urn:inner\"><c/></b></a>",
        )
        .unwrap();
        let b = arena.find_child(arena.root(), "b").unwrap();
        let c = arena.find_child(b, "c").unwrap();
        let nsc = for_element(&arena, c);
        assert_eq!(nsc.lookup(Some("p")), Some("urn:inner"));
        assert_eq!(
            lookup_prefix_uri(&arena, c, Some("p")).as_deref(),
            Some("urn:inner")
        );
    }

    #[test]
    fn test_lookup_prefix_uri_unbound() {
        let arena = NodeArena::parse("<a><b/></a>").unwrap();
        let b = arena.find_child(arena.root(), "b").unwrap();
        assert_eq!(lookup_prefix_uri(&arena, b, None), None);
        assert_eq!(lookup_prefix_uri(&arena, b, Some("q")), None);
    }
}
