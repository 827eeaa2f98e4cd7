//! XML serialisation of reply trees
//!
//! Subtrees serialise through a `quick_xml` writer with a depth bound: a
//! negative depth is unlimited, 0 emits nothing, and a positive depth stops
//! below that many element levels (elements at the boundary render as empty
//! tags). Reply envelopes wrap the serialised `<data>` tree in
//! `<rpc-reply>` under the NETCONF base namespace.

use std::borrow::Cow;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{Error, RpcError, Result};
use crate::namespaces::NETCONF_BASE_NAMESPACE;
use crate::tree::{NodeArena, NodeId, NodeKind};

/// Escape text for inclusion in XML content
pub(crate) fn escape_text(s: &str) -> Cow<'_, str> {
    if s.contains(['&', '<', '>']) {
        Cow::Owned(
            s.replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;"),
        )
    } else {
        Cow::Borrowed(s)
    }
}

fn qualified_name(arena: &NodeArena, id: NodeId) -> String {
    match arena.prefix(id) {
        Some(p) => format!("{}:{}", p, arena.name(id)),
        None => arena.name(id).to_string(),
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    arena: &NodeArena,
    id: NodeId,
    depth: i32,
) -> Result<()> {
    let name = qualified_name(arena, id);
    let mut start = BytesStart::new(name.clone());
    for attr in arena.attributes(id) {
        let key = qualified_name(arena, attr);
        start.push_attribute((key.as_str(), arena.value(attr).unwrap_or("")));
    }

    let remaining = if depth < 0 { depth } else { depth - 1 };
    let content: Vec<NodeId> = arena
        .children(id)
        .iter()
        .copied()
        .filter(|&c| match arena.kind(c) {
            NodeKind::Element => remaining != 0,
            NodeKind::Text => true,
            NodeKind::Attribute => false,
        })
        .collect();

    if content.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in content {
        match arena.kind(child) {
            NodeKind::Element => write_element(writer, arena, child, remaining)?,
            NodeKind::Text => {
                writer.write_event(Event::Text(BytesText::new(
                    arena.value(child).unwrap_or(""),
                )))?;
            }
            NodeKind::Attribute => {}
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Serialise a subtree to a string
///
/// `depth` counts element levels from `id` inclusive: `-1` is unlimited,
/// `0` emits nothing.
pub fn node_to_xml(arena: &NodeArena, id: NodeId, depth: i32) -> Result<String> {
    if depth == 0 {
        return Ok(String::new());
    }
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, arena, id, depth)?;
    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

/// Wrap a serialised `<data>` tree in a success envelope
///
/// `message_id` is echoed when the request carried one. The tree root must
/// already be named `data`; serialisation from the `<data>` root adds one
/// level, so a positive depth is incremented by one.
pub fn rpc_reply_data(
    arena: &NodeArena,
    root: NodeId,
    depth: i32,
    message_id: Option<&str>,
) -> Result<String> {
    let body = node_to_xml(arena, root, if depth > 0 { depth + 1 } else { depth })?;
    let mut out = reply_open(message_id);
    if body.is_empty() {
        out.push_str("<data/>");
    } else {
        out.push_str(&body);
    }
    out.push_str("</rpc-reply>");
    Ok(out)
}

/// Wrap a protocol error in an error envelope
pub fn rpc_reply_error(err: &RpcError, message_id: Option<&str>) -> String {
    let mut out = reply_open(message_id);
    out.push_str(&err.to_xml());
    out.push_str("</rpc-reply>");
    out
}

fn reply_open(message_id: Option<&str>) -> String {
    match message_id {
        Some(id) => format!(
            "<rpc-reply message-id=\"{}\" xmlns=\"{}\">",
            escape_text(id),
            NETCONF_BASE_NAMESPACE
        ),
        None => format!("<rpc-reply xmlns=\"{}\">", NETCONF_BASE_NAMESPACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roundtrip() {
        let xml = "<top xmlns=\"u\"><a>1</a><a>2</a></top>";
        let arena = NodeArena::parse(xml).unwrap();
        assert_eq!(node_to_xml(&arena, arena.root(), -1).unwrap(), xml);
    }

    #[test]
    fn test_empty_elements() {
        let arena = NodeArena::parse("<top><a/><b></b></top>").unwrap();
        assert_eq!(
            node_to_xml(&arena, arena.root(), -1).unwrap(),
            "<top><a/><b/></top>"
        );
    }

    #[test]
    fn test_depth_limit() {
        let arena = NodeArena::parse("<a><b><c><d/></c></b></a>").unwrap();
        assert_eq!(node_to_xml(&arena, arena.root(), 1).unwrap(), "<a/>");
        assert_eq!(node_to_xml(&arena, arena.root(), 2).unwrap(), "<a><b/></a>");
        assert_eq!(
            node_to_xml(&arena, arena.root(), 3).unwrap(),
            "<a><b><c/></b></a>"
        );
        assert_eq!(node_to_xml(&arena, arena.root(), 0).unwrap(), "");
    }

    #[test]
    fn test_prefixed_serialisation() {
        let xml = "<t:top xmlns:t=\"u\"><t:a wd:default=\"true\" xmlns:wd=\"w\">5</t:a></t:top>";
        let arena = NodeArena::parse(xml).unwrap();
        assert_eq!(node_to_xml(&arena, arena.root(), -1).unwrap(), xml);
    }

    #[test]
    fn test_text_is_escaped() {
        let mut arena = NodeArena::new("top");
        let root = arena.root();
        arena.set_body(root, "a < b & c");
        assert_eq!(
            node_to_xml(&arena, root, -1).unwrap(),
            "<top>a &lt; b &amp; c</top>"
        );
    }

    #[test]
    fn test_reply_envelopes() {
        let mut arena = NodeArena::new("data");
        let root = arena.root();
        let top = arena.new_element(root, "top", None);
        arena.set_body(top, "x");

        let reply = rpc_reply_data(&arena, root, -1, Some("101")).unwrap();
        assert_eq!(
            reply,
            "<rpc-reply message-id=\"101\" xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
             <data><top>x</top></data></rpc-reply>"
        );

        let empty = NodeArena::new("data");
        let reply = rpc_reply_data(&empty, empty.root(), -1, None).unwrap();
        assert_eq!(
            reply,
            "<rpc-reply xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><data/></rpc-reply>"
        );
    }

    #[test]
    fn test_reply_depth_adds_one_from_data_root() {
        let arena = NodeArena::parse("<data><a><b><c><d/></c></b></a></data>").unwrap();
        let reply = rpc_reply_data(&arena, arena.root(), 2, None).unwrap();
        assert!(reply.contains("<data><a><b/></a></data>"));
    }

    #[test]
    fn test_error_envelope() {
        let err = RpcError::invalid_value("bad things");
        let reply = rpc_reply_error(&err, None);
        assert!(reply.starts_with(
            "<rpc-reply xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><rpc-error>"
        ));
        assert!(reply.ends_with("</rpc-error></rpc-reply>"));
    }
}
