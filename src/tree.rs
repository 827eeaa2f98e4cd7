//! In-memory XML document tree
//!
//! Documents are stored in an arena: a flat `Vec` of nodes addressed by
//! [`NodeId`] indices. The arena owns every node; parent back-references are
//! plain indices and never ownership, so the parent/child cycle that a boxed
//! tree would create does not arise. Detaching an id from its parent's child
//! list removes the subtree from the document (the slots stay allocated for
//! the lifetime of the arena, which is request-scoped).
//!
//! Three node kinds exist: elements, attributes, and text. Attributes and
//! namespace declarations (`xmlns`, `xmlns:p`) are ordinary children carrying
//! the [`NodeKind::Attribute`] tag. An element's *body* is the value of its
//! first text child.

use bitflags::bitflags;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::schema::SchemaId;

/// Index of a node within its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Node kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An element node
    Element,
    /// An attribute node (including namespace declarations)
    Attribute,
    /// A text node
    Text,
}

bitflags! {
    /// Scratch flags on tree nodes
    ///
    /// `MARK` is strictly request-local scratch state: it must be zero before
    /// and after every top-level operation. `DEFAULT` tags nodes that were
    /// synthesised from schema default values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u16 {
        /// Selection scratch flag
        const MARK = 0x01;
        /// Node carries a schema default value
        const DEFAULT = 0x02;
    }
}

/// A single XML node
#[derive(Debug, Clone)]
pub struct XmlNode {
    kind: NodeKind,
    name: String,
    prefix: Option<String>,
    value: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    schema: Option<SchemaId>,
    flags: NodeFlags,
}

impl XmlNode {
    fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            prefix: None,
            value: None,
            children: Vec::new(),
            parent: None,
            schema: None,
            flags: NodeFlags::empty(),
        }
    }
}

/// An XML document arena
#[derive(Debug, Clone)]
pub struct NodeArena {
    nodes: Vec<XmlNode>,
    root: NodeId,
}

impl NodeArena {
    /// Create an arena holding a single root element
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = XmlNode::new(NodeKind::Element, root_name);
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Parse an XML document into an arena
    ///
    /// The document must have exactly one root element. Comments, processing
    /// instructions and the XML declaration are skipped.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut nodes: Vec<XmlNode> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let id = push_element(&mut nodes, &mut stack, &mut root, e.name(), || {
                        Error::Xml("multiple root elements".to_string())
                    })?;
                    for attr in e.attributes() {
                        let attr =
                            attr.map_err(|err| Error::Xml(format!("bad attribute: {}", err)))?;
                        let value = attr
                            .unescape_value()
                            .map_err(|err| Error::Xml(err.to_string()))?
                            .into_owned();
                        append_attribute(&mut nodes, id, attr.key, value);
                    }
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let id = push_element(&mut nodes, &mut stack, &mut root, e.name(), || {
                        Error::Xml("multiple root elements".to_string())
                    })?;
                    for attr in e.attributes() {
                        let attr =
                            attr.map_err(|err| Error::Xml(format!("bad attribute: {}", err)))?;
                        let value = attr
                            .unescape_value()
                            .map_err(|err| Error::Xml(err.to_string()))?
                            .into_owned();
                        append_attribute(&mut nodes, id, attr.key, value);
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(|err| Error::Xml(err.to_string()))?;
                    if let Some(&parent) = stack.last() {
                        let id = NodeId(nodes.len());
                        let mut node = XmlNode::new(NodeKind::Text, "body");
                        node.value = Some(text.into_owned());
                        node.parent = Some(parent);
                        nodes.push(node);
                        nodes[parent.0].children.push(id);
                    }
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }
        match root {
            Some(root) if stack.is_empty() => Ok(Self { nodes, root }),
            Some(_) => Err(Error::Xml("unclosed element".to_string())),
            None => Err(Error::Xml("no root element".to_string())),
        }
    }

    /// The root node id
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated (including detached ones)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the arena holds only the root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id.0]
    }

    /// Node kind
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    /// Local name
    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    /// Rename a node
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.nodes[id.0].name = name.into();
    }

    /// Namespace prefix, if any
    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        self.node(id).prefix.as_deref()
    }

    /// Node value (text content for text nodes, value for attributes)
    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.node(id).value.as_deref()
    }

    /// Parent node id
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Ordered child ids (all kinds)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Ordered element children
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(|&c| self.kind(c) == NodeKind::Element)
            .collect()
    }

    /// Ordered attribute children
    pub fn attributes(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(|&c| self.kind(c) == NodeKind::Attribute)
            .collect()
    }

    /// Schema binding, if any
    pub fn schema(&self, id: NodeId) -> Option<SchemaId> {
        self.node(id).schema
    }

    /// Bind a node to a schema node
    pub fn set_schema(&mut self, id: NodeId, schema: Option<SchemaId>) {
        self.nodes[id.0].schema = schema;
    }

    /// Body of an element: the value of its first text child
    pub fn body(&self, id: NodeId) -> Option<&str> {
        self.node(id)
            .children
            .iter()
            .find(|&&c| self.kind(c) == NodeKind::Text)
            .and_then(|&c| self.value(c))
    }

    /// Walk to the root-most ancestor of a node
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(p) = self.parent(cur) {
            cur = p;
        }
        cur
    }

    /// Create an element under `parent`
    pub fn new_element(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        prefix: Option<&str>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut node = XmlNode::new(NodeKind::Element, name);
        node.prefix = prefix.map(|p| p.to_string());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Create a text child under `parent`
    pub fn new_text(&mut self, parent: NodeId, value: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut node = XmlNode::new(NodeKind::Text, "body");
        node.value = Some(value.into());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Create an attribute child under `parent`
    pub fn new_attribute(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        prefix: Option<&str>,
        value: impl Into<String>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut node = XmlNode::new(NodeKind::Attribute, name);
        node.prefix = prefix.map(|p| p.to_string());
        node.value = Some(value.into());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Declare a namespace on an element (`xmlns` or `xmlns:prefix`)
    pub fn declare_namespace(&mut self, id: NodeId, prefix: Option<&str>, uri: &str) -> NodeId {
        match prefix {
            Some(p) => self.new_attribute(id, p, Some("xmlns"), uri),
            None => self.new_attribute(id, "xmlns", None, uri),
        }
    }

    /// Set an element's body, replacing any existing text child
    pub fn set_body(&mut self, id: NodeId, value: impl Into<String>) {
        let text = self
            .node(id)
            .children
            .iter()
            .copied()
            .find(|&c| self.kind(c) == NodeKind::Text);
        match text {
            Some(t) => self.nodes[t.0].value = Some(value.into()),
            None => {
                self.new_text(id, value);
            }
        }
    }

    /// First element child with the given local name
    pub fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|&c| self.kind(c) == NodeKind::Element && self.name(c) == name)
    }

    /// Value of the first attribute with the given local name, ignoring
    /// namespace declarations
    pub fn find_attr_value(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|&c| {
                self.kind(c) == NodeKind::Attribute
                    && self.name(c) == name
                    && self.prefix(c) != Some("xmlns")
                    && self.name(c) != "xmlns"
            })
            .and_then(|c| self.value(c))
    }

    /// Detach a subtree from its parent's child list
    ///
    /// Detaching the root is a no-op.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.nodes[parent.0].children.retain(|&c| c != id);
            self.nodes[id.0].parent = None;
        }
    }

    /// Element descendants of `id` in document (preorder) order, including
    /// `id` itself when it is an element
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut work = vec![id];
        while let Some(cur) = work.pop() {
            if self.kind(cur) == NodeKind::Element {
                out.push(cur);
                for &c in self.node(cur).children.iter().rev() {
                    if self.kind(c) == NodeKind::Element {
                        work.push(c);
                    }
                }
            }
        }
        out
    }

    /// Flag accessors
    pub fn has_flag(&self, id: NodeId, flags: NodeFlags) -> bool {
        self.node(id).flags.intersects(flags)
    }

    /// The full flag set of a node
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.node(id).flags
    }

    /// Set flags on a node
    pub fn set_flag(&mut self, id: NodeId, flags: NodeFlags) {
        self.nodes[id.0].flags.insert(flags);
    }

    /// Clear flags on a node
    pub fn clear_flag(&mut self, id: NodeId, flags: NodeFlags) {
        self.nodes[id.0].flags.remove(flags);
    }

    /// True when `ancestor` is `id` or an ancestor of `id`
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.parent(c);
        }
        false
    }
}

fn push_element(
    nodes: &mut Vec<XmlNode>,
    stack: &mut [NodeId],
    root: &mut Option<NodeId>,
    qname: quick_xml::name::QName<'_>,
    dup_root: impl FnOnce() -> Error,
) -> Result<NodeId> {
    let local = std::str::from_utf8(qname.local_name().as_ref())
        .map_err(|_| Error::Xml("non-UTF8 element name".to_string()))?
        .to_string();
    let prefix = match qname.prefix() {
        Some(p) => Some(
            std::str::from_utf8(p.as_ref())
                .map_err(|_| Error::Xml("non-UTF8 prefix".to_string()))?
                .to_string(),
        ),
        None => None,
    };
    let id = NodeId(nodes.len());
    let mut node = XmlNode::new(NodeKind::Element, local);
    node.prefix = prefix;
    match stack.last() {
        Some(&parent) => {
            node.parent = Some(parent);
            nodes.push(node);
            nodes[parent.0].children.push(id);
        }
        None => {
            if root.is_some() {
                return Err(dup_root());
            }
            nodes.push(node);
            *root = Some(id);
        }
    }
    Ok(id)
}

fn append_attribute(
    nodes: &mut Vec<XmlNode>,
    parent: NodeId,
    key: quick_xml::name::QName<'_>,
    value: String,
) {
    let local = String::from_utf8_lossy(key.local_name().as_ref()).into_owned();
    let prefix = key
        .prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned());
    let id = NodeId(nodes.len());
    let mut node = XmlNode::new(NodeKind::Attribute, local);
    node.prefix = prefix;
    node.value = Some(value);
    node.parent = Some(parent);
    nodes.push(node);
    nodes[parent.0].children.push(id);
}
