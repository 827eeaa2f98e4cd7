//! YANG schema registry
//!
//! The registry holds compiled schema nodes for a set of YANG modules and is
//! read-only once loaded. Schema compilation itself is out of scope; callers
//! (or tests) populate the registry through the builder API with the handful
//! of properties the query pipeline consumes: statement keyword, argument,
//! namespace, `config` classification and optional default value.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::namespaces;
use crate::tree::{NodeArena, NodeId, NodeKind};

/// Index of a schema node within the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(usize);

/// YANG statement keyword of a data node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YangKeyword {
    /// `container`
    Container,
    /// `list`
    List,
    /// `leaf-list`
    LeafList,
    /// `leaf`
    Leaf,
}

/// A compiled YANG data node
#[derive(Debug, Clone)]
pub struct SchemaNode {
    /// Statement keyword
    pub keyword: YangKeyword,
    /// Statement argument (the node name)
    pub name: String,
    /// Owning module name
    pub module: String,
    /// Module namespace URI
    pub namespace: String,
    /// `default` substatement value, if any
    pub default_value: Option<String>,
    /// `config` classification (`true` unless `config false`)
    pub config: bool,
    children: Vec<SchemaId>,
    parent: Option<SchemaId>,
}

/// A loaded YANG module
#[derive(Debug, Clone)]
pub struct SchemaModule {
    /// Module name
    pub name: String,
    /// Module namespace URI
    pub namespace: String,
    /// Canonical prefix
    pub prefix: String,
    /// Latest revision date, if known
    pub revision: Option<String>,
    top: Vec<SchemaId>,
}

/// Registry mapping module names and namespaces to compiled schema nodes
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    nodes: Vec<SchemaNode>,
    modules: IndexMap<String, SchemaModule>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module
    pub fn add_module(
        &mut self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        if self.modules.contains_key(&name) {
            return Err(Error::Schema(format!("module {} already loaded", name)));
        }
        self.modules.insert(
            name.clone(),
            SchemaModule {
                name,
                namespace: namespace.into(),
                prefix: prefix.into(),
                revision: None,
                top: Vec::new(),
            },
        );
        Ok(())
    }

    /// Set a module's revision date
    pub fn set_revision(&mut self, module: &str, revision: impl Into<String>) -> Result<()> {
        let m = self
            .modules
            .get_mut(module)
            .ok_or_else(|| Error::Schema(format!("no such module: {}", module)))?;
        m.revision = Some(revision.into());
        Ok(())
    }

    /// Add a data node to a module, under `parent` or at module top level
    pub fn add_node(
        &mut self,
        module: &str,
        parent: Option<SchemaId>,
        keyword: YangKeyword,
        name: impl Into<String>,
        config: bool,
    ) -> Result<SchemaId> {
        let Some(entry) = self.modules.get(module) else {
            return Err(Error::Schema(format!("no such module: {}", module)));
        };
        let namespace = entry.namespace.clone();
        let id = SchemaId(self.nodes.len());
        self.nodes.push(SchemaNode {
            keyword,
            name: name.into(),
            module: module.to_string(),
            namespace,
            default_value: None,
            config,
            children: Vec::new(),
            parent,
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => {
                if let Some(m) = self.modules.get_mut(module) {
                    m.top.push(id);
                }
            }
        }
        Ok(id)
    }

    /// Set the default value of a leaf
    pub fn set_default(&mut self, id: SchemaId, default: impl Into<String>) {
        self.nodes[id.0].default_value = Some(default.into());
    }

    /// Look up a schema node
    pub fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Child schema nodes of `id`
    pub fn children(&self, id: SchemaId) -> &[SchemaId] {
        &self.nodes[id.0].children
    }

    /// Iterate loaded modules in load order
    pub fn modules(&self) -> impl Iterator<Item = &SchemaModule> {
        self.modules.values()
    }

    /// Module by name
    pub fn module(&self, name: &str) -> Option<&SchemaModule> {
        self.modules.get(name)
    }

    /// Module by namespace URI
    pub fn module_by_namespace(&self, namespace: &str) -> Option<&SchemaModule> {
        self.modules.values().find(|m| m.namespace == namespace)
    }

    /// True when the registry holds no modules
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn find_top(&self, name: &str) -> Option<SchemaId> {
        self.modules
            .values()
            .flat_map(|m| m.top.iter())
            .copied()
            .find(|&id| self.nodes[id.0].name == name)
    }

    fn find_child(&self, parent: SchemaId, name: &str) -> Option<SchemaId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&id| self.nodes[id.0].name == name)
    }

    /// Resolve a path of node names (top-down) to a schema node
    ///
    /// Used by the pagination planner to classify the target of a plain
    /// location path. Returns `None` when any step does not resolve.
    pub fn resolve_path(&self, names: &[&str]) -> Option<SchemaId> {
        let mut iter = names.iter();
        let first = iter.next()?;
        let mut cur = self.find_top(first)?;
        for name in iter {
            cur = self.find_child(cur, name)?;
        }
        Some(cur)
    }

    /// True when `id` and all its schema ancestors are `config true`
    pub fn config_chain(&self, id: SchemaId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if !self.nodes[c.0].config {
                return false;
            }
            cur = self.nodes[c.0].parent;
        }
        true
    }

    /// Bind a data tree to schema nodes by name and namespace
    ///
    /// Elements below the (synthetic) root are matched against module
    /// top-level nodes, then against their parent binding's children.
    /// Returns the elements that did not bind.
    pub fn bind_tree(&self, arena: &mut NodeArena, root: NodeId) -> Vec<NodeId> {
        let mut unbound = Vec::new();
        let children = arena.element_children(root);
        for child in children {
            self.bind_node(arena, child, None, &mut unbound);
        }
        unbound
    }

    fn bind_node(
        &self,
        arena: &mut NodeArena,
        id: NodeId,
        parent_schema: Option<SchemaId>,
        unbound: &mut Vec<NodeId>,
    ) {
        let name = arena.name(id).to_string();
        let candidate = match parent_schema {
            Some(p) => self.find_child(p, &name),
            None => self.find_top(&name),
        };
        // Cross-check the element's namespace against the candidate module.
        let bound = candidate.filter(|&sid| {
            let prefix = arena.prefix(id).map(|p| p.to_string());
            match namespaces::lookup_prefix_uri(arena, id, prefix.as_deref()) {
                Some(uri) => uri == self.nodes[sid.0].namespace,
                None => true,
            }
        });
        arena.set_schema(id, bound);
        if bound.is_none() {
            unbound.push(id);
        }
        for child in arena.element_children(id) {
            self.bind_node(arena, child, bound, unbound);
        }
    }

    /// Validate that every element of the tree binds to the schema
    ///
    /// Used when `VALIDATE_STATE_XML` is enabled: plugin-supplied state must
    /// be expressible in the loaded modules.
    pub fn validate_tree(&self, arena: &mut NodeArena, root: NodeId) -> Result<()> {
        let unbound = self.bind_tree(arena, root);
        match unbound.first() {
            Some(&id) => Err(Error::Schema(format!(
                "element {} does not match any schema node",
                arena.name(id)
            ))),
            None => Ok(()),
        }
    }
}

/// Helper iterating element descendants bound to `config false` schema
pub fn is_nonconfig(registry: &SchemaRegistry, arena: &NodeArena, id: NodeId) -> bool {
    debug_assert_eq!(arena.kind(id), NodeKind::Element);
    match arena.schema(id) {
        Some(sid) => !registry.config_chain(sid),
        // Unbound elements (monitoring augmentations, plugin state outside
        // the loaded modules) are treated as state data.
        None => true,
    }
}
