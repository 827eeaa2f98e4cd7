//! The `<get>` / `<get-config>` query handler
//!
//! Both operations share one procedure parameterised by content class and
//! source datastore: parse the request parameters, branch to pagination if
//! asked, read the datastore snapshot, merge plugin state, apply defaults
//! and with-defaults, select with XPath, prune to the selection, gate
//! through NACM and serialise the reply envelope.
//!
//! Recoverable failures never tear the session down: they are translated
//! into `<rpc-error>` replies and returned as success to the transport.

use log::debug;

use crate::datastore::{Datastore, DATASTORE_TOP_SYMBOL};
use crate::defaults::{self, WithDefaultsMode};
use crate::error::{ErrorTag, ErrorType, Result, RpcError};
use crate::filter;
use crate::nacm::NacmCache;
use crate::namespaces::{self, NamespaceContext};
use crate::options::EngineOptions;
use crate::pagination;
use crate::schema::SchemaRegistry;
use crate::serialize;
use crate::state::{self, EventStreamRegistry, PluginHost};
use crate::tree::{NodeArena, NodeFlags, NodeId};
use crate::xpath::{self, XPath};

/// Requested content class of a `<get>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// Configuration data only
    Config,
    /// State data only
    Nonconfig,
    /// Both configuration and state
    All,
}

impl ContentClass {
    fn from_attr(s: &str) -> Option<Self> {
        match s {
            "config" => Some(ContentClass::Config),
            "nonconfig" => Some(ContentClass::Nonconfig),
            "all" => Some(ContentClass::All),
            _ => None,
        }
    }
}

/// A client session issuing requests
#[derive(Debug, Clone)]
pub struct Session {
    /// Session id, used for lock ownership checks
    pub id: u32,
    /// User name, used for NACM filtering
    pub username: String,
}

impl Session {
    /// Create a session
    pub fn new(id: u32, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

/// The query handler with its collaborators
pub struct QueryHandler {
    registry: SchemaRegistry,
    datastore: Box<dyn Datastore>,
    plugins: PluginHost,
    streams: EventStreamRegistry,
    nacm: Option<NacmCache>,
    options: EngineOptions,
}

impl QueryHandler {
    /// Create a handler over a schema registry and a datastore
    pub fn new(registry: SchemaRegistry, datastore: Box<dyn Datastore>) -> Self {
        Self {
            registry,
            datastore,
            plugins: PluginHost::new(),
            streams: EventStreamRegistry::new(),
            nacm: None,
            options: EngineOptions::default(),
        }
    }

    /// Set the engine options
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the plugin host
    pub fn with_plugins(mut self, plugins: PluginHost) -> Self {
        self.plugins = plugins;
        self
    }

    /// Set the event stream registry
    pub fn with_streams(mut self, streams: EventStreamRegistry) -> Self {
        self.streams = streams;
        self
    }

    /// Load a NACM cache; `None` means permit-all
    pub fn with_nacm(mut self, nacm: NacmCache) -> Self {
        self.nacm = Some(nacm);
        self
    }

    /// Parse an `<rpc>` request and dispatch the operation
    ///
    /// The returned string is always a complete `<rpc-reply>`; protocol
    /// failures are error replies, not `Err`.
    pub fn dispatch(&self, session: &Session, request: &str) -> Result<String> {
        let req = match NodeArena::parse(request) {
            Ok(req) => req,
            Err(e) => {
                let err = RpcError::new(
                    ErrorType::Rpc,
                    ErrorTag::OperationFailed,
                    format!("malformed rpc: {}", e),
                );
                return Ok(serialize::rpc_reply_error(&err, None));
            }
        };
        let rpc = req.root();
        let message_id = req.find_attr_value(rpc, "message-id").map(|s| s.to_string());
        let msgid = message_id.as_deref();

        let Some(op) = req.element_children(rpc).into_iter().next() else {
            let err = RpcError::new(
                ErrorType::Rpc,
                ErrorTag::OperationFailed,
                "rpc carries no operation",
            );
            return Ok(serialize::rpc_reply_error(&err, msgid));
        };
        match req.name(op) {
            "get" => self.get(session, &req, op, msgid),
            "get-config" => self.get_config(session, &req, op, msgid),
            other => {
                let err = RpcError::new(
                    ErrorType::Protocol,
                    ErrorTag::OperationNotSupported,
                    format!("operation {} not supported", other),
                );
                Ok(serialize::rpc_reply_error(&err, msgid))
            }
        }
    }

    /// Retrieve running configuration and device state information
    pub fn get(
        &self,
        session: &Session,
        req: &NodeArena,
        op: NodeId,
        message_id: Option<&str>,
    ) -> Result<String> {
        let content = match req.find_attr_value(op, "content") {
            None => ContentClass::All,
            Some(attr) => match ContentClass::from_attr(attr) {
                Some(c) => c,
                None => {
                    let err = RpcError::invalid_value(format!(
                        "Unrecognized value of content attribute: {}",
                        attr
                    ));
                    return Ok(serialize::rpc_reply_error(&err, message_id));
                }
            },
        };
        self.get_common(session, req, op, content, "running", message_id)
    }

    /// Retrieve all or part of a specified configuration
    pub fn get_config(
        &self,
        session: &Session,
        req: &NodeArena,
        op: NodeId,
        message_id: Option<&str>,
    ) -> Result<String> {
        let db = req
            .find_child(op, "source")
            .and_then(|source| req.element_children(source).into_iter().next())
            .map(|db| req.name(db).to_string());
        let Some(db) = db else {
            let err = RpcError::operation_failed("source database not found in request");
            return Ok(serialize::rpc_reply_error(&err, message_id));
        };
        self.get_common(session, req, op, ContentClass::Config, &db, message_id)
    }

    fn get_common(
        &self,
        session: &Session,
        req: &NodeArena,
        op: NodeId,
        content: ContentClass,
        db: &str,
        message_id: Option<&str>,
    ) -> Result<String> {
        debug!(
            "get_common content={:?} db={} user={}",
            content, db, session.username
        );

        // Filter: the namespace context is the one in scope on <filter>.
        let mut xpath: Option<XPath> = None;
        let mut nsc: Option<NamespaceContext> = None;
        if let Some(filter) = req.find_child(op, "filter") {
            if req.find_attr_value(filter, "type") == Some("subtree") {
                let err = RpcError::invalid_value(
                    "filter type subtree is not supported, use type xpath",
                );
                return Ok(serialize::rpc_reply_error(&err, message_id));
            }
            if let Some(select) = req.find_attr_value(filter, "select") {
                let nsc0 = namespaces::for_element(req, filter);
                match xpath::canonicalize(select, Some(&nsc0)) {
                    Ok(xp) => {
                        xpath = Some(xp);
                        nsc = Some(nsc0);
                    }
                    Err(e) => {
                        let err = RpcError::bad_attribute("select", e.to_string());
                        return Ok(serialize::rpc_reply_error(&err, message_id));
                    }
                }
            }
        }

        // Depth extension: -1 is unlimited.
        let depth = match req.find_attr_value(op, "depth") {
            None => -1,
            Some(attr) => match attr.parse::<i32>() {
                Ok(d) => d,
                Err(_) => {
                    let err = RpcError::bad_attribute(
                        "depth",
                        "Unrecognized value of depth attribute",
                    );
                    return Ok(serialize::rpc_reply_error(&err, message_id));
                }
            },
        };

        if let Some(lp) = req.find_child(op, "list-pagination") {
            return self.get_list_pagination(
                session, req, op, lp, content, db, &xpath, &nsc, depth, message_id,
            );
        }

        // Read the configuration snapshot.
        let mut tree = match content {
            ContentClass::Config => {
                match self.datastore.read(db, xpath.as_ref(), nsc.as_ref()) {
                    Ok(tree) => tree,
                    Err(reason) => {
                        let err = RpcError::operation_failed(format!(
                            "Get {} datastore: {}",
                            db, reason
                        ));
                        return Ok(serialize::rpc_reply_error(&err, message_id));
                    }
                }
            }
            ContentClass::All | ContentClass::Nonconfig => {
                if self.options.validate_state_xml {
                    // The whole running tree: state may reference config.
                    match self.datastore.read("running", None, None) {
                        Ok(tree) => tree,
                        Err(reason) => {
                            let err = RpcError::operation_failed(format!(
                                "Get {} datastore: {}",
                                db, reason
                            ));
                            return Ok(serialize::rpc_reply_error(&err, message_id));
                        }
                    }
                } else if content == ContentClass::All {
                    match self.datastore.read(db, xpath.as_ref(), nsc.as_ref()) {
                        Ok(tree) => tree,
                        Err(reason) => {
                            let err = RpcError::operation_failed(format!(
                                "Get {} datastore: {}",
                                db, reason
                            ));
                            return Ok(serialize::rpc_reply_error(&err, message_id));
                        }
                    }
                } else {
                    NodeArena::new(DATASTORE_TOP_SYMBOL)
                }
            }
        };
        let root = tree.root();
        self.registry.bind_tree(&mut tree, root);

        // Merge plugin and system state.
        if content != ContentClass::Config {
            let path = xpath.as_ref().map(|x| x.as_str()).unwrap_or("/");
            if let Err(reason) = state::aggregate_state(
                &self.options,
                &self.registry,
                &self.streams,
                &self.plugins,
                path,
                nsc.as_ref(),
                &mut tree,
            ) {
                let err = RpcError::operation_failed(reason);
                return Ok(serialize::rpc_reply_error(&err, message_id));
            }
            self.registry.bind_tree(&mut tree, root);
        }

        // Defaults precede selection so the XPath sees the full tree.
        defaults::apply_defaults(&mut tree, root, &self.registry);

        if let Some(reply) =
            self.apply_with_defaults_param(req, op, &mut tree, root, message_id)
        {
            return Ok(reply);
        }

        if content != ContentClass::Config && self.options.validate_state_xml {
            if let Err(e) = self.registry.validate_tree(&mut tree, root) {
                let err =
                    RpcError::internal(format!("state callback returned invalid XML: {}", e));
                return Ok(serialize::rpc_reply_error(&err, message_id));
            }
        }

        // State-only: drop everything that is config.
        if content == ContentClass::Nonconfig {
            filter::mark_nonconfig(&mut tree, root, &self.registry);
            filter::prune_unmarked(&mut tree, root);
            filter::reset_flags(&mut tree, root, NodeFlags::MARK);
        }

        let selected = match &xpath {
            Some(xp) => match xp.select(&tree, root, nsc.as_ref()) {
                Ok(v) => v,
                Err(e) => {
                    let err = RpcError::operation_failed(e.to_string());
                    return Ok(serialize::rpc_reply_error(&err, message_id));
                }
            },
            None => vec![root],
        };

        self.finish_reply(session, tree, selected, depth, message_id)
    }

    /// Specialised get for list pagination
    #[allow(clippy::too_many_arguments)]
    fn get_list_pagination(
        &self,
        session: &Session,
        req: &NodeArena,
        op: NodeId,
        lp: NodeId,
        content: ContentClass,
        db: &str,
        xpath: &Option<XPath>,
        nsc: &Option<NamespaceContext>,
        depth: i32,
        message_id: Option<&str>,
    ) -> Result<String> {
        let Some(xpath) = xpath.as_ref() else {
            let err = RpcError::invalid_value(
                "list-pagination requires an XPath filter naming a list or leaf-list",
            );
            return Ok(serialize::rpc_reply_error(&err, message_id));
        };
        let target = match pagination::resolve_target(&self.registry, Some(xpath)) {
            Ok(t) => t,
            Err(e) => return Ok(serialize::rpc_reply_error(&e, message_id)),
        };
        if target.config && content == ContentClass::Nonconfig {
            let err = RpcError::invalid_value(
                "list-pagination targets a config list but content request is nonconfig",
            );
            return Ok(serialize::rpc_reply_error(&err, message_id));
        }
        if !target.config && content == ContentClass::Config {
            let err = RpcError::invalid_value(
                "list-pagination targets a state list but content request is config",
            );
            return Ok(serialize::rpc_reply_error(&err, message_id));
        }
        let window = match pagination::parse_window(req, lp) {
            Ok(w) => w,
            Err(e) => return Ok(serialize::rpc_reply_error(&e, message_id)),
        };

        let mut tree;
        if target.config {
            tree = match self.datastore.read(db, Some(xpath), nsc.as_ref()) {
                Ok(tree) => tree,
                Err(reason) => {
                    let err = RpcError::operation_failed(format!(
                        "Get {} datastore: {}",
                        db, reason
                    ));
                    return Ok(serialize::rpc_reply_error(&err, message_id));
                }
            };
        } else {
            tree = NodeArena::new(DATASTORE_TOP_SYMBOL);
            let locked = self.datastore.lock_owner("running") == Some(session.id);
            if let Err(reason) =
                self.plugins
                    .pagination_call(xpath.as_str(), locked, &window, &mut tree)
            {
                let err = RpcError::operation_failed(format!(
                    "Internal error, pagination state callback invalid return: {}",
                    reason
                ));
                return Ok(serialize::rpc_reply_error(&err, message_id));
            }
            // The callback's tree must still be expressible in the schema.
            let root = tree.root();
            let unbound = self.registry.bind_tree(&mut tree, root);
            if !unbound.is_empty() {
                let err =
                    RpcError::internal("state callback returned invalid XML".to_string());
                return Ok(serialize::rpc_reply_error(&err, message_id));
            }
        }
        let root = tree.root();
        self.registry.bind_tree(&mut tree, root);

        if let Some(reply) =
            self.apply_with_defaults_param(req, op, &mut tree, root, message_id)
        {
            return Ok(reply);
        }

        let selected = match xpath.select(&tree, root, nsc.as_ref()) {
            Ok(v) => v,
            Err(e) => {
                let err = RpcError::operation_failed(e.to_string());
                return Ok(serialize::rpc_reply_error(&err, message_id));
            }
        };
        // Config lists window here, after selection; state callbacks have
        // already produced the window.
        let selected = if target.config {
            window.apply(selected)
        } else {
            selected
        };

        self.finish_reply(session, tree, selected, depth, message_id)
    }

    /// Apply the `<with-defaults>` parameter; `Some` is an early error reply
    ///
    /// Without the parameter the advertised basic mode applies: `explicit`
    /// (the defaults capability is announced with `basic-mode=explicit`).
    fn apply_with_defaults_param(
        &self,
        req: &NodeArena,
        op: NodeId,
        tree: &mut NodeArena,
        root: NodeId,
        message_id: Option<&str>,
    ) -> Option<String> {
        let Some(wd) = req.find_child(op, "with-defaults") else {
            defaults::apply_with_defaults(tree, root, &self.registry, WithDefaultsMode::Explicit);
            return None;
        };
        let body = req.body(wd).unwrap_or("");
        match body.parse::<WithDefaultsMode>() {
            Ok(mode) => {
                defaults::apply_with_defaults(tree, root, &self.registry, mode);
                None
            }
            Err(_) => {
                let err = RpcError::invalid_value(format!(
                    "Unrecognized value of with-defaults: {}",
                    body
                ));
                Some(serialize::rpc_reply_error(&err, message_id))
            }
        }
    }

    /// Prune to the selection, gate through NACM and serialise the reply
    fn finish_reply(
        &self,
        session: &Session,
        mut tree: NodeArena,
        selected: Vec<NodeId>,
        depth: i32,
        message_id: Option<&str>,
    ) -> Result<String> {
        let root = tree.root();
        filter::mark(&mut tree, &selected);
        filter::prune_unmarked(&mut tree, root);
        filter::reset_flags(&mut tree, root, NodeFlags::MARK);

        if let Some(nacm) = &self.nacm {
            nacm.datanode_read(&mut tree, root, &selected, &session.username);
        }

        tree.set_name(root, "data");
        serialize::rpc_reply_data(&tree, root, depth, message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::MemDatastore;
    use crate::schema::YangKeyword;

    fn handler(config: &str) -> QueryHandler {
        let mut reg = SchemaRegistry::new();
        reg.add_module("example", "u", "ex").unwrap();
        let top = reg
            .add_node("example", None, YangKeyword::Container, "top", true)
            .unwrap();
        reg.add_node("example", Some(top), YangKeyword::LeafList, "a", true)
            .unwrap();
        let mut ds = MemDatastore::new();
        ds.load("running", config).unwrap();
        QueryHandler::new(reg, Box::new(ds))
    }

    fn session() -> Session {
        Session::new(1, "admin")
    }

    #[test]
    fn test_get_config_whole_tree() {
        let h = handler("<top xmlns=\"u\"><a>1</a><a>2</a></top>");
        let reply = h
            .dispatch(
                &session(),
                "<rpc xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
                 <get-config><source><running/></source></get-config></rpc>",
            )
            .unwrap();
        assert_eq!(
            reply,
            "<rpc-reply xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
             <data><top xmlns=\"u\"><a>1</a><a>2</a></top></data></rpc-reply>"
        );
    }

    #[test]
    fn test_message_id_is_echoed() {
        let h = handler("<top xmlns=\"u\"><a>1</a></top>");
        let reply = h
            .dispatch(
                &session(),
                "<rpc message-id=\"101\" xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
                 <get-config><source><running/></source></get-config></rpc>",
            )
            .unwrap();
        assert!(reply.starts_with("<rpc-reply message-id=\"101\""));
    }

    #[test]
    fn test_bad_select_reports_bad_attribute() {
        let h = handler("<top xmlns=\"u\"><a>1</a></top>");
        let reply = h
            .dispatch(
                &session(),
                "<rpc xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><get-config>\
                 <source><running/></source>\
                 <filter type=\"xpath\" select=\"/t:top[\"/>\
                 </get-config></rpc>",
            )
            .unwrap();
        assert!(reply.contains("<error-tag>bad-attribute</error-tag>"));
        assert!(reply.contains("<bad-element>select</bad-element>"));
    }

    #[test]
    fn test_unknown_operation() {
        let h = handler("<top xmlns=\"u\"/>");
        let reply = h
            .dispatch(
                &session(),
                "<rpc xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
                 <kill-session/></rpc>",
            )
            .unwrap();
        assert!(reply.contains("<error-tag>operation-not-supported</error-tag>"));
    }

    #[test]
    fn test_missing_source_database() {
        let h = handler("<top xmlns=\"u\"/>");
        let reply = h
            .dispatch(
                &session(),
                "<rpc xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
                 <get-config/></rpc>",
            )
            .unwrap();
        assert!(reply.contains("<error-tag>operation-failed</error-tag>"));
    }

    #[test]
    fn test_unknown_datastore() {
        let h = handler("<top xmlns=\"u\"/>");
        let reply = h
            .dispatch(
                &session(),
                "<rpc xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
                 <get-config><source><candidate/></source></get-config></rpc>",
            )
            .unwrap();
        assert!(reply.contains("<error-tag>operation-failed</error-tag>"));
        assert!(reply.contains("No such database"));
    }
}
