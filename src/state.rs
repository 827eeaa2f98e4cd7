//! State data aggregation
//!
//! Operational (non-config) data comes from three places: the monitoring
//! augmentations the engine emits itself (event stream discovery per
//! RFC 5277 and RFC 8040, RESTCONF capabilities, YANG library module state),
//! and the registered [`StateProvider`] plugins. All of them merge into the
//! snapshot tree before with-defaults processing and XPath selection.

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, warn};
use once_cell::sync::Lazy;

use crate::namespaces::{
    NamespaceContext, NOTIFICATION_NAMESPACE, RESTCONF_MONITORING_NAMESPACE,
    YANG_LIBRARY_NAMESPACE,
};
use crate::options::EngineOptions;
use crate::pagination::Window;
use crate::schema::SchemaRegistry;
use crate::tree::{NodeArena, NodeId};

/// RESTCONF protocol capabilities advertised under
/// `restconf-state/capabilities` (RFC 8040 section 9.1)
static RESTCONF_CAPABILITIES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "urn:ietf:params:restconf:capability:defaults:1.0?basic-mode=explicit",
        "urn:ietf:params:restconf:capability:depth:1.0",
    ]
});

/// An event stream available for subscription
#[derive(Debug, Clone)]
pub struct EventStream {
    /// Stream name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// True when the stream supports replay
    pub replay_support: bool,
    /// Creation time of the replay log, when replay is supported
    pub replay_log_creation_time: Option<DateTime<Utc>>,
}

impl EventStream {
    /// Create a stream without replay support
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            replay_support: false,
            replay_log_creation_time: None,
        }
    }

    /// Enable replay with the given log creation time
    pub fn with_replay(mut self, created: DateTime<Utc>) -> Self {
        self.replay_support = true;
        self.replay_log_creation_time = Some(created);
        self
    }
}

/// Registry of event streams for discovery
#[derive(Debug, Clone, Default)]
pub struct EventStreamRegistry {
    streams: Vec<EventStream>,
}

impl EventStreamRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream
    pub fn register(&mut self, stream: EventStream) {
        self.streams.push(stream);
    }

    /// Iterate registered streams in registration order
    pub fn iter(&self) -> impl Iterator<Item = &EventStream> {
        self.streams.iter()
    }

    /// True when no stream is registered
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

/// A plugin supplying operational state
pub trait StateProvider {
    /// Merge state data into the tree under its root
    ///
    /// `xpath` is the request selection; providers may use it to filter
    /// early but are not required to. The error string becomes the reason
    /// of the `operation-failed` reply.
    fn state_data(
        &self,
        xpath: &str,
        nsc: Option<&NamespaceContext>,
        arena: &mut NodeArena,
    ) -> std::result::Result<(), String>;

    /// Produce one window of a paginated state list under the tree root
    ///
    /// `locked` tells the provider whether the requesting session holds the
    /// running lock. Returns `Ok(false)` when this provider does not handle
    /// the path.
    fn pagination_state(
        &self,
        xpath: &str,
        locked: bool,
        window: &Window,
        arena: &mut NodeArena,
    ) -> std::result::Result<bool, String> {
        let _ = (xpath, locked, window, arena);
        Ok(false)
    }
}

/// The set of registered state plugins
#[derive(Default)]
pub struct PluginHost {
    providers: Vec<Box<dyn StateProvider>>,
}

impl PluginHost {
    /// Create an empty host
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider
    pub fn register(&mut self, provider: Box<dyn StateProvider>) {
        self.providers.push(provider);
    }

    /// Call every provider's state callback in registration order
    pub fn statedata_all(
        &self,
        xpath: &str,
        nsc: Option<&NamespaceContext>,
        arena: &mut NodeArena,
    ) -> std::result::Result<(), String> {
        for provider in &self.providers {
            provider.state_data(xpath, nsc, arena)?;
        }
        Ok(())
    }

    /// Dispatch a pagination request to the first provider that handles it
    pub fn pagination_call(
        &self,
        xpath: &str,
        locked: bool,
        window: &Window,
        arena: &mut NodeArena,
    ) -> std::result::Result<bool, String> {
        for provider in &self.providers {
            if provider.pagination_state(xpath, locked, window, arena)? {
                return Ok(true);
            }
        }
        warn!("no pagination state callback registered for {}", xpath);
        Ok(false)
    }
}

fn emit_streams(
    arena: &mut NodeArena,
    parent: NodeId,
    registry: &EventStreamRegistry,
    restconf: bool,
) {
    let streams = arena.new_element(parent, "streams", None);
    for stream in registry.iter() {
        let el = arena.new_element(streams, "stream", None);
        let name = arena.new_element(el, "name", None);
        arena.set_body(name, stream.name.clone());
        let desc = arena.new_element(el, "description", None);
        arena.set_body(desc, stream.description.clone());
        // RFC 8040 and RFC 5277 spell the replay leaves differently.
        let (support_leaf, created_leaf) = if restconf {
            ("replay-support", "replay-log-creation-time")
        } else {
            ("replaySupport", "replayLogCreationTime")
        };
        let replay = arena.new_element(el, support_leaf, None);
        arena.set_body(replay, stream.replay_support.to_string());
        if let Some(created) = stream.replay_log_creation_time {
            let t = arena.new_element(el, created_leaf, None);
            arena.set_body(t, created.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
    }
}

/// Emit `netconf/streams` discovery data (RFC 5277)
pub fn emit_rfc5277_streams(
    arena: &mut NodeArena,
    root: NodeId,
    registry: &EventStreamRegistry,
) {
    let netconf = arena.new_element(root, "netconf", None);
    arena.declare_namespace(netconf, None, NOTIFICATION_NAMESPACE);
    emit_streams(arena, netconf, registry, false);
}

/// Emit `restconf-state/streams` and capabilities (RFC 8040)
pub fn emit_rfc8040_state(
    arena: &mut NodeArena,
    root: NodeId,
    registry: &EventStreamRegistry,
) {
    let rstate = arena.new_element(root, "restconf-state", None);
    arena.declare_namespace(rstate, None, RESTCONF_MONITORING_NAMESPACE);
    emit_streams(arena, rstate, registry, true);
    let caps = arena.new_element(rstate, "capabilities", None);
    for cap in RESTCONF_CAPABILITIES.iter() {
        let el = arena.new_element(caps, "capability", None);
        arena.set_body(el, *cap);
    }
}

/// Emit YANG library module state for the loaded registry
pub fn emit_yang_library(arena: &mut NodeArena, root: NodeId, registry: &SchemaRegistry) {
    let state = arena.new_element(root, "modules-state", None);
    arena.declare_namespace(state, None, YANG_LIBRARY_NAMESPACE);
    for module in registry.modules() {
        let el = arena.new_element(state, "module", None);
        let name = arena.new_element(el, "name", None);
        arena.set_body(name, module.name.clone());
        let ns = arena.new_element(el, "namespace", None);
        arena.set_body(ns, module.namespace.clone());
        let rev = arena.new_element(el, "revision", None);
        arena.set_body(rev, module.revision.clone().unwrap_or_default());
    }
}

/// Aggregate all system and plugin state into the tree
///
/// Emission order follows the recognised options: RFC 5277 stream
/// discovery, RFC 8040 monitoring, YANG library, then plugin callbacks.
pub fn aggregate_state(
    options: &EngineOptions,
    registry: &SchemaRegistry,
    streams: &EventStreamRegistry,
    plugins: &PluginHost,
    xpath: &str,
    nsc: Option<&NamespaceContext>,
    arena: &mut NodeArena,
) -> std::result::Result<(), String> {
    let root = arena.root();
    if options.stream_discovery_rfc5277 {
        emit_rfc5277_streams(arena, root, streams);
    }
    if options.stream_discovery_rfc8040 {
        emit_rfc8040_state(arena, root, streams);
    }
    if options.yang_library {
        emit_yang_library(arena, root, registry);
    }
    debug!("state aggregation for {}", xpath);
    plugins.statedata_all(xpath, nsc, arena)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct CounterProvider;

    impl StateProvider for CounterProvider {
        fn state_data(
            &self,
            _xpath: &str,
            _nsc: Option<&NamespaceContext>,
            arena: &mut NodeArena,
        ) -> std::result::Result<(), String> {
            let root = arena.root();
            let counters = arena.new_element(root, "counters", None);
            let up = arena.new_element(counters, "uptime", None);
            arena.set_body(up, "120");
            Ok(())
        }
    }

    struct BrokenProvider;

    impl StateProvider for BrokenProvider {
        fn state_data(
            &self,
            _xpath: &str,
            _nsc: Option<&NamespaceContext>,
            _arena: &mut NodeArena,
        ) -> std::result::Result<(), String> {
            Err("backend unavailable".to_string())
        }
    }

    fn streams() -> EventStreamRegistry {
        let mut reg = EventStreamRegistry::new();
        reg.register(
            EventStream::new("NETCONF", "default NETCONF event stream")
                .with_replay(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        );
        reg
    }

    #[test]
    fn test_emit_rfc5277_streams() {
        let mut arena = NodeArena::new("config");
        let root = arena.root();
        emit_rfc5277_streams(&mut arena, root, &streams());

        let netconf = arena.find_child(root, "netconf").unwrap();
        let streams_el = arena.find_child(netconf, "streams").unwrap();
        let stream = arena.find_child(streams_el, "stream").unwrap();
        assert_eq!(
            arena.body(arena.find_child(stream, "name").unwrap()),
            Some("NETCONF")
        );
        assert_eq!(
            arena.body(arena.find_child(stream, "replayLogCreationTime").unwrap()),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_emit_rfc8040_state_capabilities() {
        let mut arena = NodeArena::new("config");
        let root = arena.root();
        emit_rfc8040_state(&mut arena, root, &streams());

        let rstate = arena.find_child(root, "restconf-state").unwrap();
        let caps = arena.find_child(rstate, "capabilities").unwrap();
        let bodies: Vec<&str> = arena
            .element_children(caps)
            .into_iter()
            .filter_map(|c| arena.body(c))
            .collect();
        assert!(bodies
            .iter()
            .any(|c| c.contains("capability:defaults:1.0?basic-mode=explicit")));
        assert!(bodies.iter().any(|c| c.contains("capability:depth:1.0")));
    }

    #[test]
    fn test_emit_yang_library() {
        let mut schema = SchemaRegistry::new();
        schema.add_module("example", "urn:example", "ex").unwrap();
        schema.set_revision("example", "2024-06-01").unwrap();

        let mut arena = NodeArena::new("config");
        let root = arena.root();
        emit_yang_library(&mut arena, root, &schema);

        let state = arena.find_child(root, "modules-state").unwrap();
        let module = arena.find_child(state, "module").unwrap();
        assert_eq!(
            arena.body(arena.find_child(module, "name").unwrap()),
            Some("example")
        );
        assert_eq!(
            arena.body(arena.find_child(module, "revision").unwrap()),
            Some("2024-06-01")
        );
    }

    #[test]
    fn test_plugin_aggregation() {
        let mut plugins = PluginHost::new();
        plugins.register(Box::new(CounterProvider));
        let mut arena = NodeArena::new("config");
        plugins.statedata_all("/", None, &mut arena).unwrap();
        let counters = arena.find_child(arena.root(), "counters").unwrap();
        assert_eq!(
            arena.body(arena.find_child(counters, "uptime").unwrap()),
            Some("120")
        );
    }

    #[test]
    fn test_plugin_failure_propagates() {
        let mut plugins = PluginHost::new();
        plugins.register(Box::new(CounterProvider));
        plugins.register(Box::new(BrokenProvider));
        let mut arena = NodeArena::new("config");
        let err = plugins.statedata_all("/", None, &mut arena).unwrap_err();
        assert_eq!(err, "backend unavailable");
    }

    #[test]
    fn test_aggregate_state_respects_options() {
        let mut arena = NodeArena::new("config");
        let options = EngineOptions {
            stream_discovery_rfc8040: true,
            ..Default::default()
        };
        aggregate_state(
            &options,
            &SchemaRegistry::new(),
            &streams(),
            &PluginHost::new(),
            "/",
            None,
            &mut arena,
        )
        .unwrap();
        let root = arena.root();
        assert!(arena.find_child(root, "restconf-state").is_some());
        assert!(arena.find_child(root, "netconf").is_none());
        assert!(arena.find_child(root, "modules-state").is_none());
    }
}
