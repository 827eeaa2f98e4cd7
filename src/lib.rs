//! # netconfd
//!
//! A NETCONF (RFC 6241) configuration engine core: the query pipeline behind
//! `<get>` and `<get-config>`.
//!
//! The pipeline composes an XPath 1.0 evaluator (W3C REC-xpath-19991116)
//! over an in-memory XML arena with datastore snapshots, plugin state
//! aggregation, RFC 6243 with-defaults processing, RESTCONF monitoring
//! augmentations (RFC 8040), list pagination and NACM read filtering into
//! `<rpc-reply>` envelopes.
//!
//! ## Example
//!
//! ```rust
//! use netconfd::datastore::MemDatastore;
//! use netconfd::handler::{QueryHandler, Session};
//! use netconfd::schema::SchemaRegistry;
//!
//! let mut ds = MemDatastore::new();
//! ds.load("running", "<top xmlns=\"u\"><a>1</a></top>").unwrap();
//! let handler = QueryHandler::new(SchemaRegistry::new(), Box::new(ds));
//!
//! let reply = handler
//!     .dispatch(
//!         &Session::new(1, "admin"),
//!         "<rpc xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
//!          <get-config><source><running/></source></get-config></rpc>",
//!     )
//!     .unwrap();
//! assert!(reply.contains("<data><top xmlns=\"u\"><a>1</a></top></data>"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod tree;

// Schema and namespaces
pub mod namespaces;
pub mod schema;

// XPath engine
pub mod xpath;

// Query pipeline
pub mod datastore;
pub mod defaults;
pub mod filter;
pub mod pagination;
pub mod state;

// Request handling
pub mod handler;
pub mod nacm;
pub mod options;
pub mod serialize;

// Re-exports for convenience
pub use error::{Error, Result, RpcError};
pub use handler::{QueryHandler, Session};

/// Version of the netconfd library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
