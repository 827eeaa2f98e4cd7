//! Datastore access
//!
//! The engine reads named configuration databases (`running`, `candidate`,
//! `startup`) through the [`Datastore`] trait: a read returns an independent
//! snapshot tree, optionally pre-filtered to an XPath selection. The real
//! storage layer is out of scope; [`MemDatastore`] is the in-memory
//! implementation used by the CLI and the tests.

use std::collections::HashMap;

use log::debug;

use crate::error::Result;
use crate::filter;
use crate::namespaces::NamespaceContext;
use crate::tree::{NodeArena, NodeFlags};
use crate::xpath::XPath;

/// Name of the top-level element snapshots are rooted at
pub const DATASTORE_TOP_SYMBOL: &str = "config";

/// Read access to named configuration databases
pub trait Datastore {
    /// Read a snapshot of a database, pruned to an XPath selection
    ///
    /// Without an XPath the whole tree is returned. The error string is the
    /// reason reported in the `operation-failed` reply.
    fn read(
        &self,
        db: &str,
        xpath: Option<&XPath>,
        nsc: Option<&NamespaceContext>,
    ) -> std::result::Result<NodeArena, String>;

    /// Session id currently holding the lock on a database, if any
    fn lock_owner(&self, db: &str) -> Option<u32>;
}

/// In-memory datastore keyed by database name
#[derive(Debug, Default)]
pub struct MemDatastore {
    dbs: HashMap<String, NodeArena>,
    locks: HashMap<String, u32>,
}

impl MemDatastore {
    /// Create an empty datastore
    pub fn new() -> Self {
        Self::default()
    }

    /// Load database content from an XML fragment
    ///
    /// The fragment holds the top-level data elements; it is wrapped in the
    /// datastore top symbol.
    pub fn load(&mut self, db: impl Into<String>, xml: &str) -> Result<()> {
        let wrapped = format!("<{}>{}</{}>", DATASTORE_TOP_SYMBOL, xml, DATASTORE_TOP_SYMBOL);
        let arena = NodeArena::parse(&wrapped)?;
        self.dbs.insert(db.into(), arena);
        Ok(())
    }

    /// Lock a database for a session
    pub fn lock(&mut self, db: impl Into<String>, session: u32) {
        self.locks.insert(db.into(), session);
    }

    /// Release a database lock
    pub fn unlock(&mut self, db: &str) {
        self.locks.remove(db);
    }
}

impl Datastore for MemDatastore {
    fn read(
        &self,
        db: &str,
        xpath: Option<&XPath>,
        nsc: Option<&NamespaceContext>,
    ) -> std::result::Result<NodeArena, String> {
        let Some(stored) = self.dbs.get(db) else {
            return Err(format!("No such database: {}", db));
        };
        let mut snapshot = stored.clone();
        let root = snapshot.root();
        if let Some(xpath) = xpath {
            let selected = xpath
                .select(&snapshot, root, nsc)
                .map_err(|e| format!("XPath select on {} datastore: {}", db, e))?;
            debug!("datastore {} read: {} selected", db, selected.len());
            filter::mark(&mut snapshot, &selected);
            filter::prune_unmarked(&mut snapshot, root);
            filter::reset_flags(&mut snapshot, root, NodeFlags::MARK);
        }
        Ok(snapshot)
    }

    fn lock_owner(&self, db: &str) -> Option<u32> {
        self.locks.get(db).copied()
    }
}
