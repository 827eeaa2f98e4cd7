//! Engine options
//!
//! The handler consults a small set of recognised flags. Options deserialize
//! from a JSON object, so a daemon can ship them in its configuration file.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Recognised engine options; everything defaults to off
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineOptions {
    /// Emit `netconf/streams` event stream discovery (RFC 5277)
    pub stream_discovery_rfc5277: bool,
    /// Emit `restconf-state/streams` and capabilities (RFC 8040)
    pub stream_discovery_rfc8040: bool,
    /// Emit YANG library module state
    pub yang_library: bool,
    /// Validate plugin-supplied state against the schema; state reads load
    /// the whole running tree first
    pub validate_state_xml: bool,
}

impl EngineOptions {
    /// Parse options from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Options(e.to_string()))
    }

    /// Load options from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Options(format!(
                "failed to read options file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_off() {
        let opts = EngineOptions::default();
        assert!(!opts.stream_discovery_rfc5277);
        assert!(!opts.stream_discovery_rfc8040);
        assert!(!opts.yang_library);
        assert!(!opts.validate_state_xml);
    }

    #[test]
    fn test_from_json() {
        let opts = EngineOptions::from_json(
            r#"{"stream-discovery-rfc8040": true, "yang-library": true}"#,
        )
        .unwrap();
        assert!(opts.stream_discovery_rfc8040);
        assert!(opts.yang_library);
        assert!(!opts.stream_discovery_rfc5277);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(EngineOptions::from_json("not json").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"validate-state-xml": true}}"#).unwrap();
        let opts = EngineOptions::from_file(file.path()).unwrap();
        assert!(opts.validate_state_xml);
    }

    #[test]
    fn test_missing_file() {
        assert!(EngineOptions::from_file("/does/not/exist.json").is_err());
    }
}
