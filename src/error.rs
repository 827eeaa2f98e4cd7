//! Error types for netconfd
//!
//! Two layers of errors exist. [`Error`] is the crate-internal error used by
//! `Result` returns throughout the library; it covers conditions that abort a
//! request (corrupted trees, I/O failures, broken plugins). [`RpcError`] is a
//! protocol-level error value that maps one-to-one onto the NETCONF
//! `<rpc-error>` element (RFC 6241 section 4.3); the query handler translates
//! recoverable failures into an `RpcError` and writes it into the reply
//! envelope while keeping the session up.

use std::fmt;
use thiserror::Error;

/// Result type alias using the netconfd Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for netconfd operations
#[derive(Error, Debug)]
pub enum Error {
    /// XML parsing or tree manipulation error
    #[error("XML error: {0}")]
    Xml(String),

    /// XPath parsing or evaluation error
    #[error("XPath error: {0}")]
    Xpath(String),

    /// Schema registry error (unknown module, unbindable node)
    #[error("schema error: {0}")]
    Schema(String),

    /// Datastore read error
    #[error("datastore error: {0}")]
    Datastore(String),

    /// Plugin state callback error
    #[error("plugin error: {0}")]
    Plugin(String),

    /// Engine options error
    #[error("options error: {0}")]
    Options(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

/// The `error-type` element of an `<rpc-error>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Layering: secure transport
    Transport,
    /// Layering: messages
    Rpc,
    /// Layering: operations
    Protocol,
    /// Layering: content
    Application,
}

impl ErrorType {
    /// Protocol name of the error type
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Transport => "transport",
            ErrorType::Rpc => "rpc",
            ErrorType::Protocol => "protocol",
            ErrorType::Application => "application",
        }
    }
}

/// The `error-tag` element of an `<rpc-error>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTag {
    /// An attribute value is not correct
    BadAttribute,
    /// A parameter value is not correct
    InvalidValue,
    /// The request could not be completed
    OperationFailed,
    /// The request is not supported by this implementation
    OperationNotSupported,
    /// Access to the requested resource is denied
    AccessDenied,
}

impl ErrorTag {
    /// Protocol name of the error tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorTag::BadAttribute => "bad-attribute",
            ErrorTag::InvalidValue => "invalid-value",
            ErrorTag::OperationFailed => "operation-failed",
            ErrorTag::OperationNotSupported => "operation-not-supported",
            ErrorTag::AccessDenied => "access-denied",
        }
    }
}

/// A protocol error destined for an `<rpc-error>` reply element
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    /// Error type (layering)
    pub error_type: ErrorType,
    /// Error tag (category)
    pub tag: ErrorTag,
    /// Offending element name, rendered inside `<error-info><bad-element>`
    pub bad_element: Option<String>,
    /// Human-readable error message
    pub message: String,
}

impl RpcError {
    /// Create an error with the given type and tag
    pub fn new(error_type: ErrorType, tag: ErrorTag, message: impl Into<String>) -> Self {
        Self {
            error_type,
            tag,
            bad_element: None,
            message: message.into(),
        }
    }

    /// A `bad-attribute` error naming the offending element
    pub fn bad_attribute(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Application,
            tag: ErrorTag::BadAttribute,
            bad_element: Some(element.into()),
            message: message.into(),
        }
    }

    /// An `invalid-value` error
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Application, ErrorTag::InvalidValue, message)
    }

    /// An `operation-failed` error
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Application, ErrorTag::OperationFailed, message)
    }

    /// An internal-error reply, surfaced as `operation-failed`
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            ErrorType::Application,
            ErrorTag::OperationFailed,
            format!("Internal error: {}", message.into()),
        )
    }

    /// Set the bad element name
    pub fn with_bad_element(mut self, element: impl Into<String>) -> Self {
        self.bad_element = Some(element.into());
        self
    }

    /// Render as an `<rpc-error>` element
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<rpc-error>");
        out.push_str(&format!("<error-type>{}</error-type>", self.error_type.as_str()));
        out.push_str(&format!("<error-tag>{}</error-tag>", self.tag.as_str()));
        if let Some(ref el) = self.bad_element {
            out.push_str(&format!(
                "<error-info><bad-element>{}</bad-element></error-info>",
                crate::serialize::escape_text(el)
            ));
        }
        out.push_str("<error-severity>error</error-severity>");
        out.push_str(&format!(
            "<error-message>{}</error-message>",
            crate::serialize::escape_text(&self.message)
        ));
        out.push_str("</rpc-error>");
        out
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tag.as_str(), self.message)?;
        if let Some(ref el) = self.bad_element {
            write!(f, " (bad element: {})", el)?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}
