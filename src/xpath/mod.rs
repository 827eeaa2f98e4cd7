//! XPath 1.0 support
//!
//! The query pipeline selects data with XPath 1.0 (W3C REC-xpath-19991116):
//! a filter's `select` expression is parsed once into a syntax tree and then
//! evaluated over the merged data tree with the namespace context in scope
//! on the `<filter>` element (RFC 6241 section 8.9.1).
//!
//! - [`ast`]: the parsed expression tree
//! - [`parser`]: tokenizer and recursive-descent parser
//! - [`context`]: evaluation contexts and type coercions
//! - [`eval`]: the recursive interpreter

pub mod ast;
pub mod context;
pub mod eval;
pub mod parser;

pub use ast::{ArithmeticOp, Axis, Expr, LocationPath, NodeTest, RelationalOp, Step};
pub use context::{EvalContext, EvalResult};
pub use eval::{eval, select};

use crate::error::{Error, Result};
use crate::namespaces::NamespaceContext;
use crate::tree::{NodeArena, NodeId};

/// A parsed XPath expression together with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    expr: Expr,
    source: String,
}

impl XPath {
    /// Parse an expression
    pub fn parse(source: &str) -> Result<Self> {
        let expr = parser::parse(source)?;
        Ok(Self {
            expr,
            source: source.to_string(),
        })
    }

    /// The source text as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The parsed expression
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate from `root` and return the selected node-set
    pub fn select(
        &self,
        arena: &NodeArena,
        root: NodeId,
        nsc: Option<&NamespaceContext>,
    ) -> Result<Vec<NodeId>> {
        eval::select(arena, root, &self.expr, nsc)
    }

    /// The plain step names of a simple absolute path, predicates ignored
    pub fn plain_steps(&self) -> Option<Vec<(Option<&str>, &str)>> {
        self.expr.plain_steps()
    }
}

/// Canonicalise a `select` expression against a namespace context
///
/// Parses the expression and verifies that every prefix it uses resolves in
/// the namespace context in scope on the element that carried it. Both
/// failures surface as the same category: the handler maps them to a
/// `bad-attribute` error naming `select`.
pub fn canonicalize(select: &str, nsc: Option<&NamespaceContext>) -> Result<XPath> {
    let xpath = XPath::parse(select)?;
    let mut prefixes = Vec::new();
    xpath.expr.collect_prefixes(&mut prefixes);
    for prefix in prefixes {
        let resolved = nsc.and_then(|n| n.lookup(Some(prefix)));
        if resolved.is_none() {
            return Err(Error::Xpath(format!(
                "prefix {} of select expression not bound to a namespace",
                prefix
            )));
        }
    }
    Ok(xpath)
}
