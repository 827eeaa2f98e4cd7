//! XPath 1.0 syntax tree
//!
//! The parser encodes operator precedence in tree shape, so the evaluator
//! only dispatches on node kind. Axis and operator coverage follows the
//! XPath 1.0 grammar; axes the query pipeline does not traverse still parse
//! (and evaluate to the empty node-set).

/// Traversal axis of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `ancestor::`
    Ancestor,
    /// `ancestor-or-self::`
    AncestorOrSelf,
    /// `attribute::` / `@`
    Attribute,
    /// `child::` (the default axis)
    Child,
    /// `descendant::`
    Descendant,
    /// `descendant-or-self::`
    DescendantOrSelf,
    /// `following::`
    Following,
    /// `following-sibling::`
    FollowingSibling,
    /// `namespace::`
    Namespace,
    /// `parent::` / `..`
    Parent,
    /// `preceding::`
    Preceding,
    /// `preceding-sibling::`
    PrecedingSibling,
    /// `self::` / `.`
    SelfAxis,
}

impl Axis {
    /// Parse an axis name as written before `::`
    pub fn from_name(name: &str) -> Option<Axis> {
        Some(match name {
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "attribute" => Axis::Attribute,
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "following" => Axis::Following,
            "following-sibling" => Axis::FollowingSibling,
            "namespace" => Axis::Namespace,
            "parent" => Axis::Parent,
            "preceding" => Axis::Preceding,
            "preceding-sibling" => Axis::PrecedingSibling,
            "self" => Axis::SelfAxis,
            _ => return None,
        })
    }
}

/// Relational operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationalOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `div`
    Div,
    /// `mod`
    Mod,
}

/// The node test of a step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// A QName test, `prefix:local` or `local` or `*`
    Name {
        /// Namespace prefix as written, if any
        prefix: Option<String>,
        /// Local name; `*` matches any element
        local: String,
    },
    /// `node()`, matching any element
    AnyNode,
    /// `text()`, matching any text node
    Text,
    /// `current()` at the head of a path, which resets the node-set to
    /// the initial context node
    Current,
}

/// One step of a location path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Traversal axis
    pub axis: Axis,
    /// True when the step was preceded by `//`
    pub double_slash: bool,
    /// Node test
    pub test: NodeTest,
    /// Predicate chain, applied in order
    pub predicates: Vec<Expr>,
}

/// A location path
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// True for paths anchored at the document root
    pub absolute: bool,
    /// Steps in order; empty for the bare `/`
    pub steps: Vec<Step>,
}

/// An XPath expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `a or b`
    Or(Box<Expr>, Box<Expr>),
    /// `a and b`
    And(Box<Expr>, Box<Expr>),
    /// `a = b`, `a != b`, `a < b`, ...
    Relational(RelationalOp, Box<Expr>, Box<Expr>),
    /// `a + b`, `a * b`, `a div b`, ...
    Arithmetic(ArithmeticOp, Box<Expr>, Box<Expr>),
    /// `a | b`
    Union(Box<Expr>, Box<Expr>),
    /// A location path
    Path(LocationPath),
    /// A quoted string literal
    Literal(String),
    /// A numeric literal
    Number(f64),
    /// A function call
    Call(String, Vec<Expr>),
}

impl Expr {
    /// Collect every namespace prefix used by a node test in the expression
    pub fn collect_prefixes<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Or(a, b)
            | Expr::And(a, b)
            | Expr::Relational(_, a, b)
            | Expr::Arithmetic(_, a, b)
            | Expr::Union(a, b) => {
                a.collect_prefixes(out);
                b.collect_prefixes(out);
            }
            Expr::Path(lp) => {
                for step in &lp.steps {
                    if let NodeTest::Name {
                        prefix: Some(p), ..
                    } = &step.test
                    {
                        if !out.contains(&p.as_str()) {
                            out.push(p);
                        }
                    }
                    for pred in &step.predicates {
                        pred.collect_prefixes(out);
                    }
                }
            }
            Expr::Call(_, args) => {
                for arg in args {
                    arg.collect_prefixes(out);
                }
            }
            Expr::Literal(_) | Expr::Number(_) => {}
        }
    }

    /// The plain step names of a simple location path
    ///
    /// Returns `Some` when the expression is a single absolute path whose
    /// steps all use the child axis with QName tests (predicates ignored);
    /// this is the shape the pagination planner resolves against the schema.
    pub fn plain_steps(&self) -> Option<Vec<(Option<&str>, &str)>> {
        let Expr::Path(lp) = self else {
            return None;
        };
        if !lp.absolute {
            return None;
        }
        let mut out = Vec::with_capacity(lp.steps.len());
        for step in &lp.steps {
            if step.axis != Axis::Child {
                return None;
            }
            match &step.test {
                NodeTest::Name { prefix, local } if local != "*" => {
                    out.push((prefix.as_deref(), local.as_str()));
                }
                _ => return None,
            }
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_names() {
        assert_eq!(Axis::from_name("child"), Some(Axis::Child));
        assert_eq!(
            Axis::from_name("descendant-or-self"),
            Some(Axis::DescendantOrSelf)
        );
        assert_eq!(Axis::from_name("sibling"), None);
    }

    #[test]
    fn test_collect_prefixes() {
        let expr = Expr::Path(LocationPath {
            absolute: true,
            steps: vec![
                Step {
                    axis: Axis::Child,
                    double_slash: false,
                    test: NodeTest::Name {
                        prefix: Some("t".into()),
                        local: "top".into(),
                    },
                    predicates: vec![],
                },
                Step {
                    axis: Axis::Child,
                    double_slash: false,
                    test: NodeTest::Name {
                        prefix: Some("u".into()),
                        local: "a".into(),
                    },
                    predicates: vec![],
                },
            ],
        });
        let mut prefixes = Vec::new();
        expr.collect_prefixes(&mut prefixes);
        assert_eq!(prefixes, vec!["t", "u"]);
    }

    #[test]
    fn test_plain_steps() {
        let expr = Expr::Path(LocationPath {
            absolute: true,
            steps: vec![Step {
                axis: Axis::Child,
                double_slash: false,
                test: NodeTest::Name {
                    prefix: None,
                    local: "top".into(),
                },
                predicates: vec![],
            }],
        });
        assert_eq!(expr.plain_steps(), Some(vec![(None, "top")]));

        let rel = Expr::Path(LocationPath {
            absolute: false,
            steps: vec![],
        });
        assert_eq!(rel.plain_steps(), None);
    }
}
