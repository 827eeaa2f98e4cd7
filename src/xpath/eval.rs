//! XPath 1.0 evaluator
//!
//! A single recursive interpreter dispatching on the expression kind.
//! Namespace handling follows NETCONF usage (RFC 6241 section 8.9.1): when a
//! namespace context is supplied, node tests compare namespace URIs (strict
//! mode); without one they compare raw prefixes (lenient mode), which legacy
//! clients without YANG bindings rely on.
//!
//! The evaluator never performs I/O and never mutates the tree; contexts are
//! values and the result context moves to the caller.

use log::trace;

use crate::error::{Error, Result};
use crate::namespaces::{self, NamespaceContext};
use crate::tree::{NodeArena, NodeId, NodeKind};
use crate::xpath::ast::{ArithmeticOp, Axis, Expr, LocationPath, NodeTest, RelationalOp, Step};
use crate::xpath::context::{parse_number, EvalContext, EvalResult};

/// Evaluate an expression in a context
pub fn eval(
    arena: &NodeArena,
    ctx: &EvalContext,
    expr: &Expr,
    nsc: Option<&NamespaceContext>,
) -> Result<EvalContext> {
    match expr {
        Expr::Or(a, b) => {
            let r1 = eval(arena, ctx, a, nsc)?;
            let r2 = eval(arena, ctx, b, nsc)?;
            Ok(logop(arena, ctx, &r1, &r2, false))
        }
        Expr::And(a, b) => {
            let r1 = eval(arena, ctx, a, nsc)?;
            let r2 = eval(arena, ctx, b, nsc)?;
            Ok(logop(arena, ctx, &r1, &r2, true))
        }
        Expr::Relational(op, a, b) => {
            let r1 = eval(arena, ctx, a, nsc)?;
            let r2 = eval(arena, ctx, b, nsc)?;
            relop(arena, ctx, &r1, &r2, *op)
        }
        Expr::Arithmetic(op, a, b) => {
            let r1 = eval(arena, ctx, a, nsc)?;
            let r2 = eval(arena, ctx, b, nsc)?;
            Ok(numop(arena, ctx, &r1, &r2, *op))
        }
        Expr::Union(a, b) => {
            let r1 = eval(arena, ctx, a, nsc)?;
            let r2 = eval(arena, ctx, b, nsc)?;
            let mut set = r1.node_set().to_vec();
            set.extend_from_slice(r2.node_set());
            let mut out = ctx.clone();
            out.replace_node_set(set);
            Ok(out)
        }
        Expr::Literal(s) => {
            let mut out = ctx.clone();
            out.result = EvalResult::String(s.clone());
            Ok(out)
        }
        Expr::Number(n) => {
            let mut out = ctx.clone();
            out.result = EvalResult::Number(*n);
            Ok(out)
        }
        Expr::Call(name, args) => eval_call(arena, ctx, name, args, nsc),
        Expr::Path(lp) => eval_path(arena, ctx, lp, nsc),
    }
}

/// Evaluate an expression from `root` and return the selected node-set
///
/// Non-node-set results select nothing.
pub fn select(
    arena: &NodeArena,
    root: NodeId,
    expr: &Expr,
    nsc: Option<&NamespaceContext>,
) -> Result<Vec<NodeId>> {
    let ctx = EvalContext::new(root);
    let result = eval(arena, &ctx, expr, nsc)?;
    trace!("xpath select: {} nodes", result.node_set().len());
    Ok(result.node_set().to_vec())
}

fn eval_path(
    arena: &NodeArena,
    ctx: &EvalContext,
    lp: &LocationPath,
    nsc: Option<&NamespaceContext>,
) -> Result<EvalContext> {
    let mut xc = ctx.clone();
    if lp.absolute {
        // Reposition to the root ancestor; the node-set becomes {root}.
        let root = arena.root_of(xc.node);
        xc.node = root;
        xc.replace_node_set(vec![root]);
    }
    for step in &lp.steps {
        xc = eval_step(arena, &xc, step, nsc)?;
    }
    Ok(xc)
}

fn eval_step(
    arena: &NodeArena,
    ctx: &EvalContext,
    step: &Step,
    nsc: Option<&NamespaceContext>,
) -> Result<EvalContext> {
    let mut xc = ctx.clone();
    if step.double_slash {
        xc.descendant = true;
    }
    let mut out: Vec<NodeId> = Vec::new();
    match step.axis {
        Axis::Child => {
            if step.test == NodeTest::Current {
                // current() at the head of a path restores the initial node.
                out.push(xc.initial);
            } else if xc.descendant {
                for &v in xc.node_set() {
                    collect_descendants(arena, v, &step.test, nsc, &mut out);
                }
            } else {
                for &v in xc.node_set() {
                    for &c in arena.children(v) {
                        if nodetest_matches(arena, c, &step.test, nsc) {
                            out.push(c);
                        }
                    }
                }
            }
            xc.descendant = false;
        }
        Axis::Descendant | Axis::DescendantOrSelf => {
            for &v in xc.node_set() {
                collect_descendants(arena, v, &step.test, nsc, &mut out);
            }
        }
        Axis::Parent => {
            for &v in xc.node_set() {
                if let Some(p) = arena.parent(v) {
                    out.push(p);
                }
            }
        }
        Axis::SelfAxis => {
            for &v in xc.node_set() {
                if nodetest_matches(arena, v, &step.test, nsc) {
                    out.push(v);
                }
            }
        }
        Axis::Ancestor => {
            for &v in xc.node_set() {
                let mut cur = arena.parent(v);
                while let Some(p) = cur {
                    if nodetest_matches(arena, p, &step.test, nsc) {
                        out.push(p);
                    }
                    cur = arena.parent(p);
                }
            }
        }
        Axis::AncestorOrSelf => {
            for &v in xc.node_set() {
                let mut cur = Some(v);
                while let Some(p) = cur {
                    if nodetest_matches(arena, p, &step.test, nsc) {
                        out.push(p);
                    }
                    cur = arena.parent(p);
                }
            }
        }
        // Remaining axes are accepted by the parser but select nothing.
        Axis::Attribute
        | Axis::Namespace
        | Axis::Following
        | Axis::FollowingSibling
        | Axis::Preceding
        | Axis::PrecedingSibling => {}
    }
    xc.replace_node_set(out);
    for pred in &step.predicates {
        xc = eval_predicate(arena, &xc, pred, nsc)?;
    }
    Ok(xc)
}

/// Collect descendants of `node` matching the test, document order
fn collect_descendants(
    arena: &NodeArena,
    node: NodeId,
    test: &NodeTest,
    nsc: Option<&NamespaceContext>,
    out: &mut Vec<NodeId>,
) {
    for &c in arena.children(node) {
        if nodetest_matches(arena, c, test, nsc) {
            out.push(c);
        }
        if arena.kind(c) == NodeKind::Element {
            collect_descendants(arena, c, test, nsc, out);
        }
    }
}

/// Apply one predicate, narrowing the context node-set
///
/// Each candidate is evaluated as a single-element context in source order.
/// Candidates are iterated 0-based; a numeric result keeps the node whose
/// 1-based context position equals the number, everything else coerces to a
/// boolean.
fn eval_predicate(
    arena: &NodeArena,
    ctx: &EvalContext,
    pred: &Expr,
    nsc: Option<&NamespaceContext>,
) -> Result<EvalContext> {
    let input = ctx.node_set().to_vec();
    let size = input.len();
    let mut kept = Vec::new();
    for (i, &x) in input.iter().enumerate() {
        let mut xcc = EvalContext::new(x);
        xcc.initial = ctx.initial;
        xcc.position = i + 1;
        xcc.size = size;
        let rc = eval(arena, &xcc, pred, nsc)?;
        let keep = match rc.result {
            EvalResult::Number(n) => n == (i + 1) as f64,
            _ => rc.to_boolean(arena),
        };
        if keep {
            kept.push(x);
        }
    }
    let mut out = ctx.clone();
    out.replace_node_set(kept);
    Ok(out)
}

/// Node test semantics
///
/// With a namespace context the test is strict: the URI bound to the node's
/// document prefix must equal the URI the context binds to the test's
/// prefix, and two unresolved namespaces also match. Without one the raw
/// prefixes are compared.
fn nodetest_matches(
    arena: &NodeArena,
    x: NodeId,
    test: &NodeTest,
    nsc: Option<&NamespaceContext>,
) -> bool {
    match test {
        NodeTest::AnyNode => arena.kind(x) == NodeKind::Element,
        NodeTest::Text => arena.kind(x) == NodeKind::Text,
        NodeTest::Current => false,
        NodeTest::Name { prefix, local } => {
            if arena.kind(x) != NodeKind::Element {
                return false;
            }
            if local == "*" {
                return true;
            }
            if arena.name(x) != local {
                return false;
            }
            match nsc {
                Some(nsc) => {
                    let ns_doc = namespaces::lookup_prefix_uri(arena, x, arena.prefix(x));
                    let ns_xpath = nsc.lookup(prefix.as_deref());
                    match (ns_doc.as_deref(), ns_xpath) {
                        (Some(a), Some(b)) => a == b,
                        (None, None) => true,
                        _ => false,
                    }
                }
                None => arena.prefix(x) == prefix.as_deref(),
            }
        }
    }
}

fn eval_call(
    arena: &NodeArena,
    ctx: &EvalContext,
    name: &str,
    args: &[Expr],
    nsc: Option<&NamespaceContext>,
) -> Result<EvalContext> {
    let mut out = ctx.clone();
    match name {
        "position" => {
            out.result = EvalResult::Number(ctx.position as f64);
        }
        "last" => {
            out.result = EvalResult::Number(ctx.size as f64);
        }
        "count" => {
            let arg = args
                .first()
                .ok_or_else(|| Error::Xpath("count() requires an argument".to_string()))?;
            let r = eval(arena, ctx, arg, nsc)?;
            out.result = EvalResult::Number(r.node_set().len() as f64);
        }
        "current" => {
            out.replace_node_set(vec![ctx.initial]);
        }
        "not" => {
            let arg = args
                .first()
                .ok_or_else(|| Error::Xpath("not() requires an argument".to_string()))?;
            let r = eval(arena, ctx, arg, nsc)?;
            out.result = EvalResult::Bool(!r.to_boolean(arena));
        }
        "name" => {
            let qname = match arena.prefix(ctx.node) {
                Some(p) => format!("{}:{}", p, arena.name(ctx.node)),
                None => arena.name(ctx.node).to_string(),
            };
            out.result = EvalResult::String(qname);
        }
        other => {
            return Err(Error::Xpath(format!("unsupported function: {}()", other)));
        }
    }
    Ok(out)
}

/// `and` / `or`: both operands coerce to booleans
fn logop(
    arena: &NodeArena,
    ctx: &EvalContext,
    r1: &EvalContext,
    r2: &EvalContext,
    is_and: bool,
) -> EvalContext {
    let b1 = r1.to_boolean(arena);
    let b2 = r2.to_boolean(arena);
    let mut out = ctx.clone();
    out.result = EvalResult::Bool(if is_and { b1 && b2 } else { b1 || b2 });
    out
}

/// Numeric operators: operands coerce to numbers, NaN propagates
///
/// `mod` is the integer remainder of the truncated doubles; doubles are
/// never lowered to integers anywhere else.
fn numop(
    arena: &NodeArena,
    ctx: &EvalContext,
    r1: &EvalContext,
    r2: &EvalContext,
    op: ArithmeticOp,
) -> EvalContext {
    let n1 = r1.to_number(arena);
    let n2 = r2.to_number(arena);
    let n = if n1.is_nan() || n2.is_nan() {
        f64::NAN
    } else {
        match op {
            ArithmeticOp::Add => n1 + n2,
            ArithmeticOp::Sub => n1 - n2,
            ArithmeticOp::Mul => n1 * n2,
            ArithmeticOp::Div => n1 / n2,
            ArithmeticOp::Mod => {
                if n2.trunc() == 0.0 {
                    f64::NAN
                } else {
                    ((n1.trunc() as i64) % (n2.trunc() as i64)) as f64
                }
            }
        }
    };
    let mut out = ctx.clone();
    out.result = EvalResult::Number(n);
    out
}

fn compare_str(op: RelationalOp, s1: &str, s2: &str) -> bool {
    match op {
        RelationalOp::Eq => s1 == s2,
        RelationalOp::Ne => s1 != s2,
        RelationalOp::Lt => s1 < s2,
        RelationalOp::Le => s1 <= s2,
        RelationalOp::Gt => s1 > s2,
        RelationalOp::Ge => s1 >= s2,
    }
}

fn compare_num(op: RelationalOp, n1: f64, n2: f64) -> bool {
    match op {
        RelationalOp::Eq => n1 == n2,
        RelationalOp::Ne => n1 != n2,
        RelationalOp::Lt => n1 < n2,
        RelationalOp::Le => n1 <= n2,
        RelationalOp::Gt => n1 > n2,
        RelationalOp::Ge => n1 >= n2,
    }
}

/// Relational operators per XPath 1.0 section 3.4
fn relop(
    arena: &NodeArena,
    ctx: &EvalContext,
    r1: &EvalContext,
    r2: &EvalContext,
    op: RelationalOp,
) -> Result<EvalContext> {
    let b = match (&r1.result, &r2.result) {
        (EvalResult::NodeSet(v1), EvalResult::NodeSet(v2)) => {
            // True iff some pair of node string-values satisfies the
            // operator; the string-value of an element without a body is
            // the empty string.
            let mut found = false;
            'outer: for &n1 in v1 {
                let s1 = arena.body(n1).unwrap_or("");
                for &n2 in v2 {
                    let s2 = arena.body(n2).unwrap_or("");
                    if compare_str(op, s1, s2) {
                        found = true;
                        break 'outer;
                    }
                }
            }
            found
        }
        (EvalResult::Bool(b1), EvalResult::Bool(b2)) => match op {
            RelationalOp::Eq => b1 == b2,
            RelationalOp::Ne => b1 != b2,
            _ => compare_num(op, *b1 as u8 as f64, *b2 as u8 as f64),
        },
        (EvalResult::Number(n1), EvalResult::Number(n2)) => compare_num(op, *n1, *n2),
        (EvalResult::String(s1), EvalResult::String(s2)) => compare_str(op, s1, s2),
        (EvalResult::NodeSet(_), _) | (_, EvalResult::NodeSet(_)) => {
            let (ns, other, reverse) = if matches!(r1.result, EvalResult::NodeSet(_)) {
                (r1, r2, false)
            } else {
                (r2, r1, true)
            };
            match &other.result {
                EvalResult::Bool(b2) => {
                    let b1 = ns.to_boolean(arena);
                    match op {
                        RelationalOp::Eq => b1 == *b2,
                        RelationalOp::Ne => b1 != *b2,
                        _ => {
                            return Err(Error::Xpath(
                                "operator not supported for node-set and boolean".to_string(),
                            ))
                        }
                    }
                }
                EvalResult::String(s2) => {
                    // True iff some node's string-value satisfies the
                    // comparison with the string.
                    let mut found = false;
                    for &n in ns.node_set() {
                        let matched = match (op, arena.body(n)) {
                            (RelationalOp::Eq, Some(s1)) => s1 == s2.as_str(),
                            (RelationalOp::Eq, None) => false,
                            (RelationalOp::Ne, Some(s1)) => s1 != s2.as_str(),
                            (RelationalOp::Ne, None) => true,
                            _ => {
                                return Err(Error::Xpath(
                                    "operator not supported for node-set and string"
                                        .to_string(),
                                ))
                            }
                        };
                        if matched {
                            found = true;
                            break;
                        }
                    }
                    found
                }
                EvalResult::Number(n2) => {
                    let mut found = false;
                    for &n in ns.node_set() {
                        let n1 = arena.body(n).map(parse_number).unwrap_or(f64::NAN);
                        // The node-set may have come from either side;
                        // reverse restores the written operand order.
                        let matched = if reverse {
                            compare_num(op, *n2, n1)
                        } else {
                            compare_num(op, n1, *n2)
                        };
                        if matched {
                            found = true;
                            break;
                        }
                    }
                    found
                }
                EvalResult::NodeSet(_) => unreachable!("same-type handled above"),
            }
        }
        _ => {
            return Err(Error::Xpath(
                "mixed types not supported in comparison".to_string(),
            ))
        }
    };
    let mut out = ctx.clone();
    out.result = EvalResult::Bool(b);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::parser::parse;

    fn select_str(arena: &NodeArena, path: &str, nsc: Option<&NamespaceContext>) -> Vec<NodeId> {
        let expr = parse(path).unwrap();
        select(arena, arena.root(), &expr, nsc).unwrap()
    }

    fn names(arena: &NodeArena, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| arena.name(id).to_string()).collect()
    }

    #[test]
    fn test_root_selects_root() {
        let arena = NodeArena::parse("<config><top><a>1</a></top></config>").unwrap();
        let got = select_str(&arena, "/", None);
        assert_eq!(got, vec![arena.root()]);
    }

    #[test]
    fn test_descendant_star_selects_all() {
        let arena = NodeArena::parse("<config><top><a>1</a><b><c/></b></top></config>").unwrap();
        let got = select_str(&arena, "//*", None);
        assert_eq!(names(&arena, &got), vec!["top", "a", "b", "c"]);
    }

    #[test]
    fn test_child_path() {
        let arena = NodeArena::parse("<config><top><a>1</a><a>2</a><b/></top></config>").unwrap();
        let got = select_str(&arena, "/top/a", None);
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_body_predicate() {
        let arena = NodeArena::parse("<config><top><a>1</a><a>2</a></top></config>").unwrap();
        let got = select_str(&arena, "/top/a[.=2]", None);
        assert_eq!(got.len(), 1);
        assert_eq!(arena.body(got[0]), Some("2"));
    }

    #[test]
    fn test_numeric_predicate_is_one_based() {
        let arena =
            NodeArena::parse("<config><top><a>1</a><a>2</a><a>3</a></top></config>").unwrap();
        let got = select_str(&arena, "/top/a[2]", None);
        assert_eq!(got.len(), 1);
        assert_eq!(arena.body(got[0]), Some("2"));
    }

    #[test]
    fn test_position_function() {
        let arena = NodeArena::parse(
            "<config><top><a>1</a><a>2</a><a>3</a><a>4</a></top></config>",
        )
        .unwrap();
        let got = select_str(&arena, "/top/child::*[position()=3]", None);
        assert_eq!(got.len(), 1);
        assert_eq!(arena.body(got[0]), Some("3"));

        let got = select_str(&arena, "/top/a[position()<3]", None);
        assert_eq!(got.len(), 2);

        let got = select_str(&arena, "/top/a[3 <= position() and position() < 5]", None);
        assert_eq!(got.len(), 2);
        assert_eq!(arena.body(got[0]), Some("3"));
        assert_eq!(arena.body(got[1]), Some("4"));
    }

    #[test]
    fn test_last_and_count() {
        let arena =
            NodeArena::parse("<config><top><a>1</a><a>2</a><a>3</a></top></config>").unwrap();
        let got = select_str(&arena, "/top/a[position()=last()]", None);
        assert_eq!(arena.body(got[0]), Some("3"));

        let got = select_str(&arena, "/top[count(a)=3]", None);
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_parent_and_dotdot() {
        let arena = NodeArena::parse("<config><top><a><b/></a></top></config>").unwrap();
        let got = select_str(&arena, "/top/a/b/..", None);
        assert_eq!(names(&arena, &got), vec!["a"]);
    }

    #[test]
    fn test_ancestor_axes() {
        let arena = NodeArena::parse("<config><top><a><b/></a></top></config>").unwrap();
        let got = select_str(&arena, "/top/a/b/ancestor::top", None);
        assert_eq!(names(&arena, &got), vec!["top"]);
        let got = select_str(&arena, "/top/a/ancestor-or-self::a", None);
        assert_eq!(names(&arena, &got), vec!["a"]);
    }

    #[test]
    fn test_strict_namespace_matching() {
        // Document prefix differs from the XPath prefix; URIs decide.
        let arena = NodeArena::parse(
            "<config><p:top xmlns:p=\"urn:u\"><p:a>1</p:a></p:top></config>",
        )
        .unwrap();
        let mut nsc = NamespaceContext::new();
        nsc.add(Some("q"), "urn:u");
        let got = select_str(&arena, "/q:top/q:a", Some(&nsc));
        assert_eq!(got.len(), 1);

        // A prefix bound to a different URI does not match.
        let mut wrong = NamespaceContext::new();
        wrong.add(Some("q"), "urn:other");
        let got = select_str(&arena, "/q:top/q:a", Some(&wrong));
        assert!(got.is_empty());
    }

    #[test]
    fn test_strict_default_namespace() {
        let arena =
            NodeArena::parse("<config><top xmlns=\"urn:u\"><a>1</a></top></config>").unwrap();
        let mut nsc = NamespaceContext::new();
        nsc.add(Some("t"), "urn:u");
        let got = select_str(&arena, "/t:top/t:a", Some(&nsc));
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_lenient_prefix_matching() {
        let arena = NodeArena::parse(
            "<config><p:top xmlns:p=\"urn:u\"><p:a>1</p:a></p:top></config>",
        )
        .unwrap();
        // Lenient mode compares raw prefixes.
        assert_eq!(select_str(&arena, "/p:top/p:a", None).len(), 1);
        assert!(select_str(&arena, "/q:top/q:a", None).is_empty());
        assert!(select_str(&arena, "/top/a", None).is_empty());
    }

    #[test]
    fn test_both_unresolved_match() {
        let arena = NodeArena::parse("<config><top><a>1</a></top></config>").unwrap();
        // Strict mode with neither side resolvable still matches.
        let nsc = NamespaceContext::new();
        let got = select_str(&arena, "/top/a", Some(&nsc));
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_union_concatenates() {
        let arena = NodeArena::parse("<config><top><a>1</a><b>2</b></top></config>").unwrap();
        let got = select_str(&arena, "/top/a | /top/b", None);
        assert_eq!(names(&arena, &got), vec!["a", "b"]);
    }

    #[test]
    fn test_arithmetic() {
        let arena = NodeArena::parse("<config><top><a>6</a></top></config>").unwrap();
        let expr = parse("/top/a[. = 2 * 3]").unwrap();
        let got = select(&arena, arena.root(), &expr, None).unwrap();
        assert_eq!(got.len(), 1);

        let got = select_str(&arena, "/top/a[. mod 4 = 2]", None);
        assert_eq!(got.len(), 1);

        // NaN propagates and never compares true.
        let got = select_str(&arena, "/top/a[. + xxx = 6]", None);
        assert!(got.is_empty());
    }

    #[test]
    fn test_relational_reverse_sense() {
        let arena = NodeArena::parse("<config><top><a>5</a></top></config>").unwrap();
        // Node-set on the right: the sense of < is reversed internally.
        assert_eq!(select_str(&arena, "/top/a[3 < .]", None).len(), 1);
        assert!(select_str(&arena, "/top/a[7 < .]", None).is_empty());
        assert_eq!(select_str(&arena, "/top/a[. < 7]", None).len(), 1);
    }

    #[test]
    fn test_nodeset_nodeset_comparison_is_existential() {
        // The empty <x/> does not end the search; a later pair satisfies =.
        let arena = NodeArena::parse(
            "<config><top><x/><x>1</x><y>1</y></top></config>",
        )
        .unwrap();
        assert_eq!(select_str(&arena, "/top[x = y]", None).len(), 1);

        // An element without a body compares as the empty string.
        let arena = NodeArena::parse("<config><top><x/><y></y></top></config>").unwrap();
        assert_eq!(select_str(&arena, "/top[x = y]", None).len(), 1);
        assert!(select_str(&arena, "/top[x != y]", None).is_empty());
    }

    #[test]
    fn test_nodeset_string_comparison() {
        let arena =
            NodeArena::parse("<config><top><a>x</a><a>y</a></top></config>").unwrap();
        assert_eq!(select_str(&arena, "/top[a='y']", None).len(), 1);
        assert!(select_str(&arena, "/top[a='z']", None).is_empty());
        assert_eq!(select_str(&arena, "/top[a!='z']", None).len(), 1);
    }

    #[test]
    fn test_not_function() {
        let arena = NodeArena::parse("<config><top><a>1</a><b/></top></config>").unwrap();
        assert_eq!(select_str(&arena, "/top[not(c)]", None).len(), 1);
        assert!(select_str(&arena, "/top[not(a)]", None).is_empty());
    }

    #[test]
    fn test_unknown_function_is_an_error() {
        let arena = NodeArena::parse("<config><top/></config>").unwrap();
        let expr = parse("/top[starts-with(., 'x')]").unwrap();
        assert!(select(&arena, arena.root(), &expr, None).is_err());
    }

    #[test]
    fn test_stub_axes_select_nothing() {
        let arena = NodeArena::parse("<config><top><a/><b/></top></config>").unwrap();
        assert!(select_str(&arena, "/top/a/following-sibling::b", None).is_empty());
    }

    #[test]
    fn test_current_resets_to_initial() {
        let arena = NodeArena::parse("<config><top><a>1</a></top></config>").unwrap();
        let got = select_str(&arena, "current()", None);
        assert_eq!(got, vec![arena.root()]);
    }
}
