//! XPath 1.0 parser
//!
//! Hand-written tokenizer and recursive-descent parser over the XPath 1.0
//! grammar (W3C REC-xpath-19991116), restricted to the constructs the query
//! pipeline evaluates: location paths with axes, node tests and predicates,
//! the boolean/relational/arithmetic/union operators, literals and function
//! calls. Operator precedence is encoded in the produced tree shape.
//!
//! `and`, `or`, `div` and `mod` are recognised as operators only in operator
//! position, so elements with those names still parse as node tests.

use crate::error::{Error, Result};
use crate::xpath::ast::{ArithmeticOp, Axis, Expr, LocationPath, NodeTest, RelationalOp, Step};

/// Maximum bracket/parenthesis nesting accepted by the parser
///
/// Bounds evaluator recursion: pathological inputs fail to parse instead of
/// overflowing the stack at evaluation time.
const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Pipe,
    Plus,
    Minus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Star,
    At,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    DotDot,
    Colon,
    ColonColon,
    Name(String),
    Literal(String),
    Number(f64),
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    tokens.push(Token::DoubleSlash);
                } else {
                    tokens.push(Token::Slash);
                }
            }
            '|' => {
                chars.next();
                tokens.push(Token::Pipe);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err(Error::Xpath("expected '=' after '!'".to_string()));
                }
                tokens.push(Token::Ne);
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '@' => {
                chars.next();
                tokens.push(Token::At);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ':' => {
                chars.next();
                if chars.peek() == Some(&':') {
                    chars.next();
                    tokens.push(Token::ColonColon);
                } else {
                    tokens.push(Token::Colon);
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => break,
                        Some(ch) => s.push(ch),
                        None => {
                            return Err(Error::Xpath("unterminated string literal".to_string()))
                        }
                    }
                }
                tokens.push(Token::Literal(s));
            }
            '.' => {
                chars.next();
                match chars.peek() {
                    Some('.') => {
                        chars.next();
                        tokens.push(Token::DotDot);
                    }
                    Some(d) if d.is_ascii_digit() => {
                        let mut s = String::from("0.");
                        while let Some(&d) = chars.peek() {
                            if d.is_ascii_digit() {
                                s.push(d);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        let n = s
                            .parse::<f64>()
                            .map_err(|_| Error::Xpath(format!("bad number: {}", s)))?;
                        tokens.push(Token::Number(n));
                    }
                    _ => tokens.push(Token::Dot),
                }
            }
            d if d.is_ascii_digit() => {
                let mut s = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' {
                        s.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = s
                    .parse::<f64>()
                    .map_err(|_| Error::Xpath(format!("bad number: {}", s)))?;
                tokens.push(Token::Number(n));
            }
            c if is_name_start(c) => {
                let mut s = String::new();
                while let Some(&ch) = chars.peek() {
                    if is_name_char(ch) {
                        s.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(s));
            }
            other => {
                return Err(Error::Xpath(format!("unexpected character '{}'", other)));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, t: Token) -> Result<()> {
        match self.next() {
            Some(ref got) if *got == t => Ok(()),
            Some(got) => Err(Error::Xpath(format!("expected {:?}, found {:?}", t, got))),
            None => Err(Error::Xpath(format!("expected {:?} at end of input", t))),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(Error::Xpath(format!(
                "expression nesting exceeds {} levels",
                MAX_NESTING
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn at_operator_name(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == name)
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.at_operator_name("or") {
            self.next();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.at_operator_name("and") {
            self.next();
            let rhs = self.parse_equality()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => RelationalOp::Eq,
                Some(Token::Ne) => RelationalOp::Ne,
                _ => break,
            };
            self.next();
            let rhs = self.parse_relational()?;
            lhs = Expr::Relational(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => RelationalOp::Lt,
                Some(Token::Le) => RelationalOp::Le,
                Some(Token::Gt) => RelationalOp::Gt,
                Some(Token::Ge) => RelationalOp::Ge,
                _ => break,
            };
            self.next();
            let rhs = self.parse_additive()?;
            lhs = Expr::Relational(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithmeticOp::Add,
                Some(Token::Minus) => ArithmeticOp::Sub,
                _ => break,
            };
            self.next();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Arithmetic(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithmeticOp::Mul,
                Some(Token::Name(n)) if n == "div" => ArithmeticOp::Div,
                Some(Token::Name(n)) if n == "mod" => ArithmeticOp::Mod,
                _ => break,
            };
            self.next();
            let rhs = self.parse_unary()?;
            lhs = Expr::Arithmetic(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Minus) {
            self.next();
            let operand = self.parse_unary()?;
            return Ok(Expr::Arithmetic(
                ArithmeticOp::Sub,
                Box::new(Expr::Number(0.0)),
                Box::new(operand),
            ));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_path_expr()?;
        while self.peek() == Some(&Token::Pipe) {
            self.next();
            let rhs = self.parse_path_expr()?;
            lhs = Expr::Union(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn at_function_call(&self) -> bool {
        match (self.peek(), self.peek2()) {
            (Some(Token::Name(n)), Some(Token::LParen)) => {
                !matches!(n.as_str(), "node" | "text" | "current")
            }
            _ => false,
        }
    }

    fn parse_path_expr(&mut self) -> Result<Expr> {
        if self.at_function_call() {
            return self.parse_function_call();
        }
        match self.next_if_primary() {
            Some(expr) => expr,
            None => self.parse_location_path().map(Expr::Path),
        }
    }

    /// Consume a literal, number or parenthesised expression if one is next
    fn next_if_primary(&mut self) -> Option<Result<Expr>> {
        match self.peek() {
            Some(Token::Literal(_)) => match self.next() {
                Some(Token::Literal(s)) => Some(Ok(Expr::Literal(s))),
                _ => unreachable!(),
            },
            Some(Token::Number(_)) => match self.next() {
                Some(Token::Number(n)) => Some(Ok(Expr::Number(n))),
                _ => unreachable!(),
            },
            Some(Token::LParen) => Some(self.parse_parenthesized()),
            _ => None,
        }
    }

    fn parse_parenthesized(&mut self) -> Result<Expr> {
        self.enter()?;
        self.next();
        let inner = self.parse_expr()?;
        self.expect(Token::RParen)?;
        self.leave();
        Ok(inner)
    }

    fn parse_function_call(&mut self) -> Result<Expr> {
        let name = match self.next() {
            Some(Token::Name(n)) => n,
            other => return Err(Error::Xpath(format!("expected function name, {:?}", other))),
        };
        self.enter()?;
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.peek() == Some(&Token::Comma) {
                    self.next();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        self.leave();
        Ok(Expr::Call(name, args))
    }

    fn at_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Dot)
                | Some(Token::DotDot)
                | Some(Token::At)
                | Some(Token::Star)
                | Some(Token::Name(_))
        )
    }

    fn parse_location_path(&mut self) -> Result<LocationPath> {
        let mut absolute = false;
        let mut double_slash = false;
        match self.peek() {
            Some(Token::Slash) => {
                self.next();
                absolute = true;
                if !self.at_step_start() {
                    // Bare "/" selects the document root.
                    return Ok(LocationPath {
                        absolute,
                        steps: Vec::new(),
                    });
                }
            }
            Some(Token::DoubleSlash) => {
                self.next();
                absolute = true;
                double_slash = true;
            }
            _ => {}
        }
        let mut steps = Vec::new();
        loop {
            steps.push(self.parse_step(double_slash)?);
            match self.peek() {
                Some(Token::Slash) => {
                    self.next();
                    double_slash = false;
                }
                Some(Token::DoubleSlash) => {
                    self.next();
                    double_slash = true;
                }
                _ => break,
            }
        }
        Ok(LocationPath { absolute, steps })
    }

    fn parse_step(&mut self, double_slash: bool) -> Result<Step> {
        match self.peek() {
            Some(Token::Dot) => {
                self.next();
                return Ok(Step {
                    axis: Axis::SelfAxis,
                    double_slash,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                });
            }
            Some(Token::DotDot) => {
                self.next();
                return Ok(Step {
                    axis: Axis::Parent,
                    double_slash,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                });
            }
            _ => {}
        }

        let mut axis = Axis::Child;
        if self.peek() == Some(&Token::At) {
            self.next();
            axis = Axis::Attribute;
        } else if let (Some(Token::Name(n)), Some(Token::ColonColon)) = (self.peek(), self.peek2())
        {
            axis = Axis::from_name(n)
                .ok_or_else(|| Error::Xpath(format!("unknown axis name: {}", n)))?;
            self.next();
            self.next();
        }

        let test = self.parse_node_test()?;
        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.enter()?;
            self.next();
            predicates.push(self.parse_expr()?);
            self.expect(Token::RBracket)?;
            self.leave();
        }
        Ok(Step {
            axis,
            double_slash,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest> {
        match self.next() {
            Some(Token::Star) => Ok(NodeTest::Name {
                prefix: None,
                local: "*".to_string(),
            }),
            Some(Token::Name(n)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.next();
                    self.expect(Token::RParen)?;
                    return match n.as_str() {
                        "node" => Ok(NodeTest::AnyNode),
                        "text" => Ok(NodeTest::Text),
                        "current" => Ok(NodeTest::Current),
                        other => {
                            Err(Error::Xpath(format!("unknown node test: {}()", other)))
                        }
                    };
                }
                if self.peek() == Some(&Token::Colon) {
                    self.next();
                    return match self.next() {
                        Some(Token::Name(local)) => Ok(NodeTest::Name {
                            prefix: Some(n),
                            local,
                        }),
                        Some(Token::Star) => Ok(NodeTest::Name {
                            prefix: Some(n),
                            local: "*".to_string(),
                        }),
                        other => Err(Error::Xpath(format!(
                            "expected local name after '{}:', found {:?}",
                            n, other
                        ))),
                    };
                }
                Ok(NodeTest::Name {
                    prefix: None,
                    local: n,
                })
            }
            other => Err(Error::Xpath(format!("expected node test, found {:?}", other))),
        }
    }
}

/// Parse an XPath 1.0 expression
pub fn parse(input: &str) -> Result<Expr> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::Xpath("empty expression".to_string()));
    }
    let tokens = tokenize(trimmed)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
    };
    let expr = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::Xpath(format!(
            "trailing tokens after expression: {:?}",
            parser.tokens[parser.pos]
        )));
    }
    Ok(expr)
}
