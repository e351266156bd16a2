//! Expression AST and recursive-descent parser
//!
//! Precedence, lowest first:
//!
//! | level | operators |
//! |---|---|
//! | disjunction | `or`, `\|\|` |
//! | conjunction | `and`, `&&` |
//! | negation | `not`, `!` |
//! | comparison | `== != < <= > >=` (chained: `0 < a < b`) |
//! | sum | `+ -` |
//! | product | `* / %` |
//! | unary | `-` |
//! | postfix | `[index]` |

use super::lexer::{tokenize, Token};
use super::value::Value;
use crate::types::PortKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Parsed rule expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Port {
        kind: PortKind,
        name: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `first op1 e1 op2 e2 ...`, true when every adjacent pair holds
    Compare {
        first: Box<Expr>,
        rest: Vec<(CompareOp, Expr)>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
}

impl Expr {
    /// Every port referenced by the expression, in order of appearance
    pub fn ports(&self) -> Vec<(PortKind, &str)> {
        let mut out = Vec::new();
        self.collect_ports(&mut out);
        out
    }

    fn collect_ports<'a>(&'a self, out: &mut Vec<(PortKind, &'a str)>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Port { kind, name } => out.push((*kind, name.as_str())),
            Expr::Unary { operand, .. } => operand.collect_ports(out),
            Expr::Arith { lhs, rhs, .. } | Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                lhs.collect_ports(out);
                rhs.collect_ports(out);
            }
            Expr::Compare { first, rest } => {
                first.collect_ports(out);
                for (_, e) in rest {
                    e.collect_ports(out);
                }
            }
            Expr::Index { target, index } => {
                target.collect_ports(out);
                index.collect_ports(out);
            }
        }
    }
}

/// Parse a complete expression
pub fn parse_expr(src: &str) -> Result<Expr, String> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.disjunction()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected {:?} after end of expression", token)),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(found) => format!("expected {:?}, found {:?}", expected, found),
                None => format!("expected {:?}, found end of expression", expected),
            })
        }
    }

    fn disjunction(&mut self) -> Result<Expr, String> {
        let mut lhs = self.conjunction()?;
        while self.eat(&Token::Or) {
            let rhs = self.conjunction()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn conjunction(&mut self) -> Result<Expr, String> {
        let mut lhs = self.negation()?;
        while self.eat(&Token::And) {
            let rhs = self.negation()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn negation(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Not) {
            let operand = self.negation()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let first = self.sum()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::Ne) => CompareOp::Ne,
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::Le) => CompareOp::Le,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::Ge) => CompareOp::Ge,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.sum()?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn sum(&mut self) -> Result<Expr, String> {
        let mut lhs = self.product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.product()?;
            lhs = Expr::Arith {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn product(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                Some(Token::Percent) => ArithOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Arith {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.atom()?;
        while self.eat(&Token::LBracket) {
            let index = self.disjunction()?;
            self.expect(Token::RBracket)?;
            expr = Expr::Index {
                target: Box::new(expr),
                index: Box::new(index),
            };
        }
        Ok(expr)
    }

    fn atom(&mut self) -> Result<Expr, String> {
        match self.bump() {
            Some(Token::Number(v)) => Ok(Expr::Literal(Value::Number(v))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Text(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::None) => Ok(Expr::Literal(Value::None)),
            Some(Token::Port(kind, name)) => Ok(Expr::Port { kind, name }),
            Some(Token::LParen) => {
                let inner = self.disjunction()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(format!("unexpected {:?}", token)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(kind: PortKind, name: &str) -> Expr {
        Expr::Port {
            kind,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_simple_comparison() {
        let expr = parse_expr("in:a == 1").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                first: Box::new(port(PortKind::Input, "a")),
                rest: vec![(CompareOp::Eq, Expr::Literal(Value::Number(1.0)))],
            }
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse_expr("in:a or in:b and in:c").unwrap();
        match expr {
            Expr::Or(lhs, rhs) => {
                assert_eq!(*lhs, port(PortKind::Input, "a"));
                assert!(matches!(*rhs, Expr::And(_, _)));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_chained_comparison() {
        let expr = parse_expr("0 < out:l1 < out:r1").unwrap();
        match expr {
            Expr::Compare { rest, .. } => {
                assert_eq!(rest.len(), 2);
                assert_eq!(rest[0].0, CompareOp::Lt);
                assert_eq!(rest[1].0, CompareOp::Lt);
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_precedence() {
        let expr = parse_expr("1 + 2 * 3").unwrap();
        match expr {
            Expr::Arith { op: ArithOp::Add, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Arith { op: ArithOp::Mul, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_not_over_comparison() {
        let expr = parse_expr("not (out:r2 > 0 and out:l2 > 0)").unwrap();
        assert!(matches!(expr, Expr::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn test_index_and_port_listing() {
        let expr = parse_expr("in:gen[0] == out:dest[1] + in:gen[2]").unwrap();
        let ports = expr.ports();
        assert_eq!(
            ports,
            vec![
                (PortKind::Input, "gen"),
                (PortKind::Output, "dest"),
                (PortKind::Input, "gen"),
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_expr("").is_err());
        assert!(parse_expr("in:a ==").is_err());
        assert!(parse_expr("(in:a == 1").is_err());
        assert!(parse_expr("in:a == 1)").is_err());
        assert!(parse_expr("in:a[0").is_err());
    }
}
