//! Recursive-descent parser for rewritten expression text
//!
//! Precedence, lowest first:
//!
//! ```text
//! ||
//! &&
//! == !=
//! < <= > >=
//! + -
//! * /
//! ! - (unary)
//! ```

use crate::rewrite::{tokenize, Token, TokenKind};

use super::ast::{BinaryOp, Expr, FieldRef, Function, LogicalOp, Scalar, UnaryOp};
use super::errors::{QueryError, QueryResult};

/// Default nesting limit for parentheses, calls, unary and arithmetic or
/// comparison operators
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Parses `text` into an expression tree
pub fn parse(text: &str, max_depth: usize) -> QueryResult<Expr> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
        end: text.len(),
    };

    if parser.tokens.is_empty() {
        return Err(QueryError::compile("empty expression", 0));
    }

    let expr = parser.parse_or()?;
    if let Some(token) = parser.tokens.get(parser.pos) {
        return Err(QueryError::compile(
            format!("unexpected '{}'", token.kind),
            token.position,
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.position).unwrap_or(self.end)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: TokenKind) -> QueryResult<()> {
        match self.peek() {
            Some(kind) if *kind == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(kind) => Err(QueryError::compile(
                format!("expected '{}', found '{}'", expected, kind),
                self.position(),
            )),
            None => Err(QueryError::compile(
                format!("expected '{}', found end of input", expected),
                self.end,
            )),
        }
    }

    fn descend(&mut self) -> QueryResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(QueryError::compile(
                format!("expression nested deeper than {}", self.max_depth),
                self.position(),
            ));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn parse_or(&mut self) -> QueryResult<Expr> {
        self.parse_logical(LogicalOp::Or, TokenKind::OrOr, Self::parse_and)
    }

    fn parse_and(&mut self) -> QueryResult<Expr> {
        self.parse_logical(LogicalOp::And, TokenKind::AndAnd, Self::parse_equality)
    }

    /// Collects `a op b op c` into one flat node
    fn parse_logical(
        &mut self,
        op: LogicalOp,
        separator: TokenKind,
        operand: fn(&mut Self) -> QueryResult<Expr>,
    ) -> QueryResult<Expr> {
        let first = operand(self)?;
        if self.peek() != Some(&separator) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.peek() == Some(&separator) {
            self.pos += 1;
            operands.push(operand(self)?);
        }
        Ok(Expr::Logical { op, operands })
    }

    fn parse_equality(&mut self) -> QueryResult<Expr> {
        self.parse_binary(Self::parse_relational, |kind| match kind {
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::NotEq),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> QueryResult<Expr> {
        self.parse_binary(Self::parse_additive, |kind| match kind {
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> QueryResult<Expr> {
        self.parse_binary(Self::parse_multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> QueryResult<Expr> {
        self.parse_binary(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            _ => None,
        })
    }

    /// Left-associative fold; every fold nests the tree one level deeper and
    /// counts toward the depth limit
    fn parse_binary(
        &mut self,
        operand: fn(&mut Self) -> QueryResult<Expr>,
        operator: fn(&TokenKind) -> Option<BinaryOp>,
    ) -> QueryResult<Expr> {
        let mut lhs = operand(self)?;
        let mut folds = 0;
        while let Some(op) = self.peek().and_then(operator) {
            self.pos += 1;
            self.descend()?;
            folds += 1;
            let rhs = operand(self)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth -= folds;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> QueryResult<Expr> {
        let op = match self.peek() {
            Some(TokenKind::Bang) => UnaryOp::Not,
            Some(TokenKind::Minus) => UnaryOp::Neg,
            _ => return self.parse_primary(),
        };
        self.pos += 1;
        self.descend()?;
        let operand = self.parse_unary()?;
        self.ascend();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> QueryResult<Expr> {
        let token = match self.next() {
            Some(token) => token,
            None => return Err(QueryError::compile("unexpected end of input", self.end)),
        };

        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(Scalar::Number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Scalar::Str(s))),
            TokenKind::Path(path) => Ok(Expr::Field(FieldRef::Path(path))),
            TokenKind::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Scalar::Bool(true))),
                "false" => Ok(Expr::Literal(Scalar::Bool(false))),
                "null" => Ok(Expr::Literal(Scalar::Null)),
                "undefined" => Ok(Expr::Literal(Scalar::Undefined)),
                _ if self.peek() == Some(&TokenKind::LParen) => {
                    self.parse_call(&name, token.position)
                }
                _ => Ok(Expr::Field(FieldRef::Unresolved(name))),
            },
            TokenKind::LParen => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.expect(TokenKind::RParen)?;
                self.ascend();
                Ok(inner)
            }
            other => Err(QueryError::compile(
                format!("unexpected '{}'", other),
                token.position,
            )),
        }
    }

    fn parse_call(&mut self, name: &str, position: usize) -> QueryResult<Expr> {
        let func = Function::lookup(name).ok_or_else(|| {
            QueryError::compile(format!("unknown function '{}'", name), position)
        })?;

        self.expect(TokenKind::LParen)?;
        self.descend()?;
        let mut args = Vec::new();
        if self.peek() != Some(&TokenKind::RParen) {
            loop {
                args.push(self.parse_or()?);
                if self.peek() == Some(&TokenKind::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        self.ascend();

        let (min, max) = func.arity();
        if args.len() < min || args.len() > max {
            return Err(QueryError::compile(
                format!("{}() takes {} argument(s), got {}", func.name(), arity_text(min, max), args.len()),
                position,
            ));
        }
        if func == Function::Exists && !matches!(args[0], Expr::Field(_)) {
            return Err(QueryError::compile("exists() expects a field", position));
        }

        Ok(Expr::Call { func, args })
    }
}

fn arity_text(min: usize, max: usize) -> String {
    if min == max {
        min.to_string()
    } else {
        format!("at least {}", min)
    }
}
