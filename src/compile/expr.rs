//! The expression grammar.
//!
//! From loosest to tightest binding:
//!
//! ```text
//! conditional     a if cond else b
//! or              a or b, a || b
//! and             a and b, a && b
//! not             not a, !a
//! comparison      == != <> < <= > >= in, not in
//! filter          a|f|g:param|h(param)
//! additive        + -
//! multiplicative  * / %
//! unary           -a +a
//! postfix         a.b a.0 a[b] a(b, c)
//! primary         literals, names, (a), block.super
//! ```

use crate::compile::lex::{Token, TokenKind};
use crate::compile::parse::{Parser, MAX_NESTING};
use crate::types::ast::{BinaryOp, Expr, ExprKind, FilterCall, UnaryOp};
use crate::types::span::Position;
use crate::{Result, Value};

impl<'p> Parser<'p> {
    /// Parses a full expression.
    pub fn parse_expression(&mut self) -> Result<Expr> {
        self.nested(Self::parse_conditional)
    }

    /// Runs a parse step one level deeper, failing once the nesting limit is
    /// reached.
    fn nested(&mut self, parse: fn(&mut Self) -> Result<Expr>) -> Result<Expr> {
        if self.depth >= MAX_NESTING {
            let msg = format!("expression is nested too deeply (more than {MAX_NESTING})");
            return Err(self.error(msg, None));
        }
        self.depth += 1;
        let expr = parse(self);
        self.depth -= 1;
        expr
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let then = self.parse_or()?;
        if !self.match_ident("if") {
            return Ok(then);
        }
        let cond = self.parse_or()?;
        let otherwise = if self.match_ident("else") {
            Some(Box::new(self.parse_conditional()?))
        } else {
            None
        };
        let pos = then.pos.clone();
        let kind = ExprKind::Cond {
            then: Box::new(then),
            cond: Box::new(cond),
            otherwise,
        };
        Ok(Expr::new(kind, pos))
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        loop {
            let Some(op) = self.peek().copied() else { break };
            if !(self.match_ident("or") || self.match_symbol("||")) {
                break;
            }
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs, self.position(&op));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_not()?;
        loop {
            let Some(op) = self.peek().copied() else { break };
            if !(self.match_ident("and") || self.match_symbol("&&")) {
                break;
            }
            let rhs = self.parse_not()?;
            lhs = binary(BinaryOp::And, lhs, rhs, self.position(&op));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if let Some(op) = self.peek().copied() {
            if self.match_ident("not") || self.match_symbol("!") {
                let operand = self.nested(Self::parse_not)?;
                let kind = ExprKind::Unary(UnaryOp::Not, Box::new(operand));
                return Ok(Expr::new(kind, self.position(&op)));
            }
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_filtered()?;
        while let Some(op_tok) = self.peek().copied() {
            let op = match (op_tok.kind, self.text(&op_tok)) {
                (TokenKind::Operator, "==") => BinaryOp::Eq,
                (TokenKind::Operator, "!=" | "<>") => BinaryOp::Ne,
                (TokenKind::Operator, "<") => BinaryOp::Lt,
                (TokenKind::Operator, "<=") => BinaryOp::Le,
                (TokenKind::Operator, ">") => BinaryOp::Gt,
                (TokenKind::Operator, ">=") => BinaryOp::Ge,
                (TokenKind::Ident, "in") => BinaryOp::In,
                (TokenKind::Ident, "not") if self.is_not_in() => BinaryOp::NotIn,
                _ => break,
            };
            self.idx += if op == BinaryOp::NotIn { 2 } else { 1 };
            let rhs = self.parse_filtered()?;
            lhs = binary(op, lhs, rhs, self.position(&op_tok));
        }
        Ok(lhs)
    }

    fn is_not_in(&self) -> bool {
        matches!(
            self.tokens.get(self.idx + 1),
            Some(t) if t.kind == TokenKind::Ident && self.text(t) == "in"
        )
    }

    fn parse_filtered(&mut self) -> Result<Expr> {
        let mut expr = self.parse_additive()?;
        while self.match_symbol("|") {
            let call = self.parse_filter_call()?;
            let pos = call.pos.clone();
            expr = Expr::new(ExprKind::Filter(Box::new(expr), call), pos);
        }
        Ok(expr)
    }

    /// Parses `name`, `name:param` or `name(param)`.
    ///
    /// Names that are neither registered nor banned are rejected here. Banned
    /// filters compile and fail when they are applied.
    pub(crate) fn parse_filter_call(&mut self) -> Result<FilterCall> {
        let token = match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => *t,
            _ => return Err(self.err_expected("filter name")),
        };
        self.idx += 1;
        let name = self.text(&token);
        let set = self.env.set;
        if !set.filters.contains_key(name) && !set.banned_filters.contains(name) {
            return Err(self.error(format!("filter '{name}' does not exist"), Some(&token)));
        }

        let arg = if self.match_symbol(":") {
            Some(Box::new(self.parse_unary()?))
        } else if self.match_symbol("(") {
            let arg = self.parse_expression()?;
            self.expect_symbol(")")?;
            Some(Box::new(arg))
        } else {
            None
        };

        Ok(FilterCall {
            name: name.to_owned(),
            arg,
            pos: self.position(&token),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        while let Some(op_tok) = self.peek().copied() {
            let op = match self.operator(&op_tok) {
                Some("+") => BinaryOp::Add,
                Some("-") => BinaryOp::Sub,
                _ => break,
            };
            self.idx += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs, self.position(&op_tok));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some(op_tok) = self.peek().copied() {
            let op = match self.operator(&op_tok) {
                Some("*") => BinaryOp::Mul,
                Some("/") => BinaryOp::Div,
                Some("%") => BinaryOp::Rem,
                _ => break,
            };
            self.idx += 1;
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs, self.position(&op_tok));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let Some(op_tok) = self.peek().copied() else {
            return Err(self.err_expected("expression"));
        };
        let op = match self.operator(&op_tok) {
            Some("-") => UnaryOp::Neg,
            Some("+") => UnaryOp::Pos,
            _ => return self.parse_postfix(),
        };
        self.idx += 1;
        let pos = self.position(&op_tok);

        // Fold negative number literals so that i64::MIN can be written.
        if op == UnaryOp::Neg {
            if let Some(t) = self.peek().copied().filter(|t| t.kind == TokenKind::Number) {
                if !self.is_postfix_after(1) {
                    self.idx += 1;
                    let value = self.number(&t, true)?;
                    return Ok(Expr::new(ExprKind::Literal(value), pos));
                }
            }
        }

        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::new(ExprKind::Unary(op, Box::new(operand)), pos))
    }

    fn is_postfix_after(&self, offset: usize) -> bool {
        matches!(
            self.tokens.get(self.idx + offset),
            Some(t) if t.kind == TokenKind::Punct && matches!(self.text(t), "." | "[" | "(")
        )
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.match_symbol(".") {
                let token = match self.peek() {
                    Some(t) if matches!(t.kind, TokenKind::Ident | TokenKind::Number) => *t,
                    _ => return Err(self.err_expected("attribute name")),
                };
                self.idx += 1;
                let name = self.text(&token).to_owned();
                expr = Expr::new(ExprKind::Attr(Box::new(expr), name), self.position(&token));
            } else if self.match_symbol("[") {
                let key = self.parse_expression()?;
                self.expect_symbol("]")?;
                let pos = expr.pos.clone();
                expr = Expr::new(ExprKind::Item(Box::new(expr), Box::new(key)), pos);
            } else if self.match_symbol("(") {
                let args = self.parse_call_args()?;
                let pos = expr.pos.clone();
                expr = Expr::new(ExprKind::Call(Box::new(expr), args), pos);
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.match_symbol(")") {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.match_symbol(")") {
                return Ok(args);
            }
            self.expect_symbol(",")?;
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(token) = self.peek().copied() else {
            return Err(self.err_expected("expression"));
        };
        let pos = self.position(&token);
        let kind = match token.kind {
            TokenKind::Number => {
                self.idx += 1;
                ExprKind::Literal(self.number(&token, false)?)
            }
            TokenKind::String => {
                self.idx += 1;
                ExprKind::Literal(Value::String(self.unescape(&token)?))
            }
            TokenKind::Ident => {
                self.idx += 1;
                match self.text(&token) {
                    "true" | "True" => ExprKind::Literal(Value::Bool(true)),
                    "false" | "False" => ExprKind::Literal(Value::Bool(false)),
                    "nil" | "none" | "None" => ExprKind::Literal(Value::None),
                    "block" if self.is_block_super() => {
                        self.idx += 2;
                        ExprKind::BlockSuper
                    }
                    name => ExprKind::Var(name.to_owned()),
                }
            }
            TokenKind::Punct if self.text(&token) == "(" => {
                self.idx += 1;
                let expr = self.parse_expression()?;
                self.expect_symbol(")")?;
                return Ok(expr);
            }
            _ => return Err(self.err_expected("expression")),
        };
        Ok(Expr::new(kind, pos))
    }

    /// Whether the tokens after `block` are `.super`.
    fn is_block_super(&self) -> bool {
        let dot = self.tokens.get(self.idx);
        let name = self.tokens.get(self.idx + 1);
        match (dot, name) {
            (Some(dot), Some(name)) => {
                dot.kind == TokenKind::Punct
                    && self.text(dot) == "."
                    && name.kind == TokenKind::Ident
                    && matches!(self.text(name), "super" | "Super")
            }
            _ => false,
        }
    }

    fn operator(&self, token: &Token) -> Option<&'p str> {
        (token.kind == TokenKind::Operator).then(|| self.text(token))
    }

    fn number(&self, token: &Token, negative: bool) -> Result<Value> {
        let raw = self.text(token);
        if raw.contains('.') {
            let f: f64 = raw
                .parse()
                .map_err(|_| self.error("invalid float literal", Some(token)))?;
            return Ok(Value::Float(if negative { -f } else { f }));
        }
        let digits = if negative {
            format!("-{raw}")
        } else {
            raw.to_owned()
        };
        digits
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| self.error("integer literal out of range", Some(token)))
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, pos: Position) -> Expr {
    Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), pos)
}
