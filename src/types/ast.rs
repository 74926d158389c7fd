//! The syntax tree produced by the parser.
//!
//! The tree is immutable once parsed and shared read-only between concurrent
//! renders of the same template.

use std::fmt;

use crate::tags::TagNode;
use crate::types::span::Position;
use crate::Value;

/// A sequence of nodes, for example the body of a directive.
#[derive(Debug, Default)]
pub struct NodeList {
    pub(crate) nodes: Vec<Node>,
}

#[derive(Debug)]
pub enum Node {
    /// Raw template text, written verbatim.
    Text(String),

    /// An inline expression, e.g. `{{ user.name|lower }}`.
    Variable(Expr),

    /// A directive, e.g. `{% if cond %} ... {% endif %}`.
    Tag(Tag),
}

pub struct Tag {
    pub name: String,
    pub pos: Position,
    pub node: Box<dyn TagNode>,
}

/// A parsed expression.
///
/// Custom directives get these from
/// [`Parser::parse_expression`][crate::Parser::parse_expression] and evaluate
/// them at render time with [`Expr::evaluate`].
#[derive(Debug)]
pub struct Expr {
    pub(crate) kind: ExprKind,
    pub(crate) pos: Position,
}

#[derive(Debug)]
pub(crate) enum ExprKind {
    /// A literal value, e.g. `"John"`, `1.5` or `true`.
    Literal(Value),

    /// A variable looked up in the execution context.
    Var(String),

    /// Attribute access, e.g. `user.name` or `users.0`.
    Attr(Box<Expr>, String),

    /// Subscript access, e.g. `users[i]`.
    Item(Box<Expr>, Box<Expr>),

    /// A call of a host function, e.g. `add(1, 2)` or `user.greet("hi")`.
    Call(Box<Expr>, Vec<Expr>),

    /// A filter application, e.g. `name|default:"anon"`.
    Filter(Box<Expr>, FilterCall),

    Unary(UnaryOp, Box<Expr>),

    Binary(BinaryOp, Box<Expr>, Box<Expr>),

    /// An inline conditional, e.g. `a if cond else b`.
    Cond {
        then: Box<Expr>,
        cond: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },

    /// Renders the parent definition of the enclosing block.
    BlockSuper,
}

#[derive(Debug)]
pub(crate) struct FilterCall {
    pub name: String,
    pub arg: Option<Box<Expr>>,
    pub pos: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    And,
    Or,
}

impl NodeList {
    pub(crate) fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Expr {
    pub(crate) fn new(kind: ExprKind, pos: Position) -> Self {
        Self { kind, pos }
    }

    /// The position of the token errors in this expression are reported at.
    pub fn position(&self) -> &Position {
        &self.pos
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("name", &self.name)
            .field("pos", &self.pos)
            .finish_non_exhaustive()
    }
}
