use std::sync::Arc;

use crate::compile::lex::{Token, TokenKind};
use crate::types::ast::{Node, NodeList, Tag};
use crate::types::span::{Origin, Position};
use crate::types::template::CompiledTemplate;
use crate::{Error, ErrorKind, Phase, Result, Set};

/// How deeply expressions and tag bodies may nest.
pub(crate) const MAX_NESTING: usize = 64;

/// The state shared by every parser of a single compilation.
pub(crate) struct CompileEnv<'p> {
    pub set: &'p Set,
    pub origin: Arc<Origin>,
    /// The identities of the templates whose compilation led to this one
    /// through `extends`, ending with this template.
    pub ancestry: &'p [String],
}

/// What the document parser learns about the template while parsing.
#[derive(Default)]
pub(crate) struct Document {
    pub blocks: Vec<(String, Arc<NodeList>)>,
    pub parent: Option<Arc<CompiledTemplate>>,
    /// The number of tags dispatched so far.
    tags: usize,
    /// The tags whose body is currently being parsed.
    open: Vec<Token>,
}

/// A recursive descent parser over a token stream.
///
/// There are two kinds of parser. The document parser walks the whole
/// template and is handed to a tag's parse function so it can consume the
/// tag's body with [`wrap_until`][Parser::wrap_until]. An argument parser
/// only sees the tokens between a tag's name and its end delimiter, and is
/// used with the expression helpers such as
/// [`parse_expression`][Parser::parse_expression].
pub struct Parser<'p> {
    pub(crate) env: &'p CompileEnv<'p>,
    pub(crate) tokens: &'p [Token],
    pub(crate) idx: usize,
    /// The current expression nesting depth.
    pub(crate) depth: usize,
    /// The token errors are reported at once the input runs out.
    anchor: Option<Token>,
    doc: Option<Document>,
}

impl<'p> Parser<'p> {
    pub(crate) fn document(env: &'p CompileEnv<'p>, tokens: &'p [Token]) -> Self {
        Self {
            env,
            tokens,
            idx: 0,
            depth: 0,
            anchor: None,
            doc: Some(Document::default()),
        }
    }

    fn arguments(&self, tokens: &'p [Token], anchor: Token) -> Parser<'p> {
        Parser {
            env: self.env,
            tokens,
            idx: 0,
            depth: 0,
            anchor: Some(anchor),
            doc: None,
        }
    }

    /// Parses the whole template.
    pub(crate) fn parse_document(mut self) -> Result<(NodeList, Document)> {
        let mut nodes = Vec::new();
        while self.idx < self.tokens.len() {
            if let Some(node) = self.parse_node()? {
                nodes.push(node);
            }
        }
        let doc = self.doc.take().unwrap_or_default();
        Ok((NodeList::new(nodes), doc))
    }

    fn parse_node(&mut self) -> Result<Option<Node>> {
        let token = self.tokens[self.idx];
        self.idx += 1;
        match token.kind {
            TokenKind::Raw | TokenKind::Verbatim => {
                if token.span.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Node::Text(self.text(&token).to_owned())))
                }
            }
            TokenKind::BeginComment | TokenKind::Comment | TokenKind::EndComment => Ok(None),
            TokenKind::BeginExpr => self.parse_variable(token).map(Some),
            TokenKind::BeginBlock => self.parse_tag(token).map(Some),
            kind => Err(self.error(format!("unexpected {}", kind.human()), Some(&token))),
        }
    }

    fn parse_variable(&mut self, begin: Token) -> Result<Node> {
        let tokens = self.tokens;
        let end = self.closing(self.idx, TokenKind::EndExpr, &begin)?;
        let mut args = self.arguments(&tokens[self.idx..end], begin);
        self.idx = end + 1;
        if args.remaining() == 0 {
            return Err(args.error("expected an expression", Some(&begin)));
        }
        let expr = args.parse_expression()?;
        args.finish()?;
        Ok(Node::Variable(expr))
    }

    fn parse_tag(&mut self, begin: Token) -> Result<Node> {
        let tokens = self.tokens;
        let name_tok = match tokens.get(self.idx) {
            Some(t) if t.kind == TokenKind::Ident => *t,
            Some(t) => {
                let msg = format!("expected tag name, found {}", t.kind.human());
                return Err(self.error(msg, Some(t)));
            }
            None => return Err(self.error("expected tag name", Some(&begin))),
        };
        let end = self.closing(self.idx + 1, TokenKind::EndBlock, &begin)?;
        let args = self.arguments(&tokens[self.idx + 1..end], name_tok);
        self.idx = end + 1;
        self.dispatch(name_tok, args)
    }

    /// Looks up the parse function for the tag and runs it.
    fn dispatch(&mut self, name_tok: Token, mut args: Parser<'p>) -> Result<Node> {
        let set = self.env.set;
        let name = self.text(&name_tok);
        let pos = self.position(&name_tok);

        if set.banned_tags.contains(name) {
            let msg = format!("usage of tag '{name}' is not allowed (sandbox restriction active)");
            return Err(Error::sandbox(msg, Phase::Compile, &pos));
        }
        let parse = match set.tags.get(name) {
            Some(parse) => parse.clone(),
            None => return Err(Error::compile(format!("tag '{name}' does not exist"), &pos)),
        };

        if let Some(doc) = &mut self.doc {
            if doc.open.len() >= MAX_NESTING {
                let msg = format!("tags are nested too deeply (more than {MAX_NESTING})");
                return Err(Error::compile(msg, &pos));
            }
            doc.tags += 1;
            doc.open.push(name_tok);
        }
        let node = parse(self, &name_tok, &mut args);
        if let Some(doc) = &mut self.doc {
            doc.open.pop();
        }
        let node = node?;
        args.finish()?;

        Ok(Node::Tag(Tag {
            name: name.to_owned(),
            pos,
            node,
        }))
    }

    /// Returns the index of the first token of the given kind at or after
    /// `from`.
    fn closing(&self, from: usize, kind: TokenKind, begin: &Token) -> Result<usize> {
        self.tokens[from.min(self.tokens.len())..]
            .iter()
            .position(|t| t.kind == kind)
            .map(|i| from + i)
            .ok_or_else(|| self.error(format!("unclosed {}", begin.kind.human()), Some(begin)))
    }

    /// Parses nodes until one of the named tags is found.
    ///
    /// Returns the parsed body, the name of the tag that ended it and a
    /// parser over that tag's arguments. Only available on the document
    /// parser passed to a tag's parse function.
    ///
    /// ```text
    /// {% if cond %} ... {% else %} ... {% endif %}
    ///               ^^^ first call stops at `else`
    ///                              ^^^ second call stops at `endif`
    /// ```
    pub fn wrap_until(&mut self, names: &[&str]) -> Result<(NodeList, String, Parser<'p>)> {
        if self.doc.is_none() {
            return Err(self.error("tag bodies cannot be parsed from tag arguments", None));
        }
        let tokens = self.tokens;
        let mut nodes = Vec::new();
        loop {
            let token = match tokens.get(self.idx) {
                Some(t) => *t,
                None => return Err(self.err_unclosed_body(names)),
            };
            if token.kind == TokenKind::BeginBlock {
                if let Some(name_tok) = tokens.get(self.idx + 1).filter(|t| t.kind == TokenKind::Ident) {
                    let name = self.text(name_tok);
                    if names.contains(&name) {
                        let end = self.closing(self.idx + 2, TokenKind::EndBlock, &token)?;
                        let args = self.arguments(&tokens[self.idx + 2..end], *name_tok);
                        self.idx = end + 1;
                        return Ok((NodeList::new(nodes), name.to_owned(), args));
                    }
                }
            }
            if let Some(node) = self.parse_node()? {
                nodes.push(node);
            }
        }
    }

    fn err_unclosed_body(&self, names: &[&str]) -> Error {
        let expected = match names {
            [name] => format!("'{name}'"),
            names => {
                let quoted: Vec<_> = names.iter().map(|n| format!("'{n}'")).collect();
                format!("one of {}", quoted.join(", "))
            }
        };
        let opener = self.doc.as_ref().and_then(|d| d.open.last());
        let msg = format!("unexpected end of template, expected {expected}");
        self.error(msg, opener.or(self.tokens.last()))
    }

    /// Records a named block of the template being compiled.
    pub fn register_block(&mut self, name: &str, body: Arc<NodeList>, token: &Token) -> Result<()> {
        let pos = self.position(token);
        let doc = match &mut self.doc {
            Some(doc) => doc,
            None => return Err(Error::compile("blocks can only be registered while parsing a template body", &pos)),
        };
        if doc.blocks.iter().any(|(n, _)| n == name) {
            return Err(Error::compile(format!("block '{name}' is defined more than once"), &pos));
        }
        doc.blocks.push((name.to_owned(), body));
        Ok(())
    }

    /// Makes the named template the parent of the template being compiled.
    ///
    /// Must be called from the first tag of the template, at most once. The
    /// parent is compiled (or fetched from the cache) immediately.
    pub fn set_parent(&mut self, name: &str, token: &Token) -> Result<()> {
        let pos = self.position(token);
        let tag = self.text(token);
        let doc = match &self.doc {
            Some(doc) => doc,
            None => return Err(Error::compile(format!("'{tag}' can only be used in a template body"), &pos)),
        };
        if doc.parent.is_some() {
            return Err(Error::compile(format!("'{tag}' can only be used once per template"), &pos));
        }
        if doc.tags > 1 || doc.open.len() > 1 {
            return Err(Error::compile(format!("'{tag}' must be the first tag in the template"), &pos));
        }

        let parent = self
            .env
            .set
            .load_parent(name, &self.env.origin, self.env.ancestry, &pos)?;
        if let Some(doc) = &mut self.doc {
            doc.parent = Some(parent);
        }
        Ok(())
    }

    /// The identity of the template being compiled.
    pub fn identity(&self) -> &str {
        &self.env.origin.identity
    }

    /// Returns the next token without consuming it.
    pub fn peek(&self) -> Option<&'p Token> {
        self.tokens.get(self.idx)
    }

    /// Consumes and returns the next token.
    pub fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.idx).copied();
        if token.is_some() {
            self.idx += 1;
        }
        token
    }

    /// The number of tokens left.
    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.idx)
    }

    /// The source text of a token.
    pub fn text(&self, token: &Token) -> &'p str {
        let env: &'p CompileEnv<'p> = self.env;
        &env.origin.source[token.span]
    }

    /// Whether the next token is the identifier `name`.
    pub fn peek_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Some(t) if t.kind == TokenKind::Ident && self.text(t) == name)
    }

    /// Consumes the next token if it is the identifier `name`.
    pub fn match_ident(&mut self, name: &str) -> bool {
        let found = self.peek_ident(name);
        if found {
            self.idx += 1;
        }
        found
    }

    /// Consumes an identifier and returns its text.
    pub fn expect_ident(&mut self) -> Result<&'p str> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => {
                self.idx += 1;
                Ok(self.text(t))
            }
            _ => Err(self.err_expected("identifier")),
        }
    }

    /// Whether the next token is the operator or punctuation `sym`.
    pub fn peek_symbol(&self, sym: &str) -> bool {
        matches!(
            self.peek(),
            Some(t) if matches!(t.kind, TokenKind::Operator | TokenKind::Punct) && self.text(t) == sym
        )
    }

    /// Consumes the next token if it is the operator or punctuation `sym`.
    pub fn match_symbol(&mut self, sym: &str) -> bool {
        let found = self.peek_symbol(sym);
        if found {
            self.idx += 1;
        }
        found
    }

    pub fn expect_symbol(&mut self, sym: &str) -> Result<()> {
        if self.match_symbol(sym) {
            Ok(())
        } else {
            Err(self.err_expected(&format!("'{sym}'")))
        }
    }

    /// Consumes a string literal and returns its unescaped value.
    pub fn expect_string(&mut self) -> Result<String> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::String => {
                self.idx += 1;
                self.unescape(t)
            }
            _ => Err(self.err_expected("string")),
        }
    }

    /// Fails if any argument tokens are left unconsumed.
    pub fn finish(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(t) => {
                let msg = format!("unexpected {} '{}'", t.kind.human(), self.text(t));
                Err(self.error(msg, Some(t)))
            }
        }
    }

    /// The position of a token in the template being compiled.
    pub fn position(&self, token: &Token) -> Position {
        Position::new(&self.env.origin, token.span)
    }

    /// Constructs a compile error at `token`, or at the current token when
    /// none is given.
    pub fn error(&self, msg: impl Into<String>, token: Option<&Token>) -> Error {
        let token = token
            .or_else(|| self.peek())
            .or(self.anchor.as_ref())
            .or_else(|| self.tokens.last());
        match token {
            Some(t) => Error::compile(msg, &self.position(t)),
            None => Error::new(ErrorKind::Compile, Phase::Compile, msg).with_identity(self.identity()),
        }
    }

    pub(crate) fn err_expected(&self, what: &str) -> Error {
        match self.peek() {
            Some(t) => {
                let msg = format!("expected {what}, found {} '{}'", t.kind.human(), self.text(t));
                self.error(msg, Some(t))
            }
            None => self.error(format!("expected {what}, found end of tag"), None),
        }
    }

    /// Resolves escape sequences in a string literal token.
    pub(crate) fn unescape(&self, token: &Token) -> Result<String> {
        let raw = self.text(token);
        let inner = &raw[1..raw.len() - 1];
        if !inner.contains('\\') {
            return Ok(inner.to_owned());
        }
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(c @ ('\\' | '"' | '\'')) => out.push(c),
                Some(c) => {
                    return Err(self.error(format!("unknown escape sequence '\\{c}'"), Some(token)));
                }
                None => return Err(self.error("undelimited string", Some(token))),
            }
        }
        Ok(out)
    }
}
