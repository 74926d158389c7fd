use std::sync::Arc;

use crate::compile::search::Searcher;
use crate::types::span::{Origin, Position, Span};
use crate::types::syntax::Kind;
use crate::{Error, Options, Result};

/// A lexer that tokenizes the template source into distinct chunks so that the
/// parser doesn't have to operate on raw text.
///
/// The whole source is tokenized up front. Whitespace trimming is applied to
/// the raw template tokens afterwards in a separate pass so that it never
/// changes where delimiters were found.
pub struct Lexer<'a> {
    /// The delimiter searcher built from the set's syntax.
    searcher: &'a Searcher,

    /// The template being tokenized.
    origin: &'a Arc<Origin>,

    /// The original template source.
    source: &'a str,

    /// A cursor over the template source.
    cursor: usize,

    /// Tracks the line and column of the last emitted token.
    tracker: Tracker,

    /// The tokens emitted so far.
    tokens: Vec<Token>,
}

/// The kind of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Raw template
    Raw,
    /// Begin expression tag, e.g. `{{`
    BeginExpr,
    /// End expression tag, e.g. `}}`
    EndExpr,
    /// Begin block tag, e.g. `{%`
    BeginBlock,
    /// End block tag, e.g. `%}`
    EndBlock,
    /// Begin comment tag, e.g. `{#`
    BeginComment,
    /// The text between comment tags
    Comment,
    /// End comment tag, e.g. `#}`
    EndComment,
    /// The body of a `{% verbatim %}` block, emitted untouched
    Verbatim,
    /// A name, e.g. `user` or `endif`
    Ident,
    /// A string literal, e.g. `"Hello World!\n"`
    String,
    /// An integer or float literal, e.g. `19` or `0.5`
    Number,
    /// An operator, e.g. `==`, `+` or `|`
    Operator,
    /// Punctuation, e.g. `(`, `.` or `,`
    Punct,
}

/// The unit yielded by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) span: Span,
    pub(crate) line: usize,
    pub(crate) col: usize,
    /// Strip whitespace from the raw template before this token.
    pub(crate) trim_before: bool,
    /// Strip whitespace from the raw template after this token.
    pub(crate) trim_after: bool,
}

struct Tracker {
    offset: usize,
    line: usize,
    col: usize,
}

/// Tokenizes the template and applies whitespace trimming.
pub fn lex(searcher: &Searcher, origin: &Arc<Origin>, options: &Options) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(searcher, origin);
    lexer.lex_all()?;
    let mut tokens = lexer.tokens;
    apply_trim(&mut tokens, &origin.source, options);
    Ok(tokens)
}

impl<'a> Lexer<'a> {
    /// Construct a new lexer.
    pub fn new(searcher: &'a Searcher, origin: &'a Arc<Origin>) -> Self {
        Self {
            searcher,
            origin,
            source: &origin.source,
            cursor: 0,
            tracker: Tracker {
                offset: 0,
                line: 1,
                col: 1,
            },
            tokens: Vec::new(),
        }
    }

    fn lex_all(&mut self) -> Result<()> {
        while self.cursor < self.source.len() {
            // We are within raw template, that means all we have to do is
            // find the next begin tag from `i`. The following diagram helps
            // describe the variable naming.
            //
            // xxxxxxx{{xxxxxxxxx
            //    ^   ^ ^
            //    i   j k
            let i = self.cursor;
            match self.searcher.find_at(self.source, i) {
                Some((kind, j, k)) => {
                    let (tk, trim) = TokenKind::from_kind(kind);
                    if !tk.is_begin_tag() {
                        return Err(self.err_unexpected_token(tk, j..k));
                    }
                    if i < j {
                        self.push(TokenKind::Raw, i..j, false, false);
                    }
                    if tk == TokenKind::BeginBlock && self.lex_verbatim(j, k, trim)? {
                        continue;
                    }
                    let begin = self.push(tk, j..k, trim, false);
                    self.cursor = k;
                    match tk {
                        TokenKind::BeginComment => self.lex_comment(begin)?,
                        _ => self.lex_tag(begin)?,
                    }
                }
                None => {
                    let j = self.source.len();
                    self.push(TokenKind::Raw, i..j, false, false);
                    self.cursor = j;
                }
            }
        }
        Ok(())
    }

    /// Tokenizes the inside of an expression or block tag up to and including
    /// the matching end tag.
    fn lex_tag(&mut self, begin: Token) -> Result<()> {
        let end = begin.kind.pair();
        loop {
            let i = self.cursor;
            let c = match self.source[i..].chars().next() {
                Some(c) => c,
                None => return Err(self.err_unclosed(begin)),
            };

            if c.is_whitespace() {
                self.cursor += c.len_utf8();
                continue;
            }

            if let Some((kind, j)) = self.searcher.starts_with(self.source, i) {
                let (tk, trim) = TokenKind::from_kind(kind);
                if tk == end {
                    self.push(tk, i..j, false, trim);
                    self.cursor = j;
                    return Ok(());
                }
                if tk.is_begin_tag() {
                    return Err(self.err_unclosed(begin));
                }
                return Err(self.err_unexpected_token(tk, i..j));
            }

            let (tk, j) = match c {
                '"' | '\'' => self.lex_string(i, c)?,
                c if c.is_ascii_digit() => self.lex_number(i),
                c if is_ident_start(c) => (TokenKind::Ident, self.lex_while(i, is_ident)),
                c => self.lex_symbol(i, c)?,
            };
            self.push(tk, i..j, false, false);
            self.cursor = j;
        }
    }

    fn lex_comment(&mut self, begin: Token) -> Result<()> {
        // We are between two comment tags {# ... #}, that means all we
        // have to do is find the corresponding end tag.
        //
        // x{#cccccc#}xxxxxx
        //    ^     ^ ^
        //    i     j k
        let i = self.cursor;
        match self
            .searcher
            .find_where(self.source, i, Kind::is_end_comment)
        {
            Some((kind, j, k)) => {
                if i < j {
                    self.push(TokenKind::Comment, i..j, false, false);
                }
                let (tk, trim) = TokenKind::from_kind(kind);
                self.push(tk, j..k, false, trim);
                self.cursor = k;
                Ok(())
            }
            None => Err(self.err_unclosed(begin)),
        }
    }

    /// Handles `{% verbatim %} ... {% endverbatim %}` by emitting the body as
    /// a single token. Returns `false` if the block tag at `j..k` is not a
    /// verbatim tag.
    fn lex_verbatim(&mut self, j: usize, k: usize, trim: bool) -> Result<bool> {
        let q = match self.match_bare_tag(k, "verbatim") {
            Some((_, q)) => q,
            None => return Ok(false),
        };
        let mut from = q;
        while let Some((_, b, c)) = self
            .searcher
            .find_where(self.source, from, Kind::is_begin_block)
        {
            if let Some((end_trim, e)) = self.match_bare_tag(c, "endverbatim") {
                self.push(TokenKind::Verbatim, q..b, trim, end_trim);
                self.cursor = e;
                return Ok(true);
            }
            from = c;
        }
        let pos = Position::new(self.origin, Span::from(j..k));
        Err(Error::lex("unclosed verbatim tag", &pos))
    }

    /// Checks whether the text at `at` is just `name` followed by an end block
    /// tag. Returns whether the end tag trims and the offset after it.
    fn match_bare_tag(&self, at: usize, name: &str) -> Option<(bool, usize)> {
        let i = at + (self.source[at..].len() - self.source[at..].trim_start().len());
        let rest = self.source[i..].strip_prefix(name)?;
        if rest.chars().next().map_or(false, is_ident) {
            return None;
        }
        let j = self.source.len() - rest.trim_start().len();
        match self.searcher.starts_with(self.source, j) {
            Some((kind, e)) if kind.is_end_block() => Some((kind == Kind::EndBlockTrim, e)),
            _ => None,
        }
    }

    fn lex_string(&self, i: usize, quote: char) -> Result<(TokenKind, usize)> {
        let mut iter = self.source[i..].char_indices().map(|(d, c)| (i + d, c));
        iter.next();
        let mut escaped = false;
        for (j, c) in iter {
            match c {
                '\r' | '\n' => return Err(self.err_undelimited_string(i..j)),
                '\\' if !escaped => escaped = true,
                c if c == quote && !escaped => return Ok((TokenKind::String, j + 1)),
                _ => escaped = false,
            }
        }
        Err(self.err_undelimited_string(i..self.source.len()))
    }

    fn lex_number(&self, i: usize) -> (TokenKind, usize) {
        let bytes = self.source.as_bytes();
        let digits = |mut j: usize| {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            j
        };
        let mut j = digits(i);

        // An index in a path like `users.0.name` must not swallow the dot.
        let after_dot = matches!(
            self.tokens.last(),
            Some(t) if t.kind == TokenKind::Punct && &self.source[t.span] == "."
        );
        if !after_dot
            && j + 1 < bytes.len()
            && bytes[j] == b'.'
            && bytes[j + 1].is_ascii_digit()
        {
            j = digits(j + 1);
        }
        (TokenKind::Number, j)
    }

    fn lex_symbol(&self, i: usize, c: char) -> Result<(TokenKind, usize)> {
        const DOUBLE: &[&str] = &["==", "!=", "<>", "<=", ">=", "&&", "||"];
        let rest = &self.source[i..];
        if DOUBLE.iter().any(|op| rest.starts_with(op)) {
            return Ok((TokenKind::Operator, i + 2));
        }
        match c {
            '+' | '-' | '*' | '/' | '%' | '<' | '>' | '!' | '=' | '|' => {
                Ok((TokenKind::Operator, i + 1))
            }
            '(' | ')' | '[' | ']' | ',' | '.' | ':' => Ok((TokenKind::Punct, i + 1)),
            c => Err(self.err_unexpected_character(i..i + c.len_utf8())),
        }
    }

    fn lex_while<P>(&self, i: usize, pred: P) -> usize
    where
        P: Fn(char) -> bool,
    {
        self.source[i..]
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map(|(d, _)| i + d)
            .unwrap_or(self.source.len())
    }

    fn push(&mut self, kind: TokenKind, span: impl Into<Span>, before: bool, after: bool) -> Token {
        let span = span.into();
        let (line, col) = self.tracker.advance(self.source, span.m);
        let token = Token {
            kind,
            span,
            line,
            col,
            trim_before: before,
            trim_after: after,
        };
        self.tokens.push(token);
        token
    }

    fn err_unclosed(&self, begin: Token) -> Error {
        let pos = Position::new(self.origin, begin.span);
        Error::lex(format!("unclosed {}", begin.kind.human()), &pos)
    }

    fn err_unexpected_token(&self, tk: TokenKind, span: impl Into<Span>) -> Error {
        let pos = Position::new(self.origin, span.into());
        Error::lex(format!("unexpected {}", tk.human()), &pos)
    }

    fn err_unexpected_character(&self, span: impl Into<Span>) -> Error {
        let pos = Position::new(self.origin, span.into());
        Error::lex("unexpected character", &pos)
    }

    fn err_undelimited_string(&self, span: impl Into<Span>) -> Error {
        let pos = Position::new(self.origin, span.into());
        Error::lex("undelimited string", &pos)
    }
}

impl Tracker {
    fn advance(&mut self, source: &str, to: usize) -> (usize, usize) {
        if to > self.offset {
            for c in source[self.offset..to].chars() {
                if c == '\n' {
                    self.line += 1;
                    self.col = 1;
                } else {
                    self.col += 1;
                }
            }
            self.offset = to;
        }
        (self.line, self.col)
    }
}

/// Shrinks raw template tokens according to the trim modifiers on their
/// neighbours and the `trim_blocks`/`lstrip_blocks` options.
fn apply_trim(tokens: &mut [Token], source: &str, options: &Options) {
    for idx in 0..tokens.len() {
        if tokens[idx].kind != TokenKind::Raw {
            continue;
        }
        let prev = idx.checked_sub(1).map(|p| tokens[p]);
        let next = tokens.get(idx + 1).copied();
        let Span { mut m, mut n } = tokens[idx].span;

        if let Some(prev) = prev {
            let s = &source[m..n];
            if prev.trim_after {
                m = n - s.trim_start().len();
            } else if options.trim_blocks && prev.kind.closes_block() {
                if s.starts_with("\r\n") {
                    m += 2;
                } else if s.starts_with('\n') {
                    m += 1;
                }
            }
        }

        if let Some(next) = next {
            let s = &source[m..n];
            if next.trim_before {
                n = m + s.trim_end().len();
            } else if options.lstrip_blocks && next.kind.opens_block() {
                let line_start = match s.rfind('\n') {
                    Some(p) => Some(m + p + 1),
                    None if m == 0 || source[..m].ends_with('\n') => Some(m),
                    None => None,
                };
                if let Some(start) = line_start {
                    if source[start..n].chars().all(|c| c == ' ' || c == '\t') {
                        n = start;
                    }
                }
            }
        }

        tokens[idx].span = Span { m, n };
    }
}

impl Token {
    /// The kind of this token.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The line number, starting at 1.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The column number, starting at 1.
    pub fn column(&self) -> usize {
        self.col
    }
}

impl TokenKind {
    pub fn human(&self) -> &'static str {
        match self {
            Self::Raw => "raw template",
            Self::BeginExpr => "begin expression",
            Self::EndExpr => "end expression",
            Self::BeginBlock => "begin tag",
            Self::EndBlock => "end tag",
            Self::BeginComment => "begin comment",
            Self::Comment => "comment",
            Self::EndComment => "end comment",
            Self::Verbatim => "verbatim text",
            Self::Ident => "identifier",
            Self::String => "string",
            Self::Number => "number",
            Self::Operator => "operator",
            Self::Punct => "punctuation",
        }
    }

    /// Returns the corresponding end tag for a begin tag.
    fn pair(&self) -> Self {
        match self {
            Self::BeginExpr => Self::EndExpr,
            Self::BeginBlock => Self::EndBlock,
            Self::BeginComment => Self::EndComment,
            _ => panic!("not a begin tag"),
        }
    }

    fn is_begin_tag(&self) -> bool {
        matches!(
            self,
            Self::BeginExpr | Self::BeginBlock | Self::BeginComment
        )
    }

    fn opens_block(&self) -> bool {
        matches!(self, Self::BeginBlock | Self::Verbatim)
    }

    fn closes_block(&self) -> bool {
        matches!(self, Self::EndBlock | Self::Verbatim)
    }

    fn from_kind(kind: Kind) -> (Self, bool) {
        match kind {
            Kind::BeginExpr => (Self::BeginExpr, false),
            Kind::EndExpr => (Self::EndExpr, false),
            Kind::BeginExprTrim => (Self::BeginExpr, true),
            Kind::EndExprTrim => (Self::EndExpr, true),
            Kind::BeginBlock => (Self::BeginBlock, false),
            Kind::EndBlock => (Self::EndBlock, false),
            Kind::BeginBlockTrim => (Self::BeginBlock, true),
            Kind::EndBlockTrim => (Self::EndBlock, true),
            Kind::BeginComment => (Self::BeginComment, false),
            Kind::EndComment => (Self::EndComment, false),
            Kind::BeginCommentTrim => (Self::BeginComment, true),
            Kind::EndCommentTrim => (Self::EndComment, true),
        }
    }
}

#[cfg(feature = "unicode")]
fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

#[cfg(feature = "unicode")]
fn is_ident(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

#[cfg(not(feature = "unicode"))]
fn is_ident_start(c: char) -> bool {
    matches!(c, 'A'..='Z' | 'a'..='z' | '_')
}

#[cfg(not(feature = "unicode"))]
fn is_ident(c: char) -> bool {
    matches!(c, '0'..='9' | 'A'..='Z' | 'a'..='z' | '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Syntax};

    #[test]
    fn lex_empty() {
        let tokens = lex_default("").unwrap();
        assert_eq!(tokens, []);
    }

    #[test]
    fn lex_raw() {
        let tokens = lex_default("lorem ipsum").unwrap();
        assert_eq!(tokens, [(TokenKind::Raw, "lorem ipsum")]);
    }

    #[test]
    fn lex_expr() {
        let tokens =
            lex_default("lorem {{ user.names[0]|default:'x' == \"a\\\"b\" }} ipsum").unwrap();
        assert_eq!(
            tokens,
            [
                (TokenKind::Raw, "lorem "),
                (TokenKind::BeginExpr, "{{"),
                (TokenKind::Ident, "user"),
                (TokenKind::Punct, "."),
                (TokenKind::Ident, "names"),
                (TokenKind::Punct, "["),
                (TokenKind::Number, "0"),
                (TokenKind::Punct, "]"),
                (TokenKind::Operator, "|"),
                (TokenKind::Ident, "default"),
                (TokenKind::Punct, ":"),
                (TokenKind::String, "'x'"),
                (TokenKind::Operator, "=="),
                (TokenKind::String, "\"a\\\"b\""),
                (TokenKind::EndExpr, "}}"),
                (TokenKind::Raw, " ipsum"),
            ]
        );
    }

    #[test]
    fn lex_path_index_and_float() {
        let tokens = lex_default("{{ a.0.1 + 0.5 }}").unwrap();
        assert_eq!(
            tokens,
            [
                (TokenKind::BeginExpr, "{{"),
                (TokenKind::Ident, "a"),
                (TokenKind::Punct, "."),
                (TokenKind::Number, "0"),
                (TokenKind::Punct, "."),
                (TokenKind::Number, "1"),
                (TokenKind::Operator, "+"),
                (TokenKind::Number, "0.5"),
                (TokenKind::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_block_and_expr() {
        let tokens =
            lex_default("{% if cond %} lorem {{ path.segment }} ipsum {% endif %}").unwrap();
        assert_eq!(
            tokens,
            [
                (TokenKind::BeginBlock, "{%"),
                (TokenKind::Ident, "if"),
                (TokenKind::Ident, "cond"),
                (TokenKind::EndBlock, "%}"),
                (TokenKind::Raw, " lorem "),
                (TokenKind::BeginExpr, "{{"),
                (TokenKind::Ident, "path"),
                (TokenKind::Punct, "."),
                (TokenKind::Ident, "segment"),
                (TokenKind::EndExpr, "}}"),
                (TokenKind::Raw, " ipsum "),
                (TokenKind::BeginBlock, "{%"),
                (TokenKind::Ident, "endif"),
                (TokenKind::EndBlock, "%}"),
            ]
        );
    }

    #[test]
    fn lex_trim_modifiers() {
        let tokens = lex_default("lorem \n {{- x -}} \t\n ipsum").unwrap();
        assert_eq!(
            tokens,
            [
                (TokenKind::Raw, "lorem"),
                (TokenKind::BeginExpr, "{{-"),
                (TokenKind::Ident, "x"),
                (TokenKind::EndExpr, "-}}"),
                (TokenKind::Raw, "ipsum"),
            ]
        );
    }

    #[test]
    fn lex_comment() {
        let tokens = lex_default("lorem {# anything {{ goes }} - # { #} ipsum").unwrap();
        assert_eq!(
            tokens,
            [
                (TokenKind::Raw, "lorem "),
                (TokenKind::BeginComment, "{#"),
                (TokenKind::Comment, " anything {{ goes }} - # { "),
                (TokenKind::EndComment, "#}"),
                (TokenKind::Raw, " ipsum"),
            ]
        );
    }

    #[test]
    fn lex_verbatim() {
        let tokens = lex_default("a {% verbatim %}{{ x }}{% if %}{% endverbatim %} b").unwrap();
        assert_eq!(
            tokens,
            [
                (TokenKind::Raw, "a "),
                (TokenKind::Verbatim, "{{ x }}{% if %}"),
                (TokenKind::Raw, " b"),
            ]
        );
    }

    #[test]
    fn lex_trim_blocks_and_lstrip_blocks() {
        let options = Options {
            trim_blocks: true,
            lstrip_blocks: true,
            ..Options::default()
        };
        let source = "<ul>\n    {% for x in xs %}\n  {{ x }}\n    {% endfor %}\n</ul>";
        let tokens = lex_with(source, &options).unwrap();
        let raws: Vec<_> = tokens
            .iter()
            .filter(|(kind, _)| *kind == TokenKind::Raw)
            .map(|(_, s)| *s)
            .collect();
        assert_eq!(raws, ["<ul>\n", "  ", "\n", "</ul>"]);
    }

    #[test]
    fn lex_positions() {
        let searcher = Searcher::new(&Syntax::default());
        let origin = Arc::new(Origin::new("<string>", "ab\n  {{ name }}", false));
        let tokens = lex(&searcher, &origin, &Options::default()).unwrap();
        let name = tokens.iter().find(|t| t.kind == TokenKind::Ident).unwrap();
        assert_eq!((name.line(), name.column()), (2, 6));
    }

    #[test]
    fn lex_err_unclosed_tag() {
        let err = lex_default("lorem {% if x ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lex);
        assert_eq!(
            err.to_string(),
            "[Error (where: compile) in <string> | Line 1 Col 7 near '{%'] unclosed begin tag"
        );
    }

    #[test]
    fn lex_err_unexpected_end_tag() {
        let err = lex_default("lorem }} ipsum").unwrap_err();
        assert_eq!(err.message(), "unexpected end expression");
    }

    #[test]
    fn lex_err_undelimited_string() {
        let err = lex_default("{{ \"abc }}").unwrap_err();
        assert_eq!(err.message(), "undelimited string");
    }

    #[test]
    fn lex_err_unexpected_character() {
        let err = lex_default("{{ a ; b }}").unwrap_err();
        assert_eq!(err.message(), "unexpected character");
        assert_eq!(err.near(), Some(";"));
    }

    fn lex_default(source: &str) -> Result<Vec<(TokenKind, &str)>> {
        lex_with(source, &Options::default())
    }

    fn lex_with<'s>(source: &'s str, options: &Options) -> Result<Vec<(TokenKind, &'s str)>> {
        let searcher = Searcher::new(&Syntax::default());
        let origin = Arc::new(Origin::new("<string>", source, false));
        let tokens = lex(&searcher, &origin, options)?;
        Ok(tokens
            .into_iter()
            .filter(|t| !(t.kind == TokenKind::Raw && t.span.is_empty()))
            .map(|t| (t.kind, &source[t.span]))
            .collect())
    }
}
