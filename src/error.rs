use std::cmp::max;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;

#[cfg(feature = "unicode")]
use unicode_width::UnicodeWidthStr;

use crate::types::span::{Position, Span};

/// A convenient type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed delimiters or tokens.
    Lex,
    /// A grammar violation, an unknown or duplicate name, or a cyclic
    /// `extends` chain.
    Compile,
    /// Use of a directive or filter that is banned in the set.
    Sandbox,
    /// A failure while rendering, for example a host function error or an
    /// exceeded include depth.
    Execution,
    /// The loader could not provide a template.
    Load,
}

/// Whether an error happened while compiling or while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Compile,
    Execution,
}

/// An error that can occur during template compilation or rendering.
///
/// The [`Display`][fmt::Display] implementation renders a single line:
///
/// ```text
/// [Error (where: execution) in <string> | Line 1 Col 4 near 'func'] something went wrong
/// ```
///
/// Use the alternate form (`{:#}`) to additionally print the offending source
/// line with the token underlined.
#[derive(Clone)]
pub struct Error {
    kind: ErrorKind,
    phase: Phase,
    msg: String,
    identity: Option<String>,
    pos: Option<Position>,
    source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, phase: Phase, msg: impl Into<String>) -> Self {
        Self {
            kind,
            phase,
            msg: msg.into(),
            identity: None,
            pos: None,
            source: None,
        }
    }

    pub(crate) fn at(kind: ErrorKind, phase: Phase, msg: impl Into<String>, pos: &Position) -> Self {
        Self {
            kind,
            phase,
            msg: msg.into(),
            identity: Some(pos.identity().to_owned()),
            pos: Some(pos.clone()),
            source: None,
        }
    }

    pub(crate) fn lex(msg: impl Into<String>, pos: &Position) -> Self {
        Self::at(ErrorKind::Lex, Phase::Compile, msg, pos)
    }

    /// Constructs a compile error at the given position.
    pub fn compile(msg: impl Into<String>, pos: &Position) -> Self {
        Self::at(ErrorKind::Compile, Phase::Compile, msg, pos)
    }

    /// Constructs an execution error at the given position.
    ///
    /// This is useful when implementing custom directives.
    pub fn execution(msg: impl Into<String>, pos: &Position) -> Self {
        Self::at(ErrorKind::Execution, Phase::Execution, msg, pos)
    }

    pub(crate) fn sandbox(msg: impl Into<String>, phase: Phase, pos: &Position) -> Self {
        Self::at(ErrorKind::Sandbox, phase, msg, pos)
    }

    pub(crate) fn with_identity(mut self, identity: &str) -> Self {
        if self.identity.is_none() {
            self.identity = Some(identity.to_owned());
        }
        self
    }

    /// Attaches a position if the error does not carry one yet.
    pub(crate) fn or_at(mut self, pos: &Position) -> Self {
        if self.pos.is_none() {
            self.identity = Some(pos.identity().to_owned());
            self.pos = Some(pos.clone());
        }
        self
    }

    pub(crate) fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub(crate) fn with_boxed_source(mut self, source: Box<dyn StdError + Send + Sync>) -> Self {
        self.source = Some(Arc::from(source));
        self
    }

    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether this error occurred during compilation or rendering.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The identity of the template the error occurred in, if known.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// The line number of the offending token, if known.
    pub fn line(&self) -> Option<usize> {
        self.pos.as_ref().map(Position::line)
    }

    /// The column number of the offending token, if known.
    pub fn column(&self) -> Option<usize> {
        self.pos.as_ref().map(Position::column)
    }

    /// The source text of the offending token, if known.
    pub fn near(&self) -> Option<&str> {
        self.pos.as_ref().map(Position::near)
    }

    /// The bare message, without any location information.
    pub fn message(&self) -> &str {
        &self.msg
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self::new(ErrorKind::Execution, Phase::Execution, msg.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::new(
            ErrorKind::Execution,
            Phase::Execution,
            "failed to write rendered output",
        )
        .with_source(err)
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Self::new(
            ErrorKind::Execution,
            Phase::Execution,
            "failed to write rendered output",
        )
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile => f.write_str("compile"),
            Self::Execution => f.write_str("execution"),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:#}")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Error (where: {})", self.phase)?;
        if let Some(identity) = &self.identity {
            write!(f, " in {identity}")?;
        }
        if let Some(pos) = &self.pos {
            write!(
                f,
                " | Line {} Col {} near '{}'",
                pos.line(),
                pos.column(),
                pos.near()
            )?;
        }
        write!(f, "] {}", self.msg)?;
        if f.alternate() {
            if let Some(pos) = &self.pos {
                fmt_pretty(&self.msg, &pos.origin.source, pos.span, f)?;
            }
        }
        Ok(())
    }
}

fn fmt_pretty(msg: &str, source: &str, span: Span, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let lines: Vec<_> = source.split_terminator('\n').collect();
    let (line, col) = to_line_col(&lines, span.m);
    let token = source[span].lines().next().unwrap_or_default();
    let width = max(1, text_width(token));
    let code = lines
        .get(line)
        .or_else(|| lines.last())
        .copied()
        .unwrap_or_default();

    let num = (line + 1).to_string();
    let pad = text_width(&num);
    let pipe = "|";
    let underline = "^".repeat(width);

    write!(
        f,
        "\n \
        {0:pad$} {pipe}\n \
        {num:>} {pipe} {code}\n \
        {0:pad$} {pipe} {underline:>width$} {msg}\n",
        "",
        pad = pad,
        pipe = pipe,
        num = num,
        code = code,
        underline = underline,
        width = col + width,
        msg = msg
    )
}

/// Returns the zero based line and display column of a byte offset.
fn to_line_col(lines: &[&str], offset: usize) -> (usize, usize) {
    let mut n = 0;
    for (i, line) in lines.iter().enumerate() {
        let len = line.len() + 1;
        if n + len > offset {
            let end = (offset - n).min(line.len());
            let col = line.get(..end).map(text_width).unwrap_or(end);
            return (i, col);
        }
        n += len;
    }
    let last = lines.len().saturating_sub(1);
    (last, lines.last().map(|l| text_width(l)).unwrap_or(0))
}

#[cfg(feature = "unicode")]
fn text_width(s: &str) -> usize {
    s.width()
}

#[cfg(not(feature = "unicode"))]
fn text_width(s: &str) -> usize {
    s.chars().count()
}
