//! Defines a [`Span`] which is used to represent a region in the template
//! source code, and a [`Position`] which ties a span to the template it came
//! from so that errors can point at it long after compilation.

use std::cmp::{max, min};
use std::fmt;
use std::ops::{Index, Range};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub m: usize,
    pub n: usize,
}

/// The identity and full source of a compiled template.
#[derive(Debug)]
pub struct Origin {
    pub identity: String,
    pub source: Arc<str>,
    /// Whether the template was read through the loader, in which case its
    /// identity can be used to resolve relative names.
    pub loaded: bool,
    /// Byte offsets at which each line starts.
    line_starts: Vec<usize>,
}

/// The location of a token within a template.
///
/// Nodes and expressions keep a [`Position`] so that execution errors can
/// report the identity, line, column and the token they occurred near.
#[derive(Clone)]
pub struct Position {
    pub(crate) origin: Arc<Origin>,
    pub(crate) span: Span,
    pub(crate) line: usize,
    pub(crate) col: usize,
}

impl Span {
    pub fn combine(self, other: Self) -> Self {
        let m = min(self.m, other.m);
        let n = max(self.n, other.n);
        Self { m, n }
    }

    pub fn is_empty(&self) -> bool {
        self.m == self.n
    }
}

impl Index<Span> for str {
    type Output = str;

    fn index(&self, span: Span) -> &Self::Output {
        let Span { m, n } = span;
        &self[m..n]
    }
}

impl From<Range<usize>> for Span {
    fn from(r: Range<usize>) -> Self {
        Self {
            m: r.start,
            n: r.end,
        }
    }
}

impl Origin {
    pub fn new(identity: impl Into<String>, source: impl Into<Arc<str>>, loaded: bool) -> Self {
        let source = source.into();
        let line_starts = line_starts(&source);
        Self {
            identity: identity.into(),
            source,
            loaded,
            line_starts,
        }
    }

    /// The line and column of the given byte offset, both starting at 1.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = min(offset, self.source.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts[line - 1];
        let col = self.source[start..offset].chars().count() + 1;
        (line, col)
    }
}

impl Position {
    pub(crate) fn new(origin: &Arc<Origin>, span: Span) -> Self {
        let (line, col) = origin.line_col(span.m);
        Self {
            origin: origin.clone(),
            span,
            line,
            col,
        }
    }

    /// The identity of the template this position belongs to.
    pub fn identity(&self) -> &str {
        &self.origin.identity
    }

    /// The line number, starting at 1.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The column number, starting at 1. Columns count characters.
    pub fn column(&self) -> usize {
        self.col
    }

    /// The source text of the token at this position.
    pub fn near(&self) -> &str {
        &self.origin.source[self.span]
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.origin.identity, self.line, self.col)
    }
}

fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_col(source: &str, offset: usize) -> (usize, usize) {
        Origin::new("<string>", source, false).line_col(offset)
    }

    #[test]
    fn line_col_first_line() {
        assert_eq!(line_col("{{ testFunc(x) }}", 3), (1, 4));
    }

    #[test]
    fn line_col_after_newlines() {
        let source = "a\nbc\n  {{ x }}";
        assert_eq!(line_col(source, 10), (3, 6));
    }

    #[test]
    fn line_col_at_line_boundaries() {
        let source = "a\nbc\n";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 1), (1, 2));
        assert_eq!(line_col(source, 2), (2, 1));
        assert_eq!(line_col(source, 5), (3, 1));
        assert_eq!(line_col(source, 99), (3, 1));
    }

    #[test]
    fn line_col_counts_chars() {
        let source = "привіт {{ x }}";
        let offset = source.find("{{").unwrap();
        assert_eq!(line_col(source, offset), (1, 8));
    }

    #[test]
    fn line_starts_are_built_once() {
        let source: String = (0..50_000).map(|i| format!("line {i} {{{{ x }}}}\n")).collect();
        let origin = Arc::new(Origin::new("big", source.as_str(), false));
        let offset = source.rfind("{{").unwrap();
        let pos = Position::new(&origin, Span::from(offset..offset + 2));
        assert_eq!((pos.line(), pos.column()), (50_000, 12));
    }

    #[test]
    fn position_near() {
        let origin = Arc::new(Origin::new("<string>", "ab {{ name }}", false));
        let pos = Position::new(&origin, Span::from(6..10));
        assert_eq!(pos.near(), "name");
        assert_eq!((pos.line(), pos.column()), (1, 7));
        assert_eq!(pos.identity(), "<string>");
    }
}
