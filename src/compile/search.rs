use crate::types::syntax::{Kind, Syntax};

/// Finds delimiters in template source.
///
/// Matching is leftmost-longest: the earliest match wins and when several
/// patterns match at the same offset the longest one is chosen, so that `{{-`
/// is preferred over `{{`.
#[derive(Debug, Clone)]
pub struct Searcher {
    /// Patterns sorted by length, longest first.
    patterns: Vec<(Kind, String)>,
}

impl Searcher {
    pub fn new(syntax: &Syntax) -> Self {
        let mut patterns = syntax.patterns.clone();
        patterns.sort_by(|(_, a), (_, b)| b.len().cmp(&a.len()));
        Self { patterns }
    }

    /// Returns the kind, start and end of the first delimiter at or after
    /// `at`.
    pub fn find_at(&self, haystack: &str, at: usize) -> Option<(Kind, usize, usize)> {
        self.find_where(haystack, at, |_| true)
    }

    /// Like [`find_at`][Searcher::find_at] but only considers delimiters
    /// for which `pred` returns true.
    pub fn find_where<P>(&self, haystack: &str, at: usize, pred: P) -> Option<(Kind, usize, usize)>
    where
        P: Fn(Kind) -> bool,
    {
        let bytes = haystack.as_bytes();
        (at..bytes.len()).find_map(|i| {
            self.match_at(bytes, i, &pred)
                .map(|(kind, len)| (kind, i, i + len))
        })
    }

    /// Returns the kind and end of the delimiter starting exactly at `at`.
    pub fn starts_with(&self, haystack: &str, at: usize) -> Option<(Kind, usize)> {
        self.match_at(haystack.as_bytes(), at, &|_| true)
            .map(|(kind, len)| (kind, at + len))
    }

    fn match_at<P>(&self, bytes: &[u8], i: usize, pred: &P) -> Option<(Kind, usize)>
    where
        P: Fn(Kind) -> bool,
    {
        let rest = bytes.get(i..)?;
        self.patterns
            .iter()
            .filter(|(kind, _)| pred(*kind))
            .find(|(_, pattern)| rest.starts_with(pattern.as_bytes()))
            .map(|(kind, pattern)| (*kind, pattern.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_at_prefers_longest() {
        let searcher = Searcher::new(&Syntax::default());
        assert_eq!(
            searcher.find_at("abc {{- x }}", 0),
            Some((Kind::BeginExprTrim, 4, 7))
        );
        assert_eq!(
            searcher.find_at("abc {{ x -}}", 5),
            Some((Kind::EndExprTrim, 9, 12))
        );
    }

    #[test]
    fn find_where_filters_kinds() {
        let searcher = Searcher::new(&Syntax::default());
        let found = searcher.find_where("{{ a }} #} x", 0, Kind::is_end_comment);
        assert_eq!(found, Some((Kind::EndComment, 8, 10)));
    }

    #[test]
    fn starts_with_exact_offset() {
        let searcher = Searcher::new(&Syntax::default());
        assert_eq!(searcher.starts_with(" %}", 0), None);
        assert_eq!(searcher.starts_with(" %}", 1), Some((Kind::EndBlock, 3)));
        assert_eq!(searcher.starts_with("", 4), None);
    }
}
