//! Output sinks and escaping.
//!
//! Rendering writes to a [`Formatter`], a [`std::fmt::Write`] façade over
//! either a [`String`] or an arbitrary [`std::io::Write`] buffer. Custom
//! directives receive one in [`TagNode::execute`][crate::TagNode::execute].
//!
//! Every variable node passes its value through the set's escaper unless the
//! value is [`Value::Safe`][crate::Value::Safe] or autoescaping is off. The
//! default escaper is [`escape_html`]. A different one can be installed with
//! [`Set::set_escaper`][crate::Set::set_escaper]:
//!
//! ```
//! use std::fmt::Write;
//! use trellis::{fmt, Set};
//!
//! fn escape_ascii(f: &mut fmt::Formatter<'_>, s: &str) -> std::fmt::Result {
//!     write!(f, "{}", s.as_bytes().escape_ascii())
//! }
//!
//! let mut set = Set::default();
//! set.set_escaper(escape_ascii);
//! ```

use std::fmt;
use std::io;

/// An escaping function or closure.
pub(crate) type EscapeFn = dyn Fn(&mut Formatter<'_>, &str) -> fmt::Result + Send + Sync + 'static;

/// A [`std::fmt::Write`] façade.
pub struct Formatter<'a> {
    buf: &'a mut (dyn fmt::Write + 'a),
}

pub(crate) struct Writer<W> {
    writer: W,
    err: Option<io::Error>,
}

impl<'a> Formatter<'a> {
    pub(crate) fn with_string(buf: &'a mut String) -> Self {
        Self { buf }
    }

    pub(crate) fn with_writer<W>(buf: &'a mut Writer<W>) -> Self
    where
        W: io::Write,
    {
        Self { buf }
    }
}

impl fmt::Write for Formatter<'_> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        fmt::Write::write_str(self.buf, s)
    }

    #[inline]
    fn write_char(&mut self, c: char) -> fmt::Result {
        fmt::Write::write_char(self.buf, c)
    }

    #[inline]
    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        fmt::Write::write_fmt(self.buf, args)
    }
}

impl<W> Writer<W>
where
    W: io::Write,
{
    pub fn new(writer: W) -> Self {
        Self { writer, err: None }
    }

    pub fn take_err(&mut self) -> Option<io::Error> {
        self.err.take()
    }
}

impl<W> fmt::Write for Writer<W>
where
    W: io::Write,
{
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.writer.write_all(s.as_bytes()).map_err(|e| {
            self.err = Some(e);
            fmt::Error
        })
    }
}

/// Escapes `<`, `>`, `&`, `"` and `'` as HTML entities.
pub fn escape_html(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    let mut last = 0;
    for (i, b) in s.bytes().enumerate() {
        let entity = match b {
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'&' => "&amp;",
            b'"' => "&quot;",
            b'\'' => "&#39;",
            _ => continue,
        };
        fmt::Write::write_str(f, &s[last..i])?;
        fmt::Write::write_str(f, entity)?;
        last = i + 1;
    }
    fmt::Write::write_str(f, &s[last..])
}
