mod helpers;

use std::error::Error as _;
use std::io;

use trellis::{value, ErrorKind, Set, Value};

use crate::helpers::Writer;

#[test]
fn render_to_writer_streams_output() {
    let mut w = Writer::new();
    Set::default()
        .from_string("{% for x in xs %}<{{ x }}>{% endfor %}")
        .unwrap()
        .render_to_writer(&mut w, value! { xs: ["a", "b"] })
        .unwrap();
    assert_eq!(w.into_string(), "<a><b>");
}

#[test]
fn render_from_to_writer_keeps_functions() {
    let mut w = Writer::new();
    let ctx = value! { twice: Value::function(|s: String| s.repeat(2)) };
    Set::default()
        .from_string("{{ twice('ab') }}")
        .unwrap()
        .render_from_to_writer(&mut w, &ctx)
        .unwrap();
    assert_eq!(w.into_string(), "abab");
}

#[test]
fn render_to_writer_io_error() {
    let mut w = Writer::failing_after(2);
    let err = Set::default()
        .from_string("a{{ x }}b{{ x }}c")
        .unwrap()
        .render_to_writer(&mut w, value! { x: 1 })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.message(), "failed to write rendered output");
    let source = err.source().unwrap().downcast_ref::<io::Error>().unwrap();
    assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
    assert_eq!(w.into_string(), "a1");
}

#[test]
fn render_to_writer_template_error_is_kept() {
    let mut w = Writer::new();
    let err = Set::default()
        .from_string("a{{ 1 / 0 }}")
        .unwrap()
        .render_to_writer(&mut w, value! {})
        .unwrap_err();
    assert_eq!(err.message(), "division by zero");
    assert_eq!(w.into_string(), "a");
}
