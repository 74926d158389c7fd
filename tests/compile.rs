use trellis::{value, ErrorKind, Phase, Set, Syntax};

#[test]
fn compile_empty_template() {
    let result = Set::default().from_string("").unwrap().render(value! {}).unwrap();
    assert_eq!(result, "");
}

#[test]
fn compile_err_unclosed_tag() {
    let err = Set::default().from_string("lorem {% if x ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lex);
    assert_eq!(err.phase(), Phase::Compile);
    assert_eq!(
        err.to_string(),
        "[Error (where: compile) in <string> | Line 1 Col 7 near '{%'] unclosed begin tag"
    );
}

#[test]
fn compile_err_unclosed_body() {
    let err = Set::default().from_string("{% if x %}\nabc").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert_eq!(
        err.to_string(),
        "[Error (where: compile) in <string> | Line 1 Col 4 near 'if'] \
         unexpected end of template, expected one of 'elif', 'else', 'endif'"
    );
}

#[test]
fn compile_err_unknown_tag() {
    let err = Set::default().from_string("{% foo %}").unwrap_err();
    assert_eq!(
        err.to_string(),
        "[Error (where: compile) in <string> | Line 1 Col 4 near 'foo'] tag 'foo' does not exist"
    );
}

#[test]
fn compile_err_stray_end_tag() {
    let err = Set::default().from_string("{% endif %}").unwrap_err();
    assert_eq!(err.message(), "tag 'endif' does not exist");
}

#[test]
fn compile_err_empty_expression() {
    let err = Set::default().from_string("{{ }}").unwrap_err();
    assert_eq!(err.message(), "expected an expression");
}

#[test]
fn compile_err_leftover_arguments() {
    let err = Set::default().from_string("{{ a b }}").unwrap_err();
    assert_eq!(err.message(), "unexpected identifier 'b'");
    assert_eq!(err.column(), Some(6));
}

#[test]
fn compile_err_autoescape_argument() {
    let err = Set::default()
        .from_string("{% autoescape maybe %}{% endautoescape %}")
        .unwrap_err();
    assert_eq!(err.message(), "expected 'on' or 'off', found identifier 'maybe'");
}

#[test]
fn compile_err_nesting_too_deep() {
    let set = Set::default();
    let source = format!("{{{{ {}x{} }}}}", "(".repeat(5000), ")".repeat(5000));
    let err = set.from_string(source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert_eq!(err.message(), "expression is nested too deeply (more than 64)");

    let source = "{% if x %}".repeat(5000);
    let err = set.from_string(source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert_eq!(err.message(), "tags are nested too deeply (more than 64)");
    assert_eq!(err.column(), Some(64 * 10 + 4));

    let source = format!("{}{}", "{% if x %}".repeat(10), "{% endif %}".repeat(10));
    assert_eq!(set.from_string(source).unwrap().render(value! { x: true }).unwrap(), "");
}

#[test]
fn compile_err_multiline_position() {
    let err = Set::default()
        .from_string("line one\nline two {{ x|nope }}\n")
        .unwrap_err();
    assert_eq!(err.line(), Some(2));
    assert_eq!(err.column(), Some(15));
    assert_eq!(err.near(), Some("nope"));
}

#[test]
fn compile_err_pretty_form() {
    let err = Set::default().from_string("{{ x|nope }}").unwrap_err();
    let pretty = format!("{err:#}");
    assert!(pretty.contains(" 1 | {{ x|nope }}"));
    assert!(pretty.contains("^^^^ filter 'nope' does not exist"));
}

#[test]
fn compile_custom_syntax() {
    let mut set = Set::default();
    set.set_syntax(
        Syntax::builder()
            .expr("<?", "?>")
            .block("<%", "%>")
            .comment("<#", "#>")
            .build(),
    );
    let result = set
        .from_string("<% for x in xs %><? x ?><# note #><% endfor %>{{ untouched }}")
        .unwrap()
        .render(value! { xs: [1, 2] })
        .unwrap();
    assert_eq!(result, "12{{ untouched }}");
}

#[test]
fn compile_custom_syntax_overlapping_delimiters() {
    let mut set = Set::default();
    set.set_syntax(Syntax::builder().expr("{", "}").block("{%", "%}").build());
    let result = set
        .from_string("{% if ok %}{ name }{% endif %}")
        .unwrap()
        .render(value! { ok: true, name: "x" })
        .unwrap();
    assert_eq!(result, "x");
}
