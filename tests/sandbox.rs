use trellis::{value, ErrorKind, MemoryLoader, Phase, Set};

#[test]
fn banned_tag_fails_to_compile() {
    let mut set = Set::default();
    set.ban_tag("include");
    let err = set.from_string("a\n  {% include 'x.html' %}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sandbox);
    assert_eq!(err.phase(), Phase::Compile);
    assert_eq!(
        err.to_string(),
        "[Error (where: compile) in <string> | Line 2 Col 6 near 'include'] \
         usage of tag 'include' is not allowed (sandbox restriction active)"
    );
}

#[test]
fn banned_tag_in_loaded_template() {
    let loader = MemoryLoader::new().with("page.html", "{% set x = 1 %}");
    let mut set = Set::new("s", loader);
    set.ban_tag("set");
    let err = set.from_cache("page.html").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sandbox);
    assert_eq!(err.identity(), Some("page.html"));
}

#[test]
fn banned_tag_in_parent_template() {
    let loader = MemoryLoader::new()
        .with("base.html", "{% for x in xs %}{% endfor %}")
        .with("child.html", r#"{% extends "base.html" %}"#);
    let mut set = Set::new("s", loader);
    set.ban_tag("for");
    let err = set.from_cache("child.html").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sandbox);
    assert_eq!(err.identity(), Some("base.html"));
}

#[test]
fn banned_filter_compiles_but_fails_to_render() {
    let mut set = Set::default();
    set.ban_filter("upper");
    let template = set.from_string("{{ name|upper }}").unwrap();
    let err = template.render(value! { name: "x" }).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sandbox);
    assert_eq!(err.phase(), Phase::Execution);
    assert_eq!(
        err.to_string(),
        "[Error (where: execution) in <string> | Line 1 Col 9 near 'upper'] \
         usage of filter 'upper' is not allowed (sandbox restriction active)"
    );
}

#[test]
fn banned_filter_in_untaken_branch_is_harmless() {
    let mut set = Set::default();
    set.ban_filter("upper");
    let result = set
        .from_string("{% if false %}{{ name|upper }}{% endif %}ok")
        .unwrap()
        .render(value! { name: "x" })
        .unwrap();
    assert_eq!(result, "ok");
}

#[test]
fn banned_filter_in_filter_tag() {
    let mut set = Set::default();
    set.ban_filter("lower");
    let err = set
        .from_string("{% filter lower %}X{% endfilter %}")
        .unwrap()
        .render(value! {})
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sandbox);
}

#[test]
fn unknown_names_are_not_sandbox_errors() {
    let set = Set::default();
    let err = set.from_string("{% frobnicate %}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert_eq!(err.message(), "tag 'frobnicate' does not exist");

    let err = set.from_string("{{ x|frobnicate }}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert_eq!(err.message(), "filter 'frobnicate' does not exist");
}
