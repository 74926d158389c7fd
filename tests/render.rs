use trellis::{value, Options, Set, Value};

fn render(source: &str, ctx: Value) -> String {
    Set::default()
        .from_string(source)
        .unwrap()
        .render_from(&ctx)
        .unwrap()
}

#[test]
fn render_inline_expr_scalars() {
    assert_eq!(render("lorem {{ ipsum }}", value! { ipsum: true }), "lorem True");
    assert_eq!(render("lorem {{ ipsum }}", value! { ipsum: false }), "lorem False");
    assert_eq!(render("lorem {{ ipsum }}", value! { ipsum: 123 }), "lorem 123");
    assert_eq!(render("lorem {{ ipsum }}", value! { ipsum: 1.5 }), "lorem 1.5");
    assert_eq!(render("lorem {{ ipsum }}", value! { ipsum: "dolor" }), "lorem dolor");
}

#[test]
fn render_inline_expr_missing_is_empty() {
    assert_eq!(render("lorem {{ ipsum }}.", value! {}), "lorem .");
    assert_eq!(render("{{ a.b.c }}", value! { a: {} }), "");
}

#[test]
fn render_inline_expr_none() {
    assert_eq!(render("[{{ x }}]", value! { x: Value::None }), "[]");
}

#[test]
fn render_inline_expr_list() {
    assert_eq!(render("{{ xs }}", value! { xs: ["a", 1] }), "['a', 1]");
}

#[test]
fn render_inline_expr_attr_and_index() {
    let ctx = value! {
        user: { name: "John", langs: ["en", "fr"] },
        key: "name",
    };
    assert_eq!(render("{{ user.name }}", ctx.clone()), "John");
    assert_eq!(render("{{ user.langs.1 }}", ctx.clone()), "fr");
    assert_eq!(render("{{ user.langs[0] }}", ctx.clone()), "en");
    assert_eq!(render("{{ user[key] }}", ctx.clone()), "John");
    assert_eq!(render("{{ user.langs[5] }}", ctx), "");
}

#[test]
fn render_inline_expr_arithmetic() {
    assert_eq!(render("{{ 1 + 2 * 3 }}", value! {}), "7");
    assert_eq!(render("{{ (1 + 2) * 3 }}", value! {}), "9");
    assert_eq!(render("{{ 7 / 2 }}", value! {}), "3");
    assert_eq!(render("{{ 7 % 4 }}", value! {}), "3");
    assert_eq!(render("{{ 1.5 * 2 }}", value! {}), "3");
    assert_eq!(render("{{ n - 1 }}", value! { n: 10 }), "9");
    assert_eq!(render("{{ -n }}", value! { n: 10 }), "-10");
}

#[test]
fn render_inline_expr_concatenation() {
    assert_eq!(render("{{ a + b }}", value! { a: "foo", b: "bar" }), "foobar");
    assert_eq!(render("{{ a + 1 }}", value! { a: "v" }), "v1");
}

#[test]
fn render_inline_expr_logic() {
    let ctx = value! { a: true, b: false, xs: [1, 2, 3] };
    assert_eq!(render("{{ a and b }}", ctx.clone()), "False");
    assert_eq!(render("{{ a or b }}", ctx.clone()), "True");
    assert_eq!(render("{{ not b }}", ctx.clone()), "True");
    assert_eq!(render("{{ 2 in xs }}", ctx.clone()), "True");
    assert_eq!(render("{{ 5 not in xs }}", ctx.clone()), "True");
    assert_eq!(render("{{ 1 < 2 && 2 >= 2 }}", ctx.clone()), "True");
    assert_eq!(render("{{ 'yes' if a else 'no' }}", ctx.clone()), "yes");
    assert_eq!(render("{{ 'yes' if b else 'no' }}", ctx.clone()), "no");
    assert_eq!(render("[{{ 'yes' if b }}]", ctx), "[]");
}

#[test]
fn render_autoescape_escapes_strings() {
    let ctx = value! { x: "<b>Tom & 'Jerry'</b>" };
    assert_eq!(
        render("{{ x }}", ctx.clone()),
        "&lt;b&gt;Tom &amp; &#39;Jerry&#39;&lt;/b&gt;"
    );
    assert_eq!(render("{{ x|safe }}", ctx), "<b>Tom & 'Jerry'</b>");
}

#[test]
fn render_autoescape_leaves_safe_values() {
    let ctx = value! { x: Value::safe("<br>") };
    assert_eq!(render("{{ x }}", ctx), "<br>");
}

#[test]
fn render_autoescape_tag() {
    let ctx = value! { x: "<i>" };
    assert_eq!(
        render("{% autoescape off %}{{ x }}{% endautoescape %}{{ x }}", ctx.clone()),
        "<i>&lt;i&gt;"
    );
    assert_eq!(
        render(
            "{% autoescape off %}{% autoescape on %}{{ x }}{% endautoescape %}{{ x }}{% endautoescape %}",
            ctx
        ),
        "&lt;i&gt;<i>"
    );
}

#[test]
fn render_autoescape_disabled_for_set() {
    let mut set = Set::default();
    set.set_autoescape(false);
    let result = set
        .from_string("{{ x }}")
        .unwrap()
        .render_from(&value! { x: "<i>" })
        .unwrap();
    assert_eq!(result, "<i>");
}

#[test]
fn render_custom_escaper() {
    let mut set = Set::default();
    set.set_escaper(|f, s| {
        let escaped = s.replace('\'', "''");
        std::fmt::Write::write_str(f, &escaped)
    });
    let result = set
        .from_string("'{{ x }}'")
        .unwrap()
        .render_from(&value! { x: "it's" })
        .unwrap();
    assert_eq!(result, "'it''s'");
}

#[test]
fn render_comment() {
    assert_eq!(render("a{# {{ nothing }} #}b", value! {}), "ab");
}

#[test]
fn render_verbatim() {
    assert_eq!(
        render("{% verbatim %}{{ x }}{% if %}{% endverbatim %}", value! { x: 1 }),
        "{{ x }}{% if %}"
    );
}

#[test]
fn render_whitespace_control() {
    let ctx = value! { x: "X" };
    assert_eq!(render("a  {{- x -}}  b", ctx.clone()), "aXb");
    assert_eq!(render("a\n  {%- if true %}\n{{ x }}{% endif -%}\n b", ctx), "a\nXb");
}

#[test]
fn render_trim_and_lstrip_blocks() {
    let mut set = Set::default();
    set.set_options(Options {
        trim_blocks: true,
        lstrip_blocks: true,
        ..Options::default()
    });
    let result = set
        .from_string("<ul>\n  {% for x in xs %}\n  <li>{{ x }}</li>\n  {% endfor %}\n</ul>")
        .unwrap()
        .render_from(&value! { xs: [1, 2] })
        .unwrap();
    assert_eq!(result, "<ul>\n  <li>1</li>\n  <li>2</li>\n</ul>");
}

#[test]
fn render_if_elif_else() {
    let source = "{% if n > 10 %}big{% elif n > 5 %}medium{% else %}small{% endif %}";
    assert_eq!(render(source, value! { n: 20 }), "big");
    assert_eq!(render(source, value! { n: 7 }), "medium");
    assert_eq!(render(source, value! { n: 1 }), "small");
}

#[test]
fn render_if_truthiness() {
    let source = "{% if x %}yes{% else %}no{% endif %}";
    assert_eq!(render(source, value! { x: "" }), "no");
    assert_eq!(render(source, value! { x: "a" }), "yes");
    assert_eq!(render(source, value! { x: 0 }), "no");
    assert_eq!(render(source, value! { x: [] }), "no");
    assert_eq!(render(source, value! { x: [0] }), "yes");
    assert_eq!(render(source, value! { x: {} }), "no");
    assert_eq!(render(source, value! {}), "no");
}

#[test]
fn render_for_loop() {
    let result = render(
        "{% for x in xs %}{{ forloop.Counter }}:{{ x }}{% if not forloop.Last %}, {% endif %}{% endfor %}",
        value! { xs: ["a", "b", "c"] },
    );
    assert_eq!(result, "1:a, 2:b, 3:c");
}

#[test]
fn render_for_loop_counters() {
    let result = render(
        "{% for x in xs %}[{{ forloop.Counter0 }} {{ forloop.Revcounter }} {{ forloop.Revcounter0 }} {{ forloop.First }}]{% endfor %}",
        value! { xs: ["a", "b"] },
    );
    assert_eq!(result, "[0 2 1 True][1 1 0 False]");
}

#[test]
fn render_for_loop_reversed() {
    let result = render("{% for x in xs reversed %}{{ x }}{% endfor %}", value! { xs: [1, 2, 3] });
    assert_eq!(result, "321");
}

#[test]
fn render_for_loop_empty() {
    let source = "{% for x in xs %}{{ x }}{% empty %}nothing{% endfor %}";
    assert_eq!(render(source, value! { xs: [] }), "nothing");
    assert_eq!(render(source, value! {}), "nothing");
    assert_eq!(render(source, value! { xs: [1] }), "1");
}

#[test]
fn render_for_loop_map_is_sorted() {
    let result = render(
        "{% for k, v in m %}{{ k }}={{ v }};{% endfor %}",
        value! { m: { b: 2, c: 3, a: 1 } },
    );
    assert_eq!(result, "a=1;b=2;c=3;");
}

#[test]
fn render_for_loop_list_with_index() {
    let result = render("{% for i, x in xs %}{{ i }}{{ x }}{% endfor %}", value! { xs: ["a", "b"] });
    assert_eq!(result, "0a1b");
}

#[test]
fn render_for_loop_string() {
    assert_eq!(render("{% for c in s %}{{ c }}.{% endfor %}", value! { s: "abc" }), "a.b.c.");
}

#[test]
fn render_for_loop_nested_parentloop() {
    let result = render(
        "{% for row in rows %}{% for x in row %}{{ forloop.Parentloop.Counter }}{{ x }} {% endfor %}{% endfor %}",
        value! { rows: [["a", "b"], ["c"]] },
    );
    assert_eq!(result, "1a 1b 2c ");
}

#[test]
fn render_for_loop_scope_is_popped() {
    let result = render(
        "{% for x in xs %}{% set y = x %}{% endfor %}[{{ x }}{{ y }}]",
        value! { xs: [1, 2] },
    );
    assert_eq!(result, "[]");
}

#[test]
fn render_set() {
    let result = render("{% set greeting = 'Hello ' + name %}{{ greeting }}!", value! { name: "Ana" });
    assert_eq!(result, "Hello Ana!");
}

#[test]
fn render_set_inside_if_is_visible_after() {
    let result = render("{% if true %}{% set x = 1 %}{% endif %}{{ x }}", value! {});
    assert_eq!(result, "1");
}

#[test]
fn render_with() {
    let ctx = value! { user: { name: "Ana" }, a: "outer" };
    assert_eq!(
        render("{% with a=user.name b=2 %}{{ a }}{{ b }}{% endwith %}{{ a }}", ctx.clone()),
        "Ana2outer"
    );
    assert_eq!(
        render("{% with user.name as n %}{{ n }}{% endwith %}[{{ n }}]", ctx),
        "Ana[]"
    );
}

#[test]
fn render_filter_tag() {
    let result = render(
        "{% filter upper|cut:' ' %}hello {{ name }}{% endfilter %}",
        value! { name: "bob" },
    );
    assert_eq!(result, "HELLOBOB");
}

#[test]
fn render_globals_are_shadowed_by_context() {
    let mut set = Set::default();
    set.add_global("site", "example.org");
    set.add_global("who", "global");
    let result = set
        .from_string("{{ site }} {{ who }}")
        .unwrap()
        .render_from(&value! { who: "local" })
        .unwrap();
    assert_eq!(result, "example.org local");
}

#[test]
fn render_context_from_serde_struct() {
    #[derive(serde::Serialize)]
    struct Ctx {
        title: &'static str,
        tags: Vec<&'static str>,
    }
    let result = Set::default()
        .from_string("{{ title }}: {{ tags|join:', ' }}")
        .unwrap()
        .render(Ctx {
            title: "Post",
            tags: vec!["rust", "web"],
        })
        .unwrap();
    assert_eq!(result, "Post: rust, web");
}

#[test]
fn render_context_must_be_a_map() {
    let err = Set::default()
        .from_string("{{ x }}")
        .unwrap()
        .render_from(&Value::from(1))
        .unwrap_err();
    assert_eq!(err.message(), "render context must be a map, found integer");
}

#[test]
fn render_err_division_by_zero() {
    let err = Set::default()
        .from_string("{{ 1 / n }}")
        .unwrap()
        .render_from(&value! { n: 0 })
        .unwrap_err();
    assert_eq!(err.kind(), trellis::ErrorKind::Execution);
    assert_eq!(err.message(), "division by zero");
}

#[test]
fn render_to_writer() {
    let mut buf = Vec::new();
    Set::default()
        .from_string("Hello {{ name }}!")
        .unwrap()
        .render_to_writer(&mut buf, value! { name: "world" })
        .unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "Hello world!");
}

#[test]
fn template_is_reusable() {
    let set = Set::default();
    let template = set.from_string("{{ n }}").unwrap();
    for n in 0..3 {
        assert_eq!(template.render(value! { n: n }).unwrap(), n.to_string());
    }
}
