use trellis::{MemoryLoader, Set, Value};

fn main() -> trellis::Result<()> {
    let loader = MemoryLoader::new()
        .with(
            "base.html",
            "<title>{% block title %}My Site{% endblock %}</title>\n\
             {% include \"nav.html\" %}\n\
             {% block content %}{% endblock %}\n\
             <footer>{{ year }}</footer>",
        )
        .with(
            "nav.html",
            "<nav>{% for item in menu %}<a>{{ item|capfirst }}</a>{% endfor %}</nav>",
        )
        .with(
            "index.html",
            r#"{% extends "base.html" %}
{% block title %}Home | {{ block.super }}{% endblock %}
{% block content %}Welcome, {{ shout(visitor|default:"stranger") }}.{% endblock %}"#,
        );

    let mut set = Set::new("site", loader);
    set.add_global("year", 2024);
    set.add_global("shout", Value::function(|s: String| s.to_uppercase()));

    let template = set.from_cache("index.html")?;
    let ctx = trellis::value! { menu: ["home", "blog"], visitor: "<Ana>" };

    println!("{}", template.render(&ctx)?);

    for (name, html) in template.render_blocks(&ctx, &["title", "content"])? {
        println!("{name}: {html}");
    }

    Ok(())
}
