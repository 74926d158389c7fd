use std::io;

fn main() -> trellis::Result<()> {
    let mut stdout = io::BufWriter::new(io::stdout());

    let ctx = trellis::value! { user: { name: "John Smith" }, langs: ["en", "fr"] };

    trellis::Set::default()
        .from_string("Hello {{ user.name }}! {% for l in langs %}[{{ l }}]{% endfor %}\n")?
        .render_to_writer(&mut stdout, ctx)?;

    Ok(())
}
