fn main() -> trellis::Result<()> {
    let set = trellis::Set::default();

    let out = set
        .from_string("Hello {{ name|title }}!")?
        .render(trellis::value! { name: "world" })?;

    println!("{out}");

    Ok(())
}
