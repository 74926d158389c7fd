use std::fs;

use trellis::{value, ErrorKind, FileSystemLoader, LoadError, Loader, Set};

fn write(dir: &tempfile::TempDir, name: &str, source: &str) {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, source).unwrap();
}

#[test]
fn file_system_loader_renders_inheritance() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "base.html", "<h1>{% block title %}{% endblock %}</h1>{% include \"partials/footer.html\" %}");
    write(&dir, "partials/footer.html", "<footer>{{ year }}</footer>");
    write(&dir, "pages/about.html", r#"{% extends "../base.html" %}{% block title %}About{% endblock %}"#);

    let set = Set::new("fs", FileSystemLoader::new(dir.path()));
    let result = set
        .from_cache("pages/about.html")
        .unwrap()
        .render(value! { year: 2020 })
        .unwrap();
    assert_eq!(result, "<h1>About</h1><footer>2020</footer>");
}

#[test]
fn file_system_loader_prefers_relative_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "nav.html", "root nav");
    write(&dir, "admin/nav.html", "admin nav");
    write(&dir, "admin/index.html", r#"{% include "nav.html" %}"#);
    write(&dir, "index.html", r#"{% include "nav.html" %}"#);

    let set = Set::new("fs", FileSystemLoader::new(dir.path()));
    let admin = set.from_cache("admin/index.html").unwrap().render(value! {}).unwrap();
    assert_eq!(admin, "admin nav");
    let root = set.from_cache("index.html").unwrap().render(value! {}).unwrap();
    assert_eq!(root, "root nav");
}

#[test]
fn file_system_loader_identities_are_paths() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "a/b.html", "");
    let loader = FileSystemLoader::new(dir.path());

    let identity = loader.resolve("a/./b.html", None).unwrap();
    assert_eq!(identity, dir.path().join("a/b.html").to_string_lossy());
    assert_eq!(loader.resolve("b.html", Some(&identity)).unwrap(), identity);
    assert_eq!(loader.read(&identity).unwrap(), "");
}

#[test]
fn file_system_loader_missing_template() {
    let dir = tempfile::tempdir().unwrap();
    let loader = FileSystemLoader::new(dir.path());
    assert!(matches!(
        loader.resolve("missing.html", None),
        Err(LoadError::NotFound(name)) if name == "missing.html"
    ));

    let set = Set::new("fs", loader);
    let err = set.from_cache("missing.html").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Load);
    assert_eq!(
        err.to_string(),
        "[Error (where: compile)] template 'missing.html' not found"
    );
}

#[test]
fn file_system_loader_sees_changes_after_invalidate() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "x.html", "one");
    let set = Set::new("fs", FileSystemLoader::new(dir.path()));
    assert_eq!(set.from_cache("x.html").unwrap().render(value! {}).unwrap(), "one");

    write(&dir, "x.html", "two");
    assert_eq!(set.from_cache("x.html").unwrap().render(value! {}).unwrap(), "one");
    assert!(set.invalidate("x.html"));
    assert_eq!(set.from_cache("x.html").unwrap().render(value! {}).unwrap(), "two");
}

#[test]
fn load_error_source_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let set = Set::new("fs", FileSystemLoader::new(dir.path()));
    let err = set.from_cache("missing.html").unwrap_err();
    let source = std::error::Error::source(&err).unwrap();
    assert!(matches!(
        source.downcast_ref::<LoadError>(),
        Some(LoadError::NotFound(_))
    ));
}
