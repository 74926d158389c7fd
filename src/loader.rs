//! Template sources.
//!
//! A [`Loader`] turns the name used in `extends`, `include` or
//! [`Set::from_cache`][crate::Set::from_cache] into a canonical identity and
//! reads the source for an identity. The cache is keyed by identity, so two
//! names that resolve to the same identity share one compiled template.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// An error returned by a [`Loader`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("failed to read template '{name}'")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Resolves template names and reads template sources.
pub trait Loader: Send + Sync {
    /// Returns the canonical identity for `name`.
    ///
    /// `relative_to` is the identity of the template that refers to `name`,
    /// if it was itself loaded through this loader.
    fn resolve(&self, name: &str, relative_to: Option<&str>) -> Result<String, LoadError>;

    /// Reads the source of a resolved identity.
    fn read(&self, identity: &str) -> Result<String, LoadError>;
}

/// A loader over templates held in memory.
///
/// Names are `/` separated paths. A name starting with `./` or `../` is
/// relative to the directory of the template referring to it.
///
/// # Examples
///
/// ```
/// use trellis::{MemoryLoader, Set};
///
/// let loader = MemoryLoader::new()
///     .with("base.html", "<title>{% block title %}{% endblock %}</title>")
///     .with("pages/home.html", r#"{% extends "base.html" %}{% block title %}Home{% endblock %}"#);
/// let set = Set::new("site", loader);
/// let template = set.from_cache("pages/home.html")?;
/// assert_eq!(template.render_from(&trellis::Value::None)?, "<title>Home</title>");
/// # Ok::<(), trellis::Error>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    templates: HashMap<String, String>,
}

/// A loader over a directory.
///
/// A name is looked up relative to the directory of the template referring to
/// it first, and then relative to the base directory. Identities are the
/// resulting file paths.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    base: PathBuf,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template.
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(normalize(&name.into()), source.into());
    }

    /// Adds a template, builder style.
    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.add(name, source);
        self
    }
}

impl Loader for MemoryLoader {
    fn resolve(&self, name: &str, relative_to: Option<&str>) -> Result<String, LoadError> {
        let identity = match relative_to {
            Some(base) if name.starts_with("./") || name.starts_with("../") => {
                let dir = base.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
                normalize(&format!("{dir}/{name}"))
            }
            _ => normalize(name),
        };
        if self.templates.contains_key(&identity) {
            Ok(identity)
        } else {
            Err(LoadError::NotFound(name.to_owned()))
        }
    }

    fn read(&self, identity: &str) -> Result<String, LoadError> {
        self.templates
            .get(identity)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(identity.to_owned()))
    }
}

/// Collapses `.` and `..` segments and duplicate separators.
fn normalize(name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in name.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    parts.join("/")
}

impl FileSystemLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn candidates(&self, name: &str, relative_to: Option<&str>) -> Vec<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return vec![path.to_owned()];
        }
        let mut candidates = Vec::with_capacity(2);
        if let Some(dir) = relative_to.and_then(|r| Path::new(r).parent()) {
            candidates.push(clean(&dir.join(path)));
        }
        candidates.push(clean(&self.base.join(path)));
        candidates
    }
}

impl Loader for FileSystemLoader {
    fn resolve(&self, name: &str, relative_to: Option<&str>) -> Result<String, LoadError> {
        self.candidates(name, relative_to)
            .into_iter()
            .find(|path| path.is_file())
            .map(|path| path.to_string_lossy().into_owned())
            .ok_or_else(|| LoadError::NotFound(name.to_owned()))
    }

    fn read(&self, identity: &str) -> Result<String, LoadError> {
        fs::read_to_string(identity).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(identity.to_owned()),
            _ => LoadError::Io {
                name: identity.to_owned(),
                source,
            },
        })
    }
}

/// Collapses `.` and `..` components without touching the filesystem.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            c => out.push(c.as_os_str()),
        }
    }
    out
}
