use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use url::Url;

use crate::error::{ConfigError, ExposeError};

pub const CONTENT_SCHEME: &str = "content";

/// `content://<authority>/<root>/<path>` handle for a file shared with another app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUri(Url);

impl ContentUri {
    pub fn authority(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(Debug, Clone)]
struct ProviderRoot {
    name: String,
    dir: PathBuf,
}

/// Maps files under a fixed set of named directories to content URIs.
#[derive(Debug, Clone)]
pub struct UriExposer {
    authority: String,
    roots: Vec<ProviderRoot>,
}

impl UriExposer {
    /// `authority` is typically `<app identifier>.provider`.
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            roots: Vec::new(),
        }
    }

    pub fn for_package(identifier: &str, suffix: &str) -> Self {
        Self::new(format!("{identifier}.{suffix}"))
    }

    /// Register a named root. Names become the first URI path segment.
    pub fn with_root(
        mut self,
        name: impl Into<String>,
        dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ConfigError::InvalidRootName(name));
        }
        self.roots.retain(|root| root.name != name);
        self.roots.push(ProviderRoot {
            name,
            dir: dir.into(),
        });
        Ok(self)
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Mint a URI for `file`. The file must exist now and sit inside a root.
    ///
    /// Nothing is cached: roots are re-resolved on every call so a root that
    /// is created or moved later is picked up.
    pub fn expose(&self, file: &Path) -> Result<ContentUri, ExposeError> {
        let canonical = canonicalize(file)?;
        if !canonical.is_file() {
            return Err(ExposeError::NotAFile(file.to_path_buf()));
        }

        let (root, relative) = self
            .roots
            .iter()
            .filter_map(|root| {
                let dir = fs::canonicalize(&root.dir).ok()?;
                let relative = canonical.strip_prefix(&dir).ok()?.to_path_buf();
                Some((root, dir.components().count(), relative))
            })
            .max_by_key(|(_, depth, _)| *depth)
            .map(|(root, _, relative)| (root, relative))
            .ok_or_else(|| ExposeError::OutsideRoots(file.to_path_buf()))?;

        let mut url = Url::parse(&format!("{CONTENT_SCHEME}://{}/", self.authority))
            .map_err(|e| ExposeError::Uri(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ExposeError::Uri("content uri cannot be a base".to_string()))?;
            segments.pop_if_empty().push(&root.name);
            for component in relative.components() {
                if let Component::Normal(part) = component {
                    segments.push(&part.to_string_lossy());
                }
            }
        }

        log::debug!("Exposed {} as {}", canonical.display(), url);
        Ok(ContentUri(url))
    }
}

fn canonicalize(file: &Path) -> Result<PathBuf, ExposeError> {
    fs::canonicalize(file).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ExposeError::FileNotFound(file.to_path_buf()),
        _ => ExposeError::Io {
            path: file.to_path_buf(),
            source,
        },
    })
}
