//! Module path table: where the script of each plain module lives.

use std::collections::HashMap;

/// Maps module names to script URLs.
///
/// Relative URLs are prefixed with the optional base path; absolute ones
/// (`/x.js`, `scheme://…`) are returned as registered.
#[derive(Clone, Debug, Default)]
pub struct ModulePaths {
    base: String,
    entries: HashMap<String, String>,
}

impl ModulePaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the prefix applied to relative URLs.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Registers (or replaces) the URL of `name`. Returns the previous URL.
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) -> Option<String> {
        self.entries.insert(name.into(), url.into())
    }

    /// URL of `name`, with the base applied.
    pub fn url(&self, name: &str) -> Option<String> {
        let url = self.entries.get(name)?;
        if self.base.is_empty() || url.starts_with('/') || url.contains("://") {
            Some(url.clone())
        } else {
            Some(format!("{}{url}", self.base))
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N, U> FromIterator<(N, U)> for ModulePaths
where
    N: Into<String>,
    U: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (N, U)>>(iter: T) -> Self {
        let mut paths = ModulePaths::new();
        for (name, url) in iter {
            paths.insert(name, url);
        }
        paths
    }
}
