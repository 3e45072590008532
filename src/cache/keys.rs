//! Cache key definitions.

use std::fmt;

/// Key of a cached page: `<prefix>:<path>`.
///
/// The query string is not part of the key, so `/?page=2` shares the entry
/// of `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey(String);

impl PageKey {
    pub fn new(prefix: &str, path: &str) -> Self {
        Self(format!("{prefix}:{path}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_prefix_and_path() {
        let key = PageKey::new("index_page", "/");
        assert_eq!(key.as_str(), "index_page:/");
        assert_eq!(key.to_string(), "index_page:/");
    }
}
