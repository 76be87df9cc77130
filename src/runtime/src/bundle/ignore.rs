//! Ignore file parsing and matching.

use std::path::Path;

use a3s_app_core::error::{AppError, Result};
use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Exclusion patterns read from a bundle's ignore file.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<Pattern>,
}

impl IgnoreRules {
    /// Read rules from `path`. A missing file yields no rules.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(AppError::ArchiveError(format!(
                "Can't read ignore file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Parse ignore file content, one glob per line.
    pub fn parse(content: &str) -> Self {
        let patterns = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(normalize)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match Pattern::new(line) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %line, error = %e, "Skipping invalid ignore pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// First pattern matching a `/`-separated relative name.
    pub fn matching(&self, name: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.matches_with(name, MATCH_OPTIONS))
            .map(Pattern::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Strip leading `./` and `/` plus any trailing `/` so a directory
/// pattern such as `cache/` matches the walked name `cache`.
fn normalize(line: &str) -> &str {
    let mut line = line.trim_end_matches('/');
    loop {
        if let Some(rest) = line.strip_prefix("./") {
            line = rest;
        } else if let Some(rest) = line.strip_prefix('/') {
            line = rest;
        } else {
            return line;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_skips_blank_and_comments() {
        let rules = IgnoreRules::parse("\n# build output\n  \ntarget/*\n*.log\n");
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let rules = IgnoreRules::parse("sub/*\n");
        assert_eq!(rules.matching("sub/b.txt"), Some("sub/*"));
        assert_eq!(rules.matching("sub/deep/c.txt"), None);
        assert_eq!(rules.matching("a.txt"), None);
    }

    #[test]
    fn test_leading_slash_and_dot_stripped() {
        let rules = IgnoreRules::parse("/secrets.env\n./notes/*.md\n");
        assert_eq!(rules.matching("secrets.env"), Some("secrets.env"));
        assert_eq!(rules.matching("notes/todo.md"), Some("notes/*.md"));
    }

    #[test]
    fn test_trailing_slash_matches_directory() {
        let rules = IgnoreRules::parse("cache/\n/build//\n/\n");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.matching("cache"), Some("cache"));
        assert_eq!(rules.matching("build"), Some("build"));
        assert_eq!(rules.matching("cache/a.txt"), None);
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let rules = IgnoreRules::parse("[unclosed\n*.tmp\n");
        assert_eq!(rules.len(), 1);
        assert!(rules.matching("x.tmp").is_some());
    }

    #[test]
    fn test_first_match_wins() {
        let rules = IgnoreRules::parse("*.log\ndebug.*\n");
        assert_eq!(rules.matching("debug.log"), Some("*.log"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let rules = IgnoreRules::load(&dir.path().join(".composeappignores")).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_load_directory_is_archive_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".composeappignores");
        std::fs::create_dir(&path).unwrap();
        let err = IgnoreRules::load(&path).unwrap_err();
        assert!(matches!(err, AppError::ArchiveError(_)), "got {err:?}");
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".composeappignores");
        std::fs::write(&path, "*.bak\n").unwrap();
        let rules = IgnoreRules::load(&path).unwrap();
        assert_eq!(rules.matching("old.bak"), Some("*.bak"));
    }
}
