//! Canonical library and release records.
//!
//! Every provider normalizes its backend's response shape into these
//! structs. They are built fresh per request and never mutated afterwards.

use regex::Regex;

/// One catalog entry as returned by `list` and `search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySummary {
    pub name: String,
    pub description: Option<String>,
    /// Only populated by search backends that report one.
    pub version: Option<String>,
}

/// Library metadata with its known versions, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub homepage: Option<String>,
    pub info_url: Option<String>,
    pub license: Option<String>,
    pub versions: Vec<String>,
}

/// One resolved release with its downloadable files.
#[derive(Debug, Clone)]
pub struct Release {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub homepage: Option<String>,
    pub info_url: Option<String>,
    pub license: Option<String>,
    /// File paths relative to `base_url`, each starting with `/`.
    pub files: Vec<String>,
    /// Absolute download URLs, one per entry of `files`.
    pub urls: Vec<String>,
    pub base_url: String,
    /// Replaces the default `<name>/<version>` layout under the download
    /// target. Set when that layout would be ambiguous, e.g. scoped names.
    pub dest_dir: Option<String>,
    pub default_file: Option<String>,
    pub package_url: Option<String>,
    pub skip: Option<SkipRule>,
}

/// Identifies files that are listed but must never be downloaded.
#[derive(Debug, Clone)]
pub struct SkipRule {
    pattern: Regex,
}

impl SkipRule {
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }

    pub fn matches(&self, file: &str) -> bool {
        self.pattern.is_match(file)
    }
}
