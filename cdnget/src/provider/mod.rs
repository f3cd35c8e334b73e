//! CDN provider abstraction
//!
//! This module provides the [`Provider`] trait and implementations for the
//! supported CDN services. Each backend exposes a different API shape (a
//! JSON REST API, a full-text search index, an HTML-embedded JSON blob, a
//! scraped catalog page); the providers normalize all of them into the
//! canonical records in [`crate::record`].
//!
//! # Registry
//!
//! For dispatch by service code, use the [`ProviderRegistry`]:
//!
//! ```ignore
//! use cdnget::provider::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new()?;
//! let provider = registry.get("cdnjs").expect("known code");
//! let release = provider.get("jquery", "2.2.4")?;
//! ```

mod cdnjs;
mod google;
mod jsdelivr;
mod unpkg;

pub use cdnjs::CdnjsProvider;
pub use google::GoogleCdnProvider;
pub use jsdelivr::JsdelivrProvider;
pub use unpkg::UnpkgProvider;

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use url::form_urlencoded;

use crate::error::{Error, Result};
use crate::record::{Library, LibrarySummary, Release};
use crate::transport::{ReqwestTransport, Transport, TransportConfig};

/// Static descriptor of one CDN service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderInfo {
    /// Short code used to select the provider, e.g. "cdnjs".
    pub code: &'static str,
    pub site_url: &'static str,
    pub api_url: Option<&'static str>,
    pub cdn_url: Option<&'static str>,
}

/// Trait for resolving libraries and releases on one CDN service.
///
/// Library names and versions are validated before they are interpolated
/// into any outbound URL; malformed input fails with
/// [`Error::InvalidLibraryName`] or [`Error::InvalidVersionNumber`] without
/// a single network exchange.
pub trait Provider {
    /// Static descriptor of this provider.
    fn info(&self) -> ProviderInfo;

    /// Full catalog of the service.
    ///
    /// Backends that cannot enumerate without a query return
    /// [`Error::ListNotSupported`], distinct from an empty catalog.
    fn list(&self) -> Result<Vec<LibrarySummary>>;

    /// Catalog entries matching a glob pattern (`*` is the only wildcard).
    ///
    /// The default implementation filters [`Provider::list`]; backends
    /// with a native search call override it.
    fn search(&self, pattern: &str) -> Result<Vec<LibrarySummary>> {
        let rexp = glob_to_regex(pattern)?;
        let mut entries = self.list()?;
        entries.retain(|entry| rexp.is_match(&entry.name));
        Ok(entries)
    }

    /// Metadata and known versions (newest first) for one library.
    fn find(&self, library: &str) -> Result<Library>;

    /// File manifest for one exact version.
    fn get(&self, library: &str, version: &str) -> Result<Release>;

    /// Most recent version of a library.
    ///
    /// The default implementation takes the first entry of
    /// [`Provider::find`]'s version list; backends with a cheaper lookup
    /// override it.
    fn latest_version(&self, library: &str) -> Result<String> {
        let found = self.find(library)?;
        found
            .versions
            .first()
            .cloned()
            .ok_or_else(|| Error::VersionNotFound {
                library: library.to_string(),
                version: "latest".to_string(),
            })
    }
}

/// Fixed, ordered table of the supported providers.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderRegistry {
    /// Builds the registry with default transport configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(&TransportConfig::default())
    }

    /// Builds the registry with custom transport configuration.
    pub fn with_config(config: &TransportConfig) -> Result<Self> {
        let providers: Vec<Box<dyn Provider>> = vec![
            Box::new(CdnjsProvider::new(ReqwestTransport::with_config(config)?)),
            Box::new(JsdelivrProvider::new(ReqwestTransport::with_config(config)?)),
            Box::new(UnpkgProvider::new(ReqwestTransport::with_config(config)?)),
            Box::new(GoogleCdnProvider::new(ReqwestTransport::with_config(
                config,
            )?)),
        ];
        Ok(Self { providers })
    }

    /// Looks up a provider by its short code.
    pub fn get(&self, code: &str) -> Option<&dyn Provider> {
        self.providers
            .iter()
            .find(|provider| provider.info().code == code)
            .map(|provider| provider.as_ref())
    }

    /// Providers in registration order.
    pub fn providers(&self) -> &[Box<dyn Provider>] {
        &self.providers
    }
}

/// Translates a `*` glob into an anchored, case-insensitive regex.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    RegexBuilder::new(&format!("^{}$", escaped.join(".*")))
        .case_insensitive(true)
        .build()
        .map_err(|_| Error::InvalidLibraryName(pattern.to_string()))
}

fn simple_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[-.\w]+$").unwrap())
}

fn scoped_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(@[-.\w]+/)?[-.\w]+$").unwrap())
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+(\.\d+)+([-.\w]+)?$").unwrap())
}

fn validate_library(library: &str, allow_scoped: bool) -> Result<()> {
    let pattern = if allow_scoped {
        scoped_name_pattern()
    } else {
        simple_name_pattern()
    };
    if pattern.is_match(library) {
        Ok(())
    } else {
        Err(Error::InvalidLibraryName(library.to_string()))
    }
}

fn validate_version(version: &str) -> Result<()> {
    if version_pattern().is_match(version) {
        Ok(())
    } else {
        Err(Error::InvalidVersionNumber(version.to_string()))
    }
}

/// Toggles a trailing `js`/`.js` on the name, the usual cause of a typo'd
/// lookup ("jquery.js" for the library "jqueryjs" and vice versa).
fn js_alias_hint(library: &str) -> Option<String> {
    if let Some(stem) = library.strip_suffix(".js") {
        Some(format!("{}js", stem))
    } else if let Some(stem) = library.strip_suffix("js") {
        Some(format!("{}.js", stem))
    } else {
        None
    }
}

fn library_not_found(library: &str) -> Error {
    Error::LibraryNotFound {
        library: library.to_string(),
        hint: None,
    }
}

fn library_not_found_hinted(library: &str) -> Error {
    Error::LibraryNotFound {
        library: library.to_string(),
        hint: js_alias_hint(library),
    }
}

/// Maps a 404 on a library-addressed URL to "library not found"; every
/// other outcome passes through.
fn fetch_or_not_found(result: Result<Vec<u8>>, library: &str) -> Result<Vec<u8>> {
    match result {
        Err(Error::Http { status: 404, .. }) => Err(library_not_found(library)),
        other => other,
    }
}

/// Percent-encodes a library name for use in a single URL path segment.
fn encode_name(library: &str) -> String {
    form_urlencoded::byte_serialize(library.as_bytes()).collect()
}

/// Archive URL of an npm package. Scoped packages keep the scope in the
/// registry path but use the bare name in the tarball filename.
fn npm_package_url(library: &str, version: &str) -> String {
    let basename = library.rsplit('/').next().unwrap_or(library);
    format!(
        "https://registry.npmjs.org/{}/-/{}-{}.tgz",
        library, basename, version
    )
}

fn parse_json<T: serde::de::DeserializeOwned>(url: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::UnexpectedPayload {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Deserialize)]
struct FlatListing {
    #[serde(default)]
    files: Vec<FlatFile>,
    default: Option<String>,
}

#[derive(Deserialize)]
struct FlatFile {
    name: String,
}

/// Fetches the flat file listing of an npm package version from the
/// data.jsdelivr API. A 404 here means the package exists but the
/// requested version does not.
fn fetch_npm_flat_listing<T: Transport>(
    transport: &T,
    library: &str,
    version: &str,
    headers: &[(&str, &str)],
) -> Result<(Vec<String>, Option<String>)> {
    let url = format!(
        "https://data.jsdelivr.com/v1/package/npm/{}@{}/flat",
        library, version
    );
    let body = match transport.get_with_headers(&url, headers) {
        Err(Error::Http { status: 404, .. }) => {
            return Err(Error::VersionNotFound {
                library: library.to_string(),
                version: version.to_string(),
            });
        }
        other => other?,
    };
    let listing: FlatListing = parse_json(&url, &body)?;
    let files = listing.files.into_iter().map(|f| f.name).collect();
    Ok((files, listing.default))
}
