//! unpkg provider.
//!
//! Search and package metadata come from the npms.io API; the version list
//! is scraped out of the `window.__DATA__` blob embedded in the unpkg
//! browse page. Requests against unpkg itself carry the `x-spiferack: 1`
//! header so the backend answers with the JSON the site frontend gets.
//!
//! # API Endpoints
//!
//! - Search:   `https://api.npms.io/v2/search?q={pattern}&size=250`
//! - Metadata: `https://api.npms.io/v2/package/{name}`
//! - Browse:   `https://unpkg.com/browse/{name}/`
//! - Files:    `https://data.jsdelivr.com/v1/package/npm/{name}@{version}/flat`
//! - CDN:      `https://unpkg.com/{name}@{version}/{file}`

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{Library, LibrarySummary, Release, SkipRule};
use crate::transport::Transport;

use super::{
    encode_name, fetch_npm_flat_listing, fetch_or_not_found, glob_to_regex, library_not_found,
    npm_package_url, parse_json, validate_library, validate_version, Provider, ProviderInfo,
};

const CODE: &str = "unpkg";
const SITE_URL: &str = "https://unpkg.com/";
const API_URL: &str = "https://api.npms.io/v2";
const SPIFERACK_HEADERS: &[(&str, &str)] = &[("x-spiferack", "1")];

/// Provider backed by unpkg.com and the npms.io package index.
pub struct UnpkgProvider<T: Transport> {
    transport: T,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    package: PackageSummary,
}

#[derive(Deserialize)]
struct PackageSummary {
    name: String,
    description: Option<String>,
    version: Option<String>,
}

#[derive(Deserialize)]
struct MetadataResponse {
    collected: Collected,
}

#[derive(Deserialize)]
struct Collected {
    metadata: Metadata,
}

#[derive(Deserialize)]
struct Metadata {
    name: Option<String>,
    description: Option<String>,
    version: Option<String>,
    keywords: Option<Vec<String>>,
    license: Option<String>,
    links: Option<Links>,
}

#[derive(Deserialize)]
struct Links {
    homepage: Option<String>,
    npm: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddedData {
    #[serde(rename = "availableVersions", default)]
    available_versions: Vec<String>,
}

// The browse page inlines its state as a single-line JSON assignment.
fn data_script_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<script>window\.__DATA__\s*=\s*(.*?)</script>").unwrap())
}

fn ds_store_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\.DS_Store$").unwrap())
}

impl<T: Transport> UnpkgProvider<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn fetch_metadata(&self, library: &str) -> Result<Metadata> {
        let url = format!("{}/package/{}", API_URL, encode_name(library));
        let body = fetch_or_not_found(
            self.transport.get_with_headers(&url, SPIFERACK_HEADERS),
            library,
        )?;
        let response: MetadataResponse = parse_json(&url, &body)?;
        Ok(response.collected.metadata)
    }

    /// Versions listed on the browse page, most recent first. Falls back
    /// to the single version from the package metadata when the embedded
    /// data block is absent or unreadable.
    fn scrape_versions(&self, library: &str, metadata: &Metadata) -> Result<Vec<String>> {
        let url = format!("{}browse/{}/", SITE_URL, library);
        let body = fetch_or_not_found(
            self.transport.get_with_headers(&url, SPIFERACK_HEADERS),
            library,
        )?;
        let page = String::from_utf8_lossy(&body);
        let scraped = data_script_pattern()
            .captures(&page)
            .and_then(|caps| serde_json::from_str::<EmbeddedData>(&caps[1]).ok());
        match scraped {
            Some(data) => {
                let mut versions = data.available_versions;
                versions.reverse();
                Ok(versions)
            }
            None => {
                debug!(library, "browse page carried no version data");
                Ok(metadata.version.clone().into_iter().collect())
            }
        }
    }
}

impl<T: Transport> Provider for UnpkgProvider<T> {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            code: CODE,
            site_url: SITE_URL,
            api_url: Some(API_URL),
            cdn_url: None,
        }
    }

    fn list(&self) -> Result<Vec<LibrarySummary>> {
        Err(Error::ListNotSupported {
            code: CODE.to_string(),
        })
    }

    fn search(&self, pattern: &str) -> Result<Vec<LibrarySummary>> {
        let url = format!("{}/search?q={}&size=250", API_URL, pattern);
        let body = self.transport.get_with_headers(&url, SPIFERACK_HEADERS)?;
        let response: SearchResponse = parse_json(&url, &body)?;
        debug!(results = response.results.len(), pattern, "npms search");

        let rexp = glob_to_regex(pattern)?;
        Ok(response
            .results
            .into_iter()
            .map(|result| result.package)
            .filter(|package| rexp.is_match(&package.name))
            .map(|package| LibrarySummary {
                name: package.name,
                description: package.description,
                version: package.version,
            })
            .collect())
    }

    fn find(&self, library: &str) -> Result<Library> {
        validate_library(library, true)?;
        let metadata = self.fetch_metadata(library)?;
        let versions = self.scrape_versions(library, &metadata)?;
        let homepage = metadata
            .links
            .as_ref()
            .and_then(|links| links.homepage.clone().or_else(|| links.npm.clone()));
        Ok(Library {
            name: metadata.name.unwrap_or_else(|| library.to_string()),
            description: metadata.description,
            tags: metadata.keywords.unwrap_or_default(),
            homepage,
            info_url: Some(format!("{}browse/{}/", SITE_URL, library)),
            license: metadata.license,
            versions,
        })
    }

    fn get(&self, library: &str, version: &str) -> Result<Release> {
        validate_library(library, true)?;
        validate_version(version)?;
        let found = self.find(library)?;

        let (files, default_file) =
            fetch_npm_flat_listing(&self.transport, library, version, SPIFERACK_HEADERS)?;
        let base_url = format!("{}{}@{}", SITE_URL, library, version);
        Ok(Release {
            name: library.to_string(),
            version: version.to_string(),
            description: found.description,
            tags: found.tags,
            homepage: found.homepage,
            info_url: Some(format!("{}browse/{}@{}/", SITE_URL, library, version)),
            license: found.license,
            urls: files.iter().map(|f| format!("{}{}", base_url, f)).collect(),
            files,
            base_url,
            dest_dir: Some(format!("{}@{}", library, version)),
            default_file,
            package_url: Some(npm_package_url(library, version)),
            skip: Some(SkipRule::new(ds_store_pattern().clone())),
        })
    }

    /// The browse page for a bare package name redirects to the latest
    /// version; the version is read off the redirect target without
    /// following it.
    fn latest_version(&self, library: &str) -> Result<String> {
        validate_library(library, true)?;
        let url = format!("{}browse/{}/", SITE_URL, library);
        let response = self.transport.head(&url)?;
        if response.status >= 400 {
            return Err(library_not_found(library));
        }
        let location = response.header("location").unwrap_or_default();
        let needle = format!("/browse/{}@", library);
        let version = location
            .split_once(&needle)
            .map(|(_, tail)| tail.trim_end_matches('/'))
            .unwrap_or_default();
        if version.is_empty() {
            return Err(Error::UnexpectedPayload {
                url,
                reason: format!("unexpected redirect location {:?}", location),
            });
        }
        Ok(version.to_string())
    }
}
