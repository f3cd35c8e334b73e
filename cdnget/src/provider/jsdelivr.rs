//! jsdelivr provider.
//!
//! The backend cannot enumerate its catalog; search goes to the Algolia
//! npm-search index instead. Library metadata is merged from two endpoints
//! that fail independently: the Algolia object lookup (metadata and a
//! versions map) and the jsdelivr package listing (a versions array).
//!
//! # API Endpoints
//!
//! - Search:  `POST https://ofcncog2cu-3.algolianet.com/1/indexes/npm-search/query`
//! - Lookup:  `https://ofcncog2cu-dsn.algolia.net/1/indexes/npm-search/{name}`
//! - Listing: `https://data.jsdelivr.com/v1/package/npm/{name}`
//! - Files:   `https://data.jsdelivr.com/v1/package/npm/{name}@{version}/flat`
//! - CDN:     `https://cdn.jsdelivr.net/npm/{name}@{version}/{file}`

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::form_urlencoded;

use crate::error::{Error, Result};
use crate::record::{Library, LibrarySummary, Release};
use crate::transport::Transport;
use crate::version;

use super::{
    encode_name, fetch_npm_flat_listing, fetch_or_not_found, glob_to_regex, library_not_found,
    npm_package_url, parse_json, validate_library, validate_version, Provider, ProviderInfo,
};

const CODE: &str = "jsdelivr";
const SITE_URL: &str = "https://www.jsdelivr.com/";
const API_URL: &str = "https://data.jsdelivr.com/v1";
const CDN_URL: &str = "https://cdn.jsdelivr.net/npm";
const SEARCH_URL: &str = "https://ofcncog2cu-3.algolianet.com/1/indexes/npm-search/query";
const LOOKUP_URL: &str = "https://ofcncog2cu-dsn.algolia.net/1/indexes/npm-search";
const ALGOLIA_HEADERS: &[(&str, &str)] = &[
    ("x-algolia-application-id", "OFCNCOG2CU"),
    ("x-algolia-api-key", "f54e21fa3a2a0160595bb058179bfb1e"),
];

/// Provider backed by the jsdelivr API and the Algolia npm-search index.
pub struct JsdelivrProvider<T: Transport> {
    transport: T,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    name: String,
    description: Option<String>,
    version: Option<String>,
}

#[derive(Deserialize)]
struct LookupDocument {
    name: Option<String>,
    description: Option<String>,
    keywords: Option<Vec<String>>,
    homepage: Option<String>,
    license: Option<String>,
    #[serde(default)]
    versions: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct ListingDocument {
    #[serde(default)]
    versions: Vec<String>,
}

impl<T: Transport> JsdelivrProvider<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn fetch_lookup(&self, library: &str) -> Result<LookupDocument> {
        let url = format!("{}/{}", LOOKUP_URL, encode_name(library));
        let body = fetch_or_not_found(
            self.transport.get_with_headers(&url, ALGOLIA_HEADERS),
            library,
        )?;
        parse_json(&url, &body)
    }

    fn fetch_listing(&self, library: &str) -> Result<ListingDocument> {
        let url = format!("{}/package/npm/{}", API_URL, library);
        let body = fetch_or_not_found(self.transport.get(&url), library)?;
        parse_json(&url, &body)
    }

    fn info_url(library: &str) -> String {
        format!("{}package/npm/{}", SITE_URL, library)
    }
}

impl<T: Transport> Provider for JsdelivrProvider<T> {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            code: CODE,
            site_url: SITE_URL,
            api_url: Some(API_URL),
            cdn_url: Some(CDN_URL),
        }
    }

    fn list(&self) -> Result<Vec<LibrarySummary>> {
        Err(Error::ListNotSupported {
            code: CODE.to_string(),
        })
    }

    fn search(&self, pattern: &str) -> Result<Vec<LibrarySummary>> {
        let mut params = form_urlencoded::Serializer::new(String::new());
        params
            .append_pair("query", pattern)
            .append_pair("page", "0")
            .append_pair("hitsPerPage", "1000")
            .append_pair("attributesToHighlight", "[]")
            .append_pair("attributesToRetrieve", r#"["name","description","version"]"#);
        let payload = json!({ "params": params.finish() }).to_string();

        let body = self
            .transport
            .post(SEARCH_URL, ALGOLIA_HEADERS, payload.as_bytes())?;
        let response: SearchResponse = parse_json(SEARCH_URL, &body)?;
        debug!(hits = response.hits.len(), pattern, "algolia search");

        let rexp = glob_to_regex(pattern)?;
        Ok(response
            .hits
            .into_iter()
            .filter(|hit| rexp.is_match(&hit.name))
            .map(|hit| LibrarySummary {
                name: hit.name,
                description: hit.description,
                version: hit.version,
            })
            .collect())
    }

    fn find(&self, library: &str) -> Result<Library> {
        validate_library(library, true)?;
        let lookup = self.fetch_lookup(library);
        let listing = self.fetch_listing(library);
        match (lookup, listing) {
            (Ok(document), listing) => {
                let mut versions: Vec<String> = document.versions.keys().cloned().collect();
                if versions.is_empty() {
                    if let Ok(listed) = listing {
                        versions = listed.versions;
                    }
                }
                version::sort(&mut versions, true);
                Ok(Library {
                    name: document.name.unwrap_or_else(|| library.to_string()),
                    description: document.description,
                    tags: document.keywords.unwrap_or_default(),
                    homepage: document.homepage,
                    info_url: Some(Self::info_url(library)),
                    license: document.license,
                    versions,
                })
            }
            (Err(lookup_err), Ok(listed)) => {
                debug!(library, error = %lookup_err, "lookup failed, using package listing");
                let mut versions = listed.versions;
                version::sort(&mut versions, true);
                Ok(Library {
                    name: library.to_string(),
                    description: None,
                    tags: Vec::new(),
                    homepage: None,
                    info_url: Some(Self::info_url(library)),
                    license: None,
                    versions,
                })
            }
            (Err(lookup_err), Err(listing_err)) => match (&lookup_err, &listing_err) {
                (Error::LibraryNotFound { .. }, Error::LibraryNotFound { .. }) => {
                    Err(library_not_found(library))
                }
                (Error::LibraryNotFound { .. }, _) => Err(listing_err),
                _ => Err(lookup_err),
            },
        }
    }

    fn get(&self, library: &str, version: &str) -> Result<Release> {
        validate_library(library, true)?;
        validate_version(version)?;
        let found = self.find(library)?;

        let (files, default_file) =
            fetch_npm_flat_listing(&self.transport, library, version, &[])?;
        let base_url = format!("{}/{}@{}", CDN_URL, library, version);
        Ok(Release {
            name: found.name,
            version: version.to_string(),
            description: found.description,
            tags: found.tags,
            homepage: found.homepage,
            info_url: Some(format!(
                "{}package/npm/{}?version={}",
                SITE_URL, library, version
            )),
            license: found.license,
            urls: files.iter().map(|f| format!("{}{}", base_url, f)).collect(),
            files,
            base_url,
            dest_dir: Some(format!("{}@{}", library, version)),
            default_file,
            package_url: Some(npm_package_url(library, version)),
            skip: None,
        })
    }
}
