//! cdnjs provider.
//!
//! The primary JSON registry: one REST API serves both the full catalog
//! and per-library documents, so no scraping is involved. An unknown
//! library surfaces either as a 404 or as a literal `{}` body.
//!
//! # API Endpoints
//!
//! - Catalog: `https://api.cdnjs.com/libraries?fields=name,description`
//! - Library: `https://api.cdnjs.com/libraries/{name}`
//! - Files:   `https://cdnjs.cloudflare.com/ajax/libs/{name}/{version}/{file}`

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{Library, LibrarySummary, Release};
use crate::transport::Transport;
use crate::version;

use super::{
    library_not_found_hinted, parse_json, validate_library, validate_version, Provider,
    ProviderInfo,
};

const CODE: &str = "cdnjs";
const SITE_URL: &str = "https://cdnjs.com/";
const API_URL: &str = "https://api.cdnjs.com/libraries";
const CDN_URL: &str = "https://cdnjs.cloudflare.com/ajax/libs";

/// Provider backed by the cdnjs REST API.
pub struct CdnjsProvider<T: Transport> {
    transport: T,
}

#[derive(Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    results: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct CatalogEntry {
    name: String,
    description: Option<String>,
}

#[derive(Deserialize)]
struct LibraryDocument {
    description: Option<String>,
    keywords: Option<Vec<String>>,
    homepage: Option<String>,
    license: Option<String>,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Deserialize)]
struct Asset {
    version: String,
    #[serde(default)]
    files: Vec<String>,
}

impl<T: Transport> CdnjsProvider<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn fetch_document(&self, library: &str) -> Result<LibraryDocument> {
        let url = format!("{}/{}", API_URL, library);
        let body = match self.transport.get(&url) {
            Err(Error::Http { status: 404, .. }) => {
                return Err(library_not_found_hinted(library))
            }
            other => other?,
        };
        if body == b"{}" {
            return Err(library_not_found_hinted(library));
        }
        parse_json(&url, &body)
    }
}

impl<T: Transport> Provider for CdnjsProvider<T> {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            code: CODE,
            site_url: SITE_URL,
            api_url: Some(API_URL),
            cdn_url: Some(CDN_URL),
        }
    }

    fn list(&self) -> Result<Vec<LibrarySummary>> {
        let url = format!("{}?fields=name,description", API_URL);
        let body = self.transport.get(&url)?;
        let catalog: CatalogResponse = parse_json(&url, &body)?;
        debug!(entries = catalog.results.len(), "fetched cdnjs catalog");
        let mut entries: Vec<LibrarySummary> = catalog
            .results
            .into_iter()
            .map(|entry| LibrarySummary {
                name: entry.name,
                description: entry.description,
                version: None,
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.dedup();
        Ok(entries)
    }

    fn find(&self, library: &str) -> Result<Library> {
        validate_library(library, false)?;
        let document = self.fetch_document(library)?;
        let mut versions: Vec<String> = document
            .assets
            .iter()
            .map(|asset| asset.version.clone())
            .collect();
        version::sort(&mut versions, true);
        Ok(Library {
            name: library.to_string(),
            description: document.description,
            tags: document.keywords.unwrap_or_default(),
            homepage: document.homepage,
            info_url: Some(format!("{}/libraries/{}", SITE_URL, library)),
            license: document.license,
            versions,
        })
    }

    fn get(&self, library: &str, version: &str) -> Result<Release> {
        validate_library(library, false)?;
        validate_version(version)?;
        let document = self.fetch_document(library)?;
        let files = document
            .assets
            .iter()
            .find(|asset| asset.version == version)
            .map(|asset| asset.files.clone())
            .ok_or_else(|| Error::VersionNotFound {
                library: library.to_string(),
                version: version.to_string(),
            })?;
        let base_url = format!("{}/{}/{}", CDN_URL, library, version);
        Ok(Release {
            name: library.to_string(),
            version: version.to_string(),
            description: document.description,
            tags: document.keywords.unwrap_or_default(),
            homepage: document.homepage,
            info_url: Some(format!("{}/libraries/{}/{}", SITE_URL, library, version)),
            license: document.license,
            urls: files.iter().map(|f| format!("{}/{}", base_url, f)).collect(),
            files: files.iter().map(|f| format!("/{}", f)).collect(),
            base_url,
            dest_dir: None,
            default_file: None,
            package_url: None,
            skip: None,
        })
    }
}
