//! Google Hosted Libraries provider.
//!
//! There is no API; everything is scraped from the catalog page. Each
//! library is an `<h3>` heading followed by a `<dl>` block carrying a
//! copy-paste snippet, a site link and comma-separated version lists.
//!
//! # Endpoints
//!
//! - Catalog: `https://developers.google.com/speed/libraries/`
//! - CDN:     `https://ajax.googleapis.com/ajax/libs/{name}/{version}/{file}`

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{Library, LibrarySummary, Release};
use crate::transport::Transport;

use super::{library_not_found, validate_library, validate_version, Provider, ProviderInfo};

const CODE: &str = "google";
const SITE_URL: &str = "https://developers.google.com/speed/libraries/";
const CDN_URL: &str = "https://ajax.googleapis.com/ajax/libs";

/// Provider backed by the scraped Google Hosted Libraries catalog page.
pub struct GoogleCdnProvider<T: Transport> {
    transport: T,
}

/// Everything one catalog block says about a library.
struct ScrapedLibrary {
    site_url: Option<String>,
    versions: Vec<String>,
    urls: Vec<String>,
}

fn catalog_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            "{}/([^/]+)/([^/]+)/([^\"]+)",
            regex::escape(CDN_URL)
        ))
        .unwrap()
    })
}

fn library_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<h3\b.*?>.*?</h3>\s*<dl>(.*?)</dl>").unwrap())
}

fn snippet_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<dt>.*?snippet:</dt>\s*<dd>(.*?)</dd>").unwrap())
}

fn attr_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"\b(?:src|href)="([^"]*?)""#).unwrap())
}

fn site_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<dt>site:</dt>\s*<dd>(.*?)</dd>").unwrap())
}

fn href_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"href="([^"]+)""#).unwrap())
}

fn versions_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<dt>(?:stable |unstable )?versions:</dt>\s*<dd\b.*?>(.*?)</dd>").unwrap()
    })
}

impl<T: Transport> GoogleCdnProvider<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn fetch_catalog(&self) -> Result<String> {
        let body = self.transport.get(SITE_URL)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Scrapes the catalog block advertising this library. Version lists
    /// keep their page order, which already runs newest first.
    fn scrape(&self, library: &str) -> Result<ScrapedLibrary> {
        let html = self.fetch_catalog()?;
        let needle = format!("{}/{}", CDN_URL, library);
        for block in library_block_pattern().captures_iter(&html) {
            let text = &block[1];
            if !text.contains(&needle) {
                continue;
            }
            let urls = snippet_pattern()
                .captures(text)
                .map(|caps| {
                    attr_url_pattern()
                        .captures_iter(&caps[1])
                        .map(|attr| attr[1].to_string())
                        .collect()
                })
                .unwrap_or_default();
            let site_url = site_pattern().captures(text).and_then(|caps| {
                href_pattern()
                    .captures(&caps[1])
                    .map(|href| href[1].to_string())
            });
            let mut versions = Vec::new();
            for list in versions_pattern().captures_iter(text) {
                versions.extend(list[1].split(',').map(|part| part.trim().to_string()));
            }
            return Ok(ScrapedLibrary {
                site_url,
                versions,
                urls,
            });
        }
        Err(library_not_found(library))
    }
}

impl<T: Transport> Provider for GoogleCdnProvider<T> {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            code: CODE,
            site_url: SITE_URL,
            api_url: None,
            cdn_url: Some(CDN_URL),
        }
    }

    fn list(&self) -> Result<Vec<LibrarySummary>> {
        let html = self.fetch_catalog()?;
        let mut entries: Vec<LibrarySummary> = catalog_url_pattern()
            .captures_iter(&html)
            .map(|caps| LibrarySummary {
                name: caps[1].to_string(),
                description: Some(format!("latest version: {}", &caps[2])),
                version: None,
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.dedup();
        debug!(count = entries.len(), "scraped catalog page");
        Ok(entries)
    }

    fn find(&self, library: &str) -> Result<Library> {
        validate_library(library, false)?;
        let scraped = self.scrape(library)?;
        Ok(Library {
            name: library.to_string(),
            description: None,
            tags: Vec::new(),
            homepage: scraped.site_url,
            info_url: Some(format!("{}#{}", SITE_URL, library)),
            license: None,
            versions: scraped.versions,
        })
    }

    fn get(&self, library: &str, version: &str) -> Result<Release> {
        validate_library(library, false)?;
        validate_version(version)?;
        let scraped = self.scrape(library)?;
        if !scraped.versions.iter().any(|v| v == version) {
            return Err(Error::VersionNotFound {
                library: library.to_string(),
                version: version.to_string(),
            });
        }

        // The snippet advertises the latest version; swap the version
        // segment of each URL for the requested one.
        let version_segment = Regex::new(&format!("(/libs/{})/[^/]+", regex::escape(library)))
            .map_err(|_| Error::InvalidLibraryName(library.to_string()))?;
        let replacement = format!("${{1}}/{}", version);
        let urls: Vec<String> = scraped
            .urls
            .iter()
            .map(|url| {
                version_segment
                    .replace_all(url, replacement.as_str())
                    .into_owned()
            })
            .collect();

        let base_url = format!("{}/{}/{}", CDN_URL, library, version);
        let files = urls
            .iter()
            .map(|url| url.get(base_url.len()..).unwrap_or_default().to_string())
            .collect();
        Ok(Release {
            name: library.to_string(),
            version: version.to_string(),
            description: None,
            tags: Vec::new(),
            homepage: scraped.site_url,
            info_url: Some(format!("{}#{}", SITE_URL, library)),
            license: None,
            urls,
            files,
            base_url,
            dest_dir: None,
            default_file: None,
            package_url: None,
            skip: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::tests::MockTransport;

    const CATALOG_HTML: &str = r#"<html><body>
<h3 id="jquery">jQuery</h3>
<dl>
  <dt>snippet:</dt>
  <dd>
    &lt;script src="https://ajax.googleapis.com/ajax/libs/jquery/3.6.4/jquery.min.js"&gt;&lt;/script&gt;
  </dd>
  <dt>site:</dt>
  <dd><a href="https://jquery.com/">https://jquery.com/</a></dd>
  <dt>stable versions:</dt>
  <dd class="versions">3.6.4, 3.6.1, 3.6.0, 2.2.4, 1.12.4</dd>
</dl>
<h3 id="mootools">MooTools</h3>
<dl>
  <dt>snippet:</dt>
  <dd>
    &lt;script src="https://ajax.googleapis.com/ajax/libs/mootools/1.6.0/mootools-yui-compressed.js"&gt;&lt;/script&gt;
  </dd>
  <dt>site:</dt>
  <dd><a href="https://mootools.net/">https://mootools.net/</a></dd>
  <dt>stable versions:</dt>
  <dd class="versions">1.6.0, 1.5.2</dd>
</dl>
</body></html>"#;

    fn provider_with_catalog() -> GoogleCdnProvider<MockTransport> {
        let mock = MockTransport::new();
        mock.push_body(CATALOG_HTML.as_bytes());
        GoogleCdnProvider::new(mock)
    }

    #[test]
    fn test_provider_info() {
        let provider = GoogleCdnProvider::new(MockTransport::new());
        let info = provider.info();
        assert_eq!(info.code, "google");
        assert_eq!(info.site_url, "https://developers.google.com/speed/libraries/");
        assert_eq!(info.api_url, None);
        assert_eq!(
            info.cdn_url,
            Some("https://ajax.googleapis.com/ajax/libs")
        );
    }

    #[test]
    fn test_list_scrapes_catalog_page() {
        let provider = provider_with_catalog();
        let entries = provider.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "jquery");
        assert_eq!(
            entries[0].description.as_deref(),
            Some("latest version: 3.6.4")
        );
        assert_eq!(entries[1].name, "mootools");
        assert_eq!(
            provider.transport.requested_urls(),
            vec!["https://developers.google.com/speed/libraries/"]
        );
    }

    #[test]
    fn test_list_collapses_repeated_snippet_urls() {
        let mock = MockTransport::new();
        mock.push_body(
            concat!(
                r#"src="https://ajax.googleapis.com/ajax/libs/jquery/3.6.4/jquery.min.js""#,
                "\n",
                r#"src="https://ajax.googleapis.com/ajax/libs/jquery/3.6.4/jquery.js""#,
            )
            .as_bytes(),
        );
        let provider = GoogleCdnProvider::new(mock);

        let entries = provider.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "jquery");
    }

    #[test]
    fn test_search_filters_catalog() {
        let provider = provider_with_catalog();
        let entries = provider.search("moo*").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "mootools");
    }

    #[test]
    fn test_find_scrapes_library_block() {
        let provider = provider_with_catalog();
        let library = provider.find("jquery").unwrap();
        assert_eq!(library.name, "jquery");
        assert_eq!(library.description, None);
        assert_eq!(library.homepage.as_deref(), Some("https://jquery.com/"));
        assert_eq!(
            library.info_url.as_deref(),
            Some("https://developers.google.com/speed/libraries/#jquery")
        );
        assert_eq!(
            library.versions,
            vec!["3.6.4", "3.6.1", "3.6.0", "2.2.4", "1.12.4"]
        );
    }

    #[test]
    fn test_find_keeps_version_page_order() {
        let mock = MockTransport::new();
        mock.push_body(
            concat!(
                "<h3>Angular</h3>\n<dl>\n<dt>snippet:</dt>\n",
                r#"<dd>src="https://ajax.googleapis.com/ajax/libs/angularjs/1.2.0/angular.min.js"</dd>"#,
                "\n<dt>stable versions:</dt>\n",
                "<dd>1.2.0, 1.10.0, 1.9.0</dd>\n</dl>",
            )
            .as_bytes(),
        );
        let provider = GoogleCdnProvider::new(mock);

        let library = provider.find("angularjs").unwrap();
        assert_eq!(library.versions, vec!["1.2.0", "1.10.0", "1.9.0"]);
    }

    #[test]
    fn test_find_unknown_library_is_not_found() {
        let provider = provider_with_catalog();
        let err = provider.find("no-such-library").unwrap_err();
        assert_eq!(err.to_string(), "no-such-library: library not found.");
    }

    #[test]
    fn test_catalog_fetch_error_propagates() {
        let mock = MockTransport::new();
        mock.push_status(404, "Not Found");
        let provider = GoogleCdnProvider::new(mock);

        let err = provider.find("jquery").unwrap_err();
        assert_eq!(
            err.to_string(),
            "GET https://developers.google.com/speed/libraries/: 404 Not Found"
        );
    }

    #[test]
    fn test_get_rewrites_snippet_version() {
        let provider = provider_with_catalog();
        let release = provider.get("jquery", "2.2.4").unwrap();
        assert_eq!(release.name, "jquery");
        assert_eq!(release.version, "2.2.4");
        assert_eq!(
            release.urls,
            vec!["https://ajax.googleapis.com/ajax/libs/jquery/2.2.4/jquery.min.js"]
        );
        assert_eq!(release.files, vec!["/jquery.min.js"]);
        assert_eq!(
            release.base_url,
            "https://ajax.googleapis.com/ajax/libs/jquery/2.2.4"
        );
        assert_eq!(release.homepage.as_deref(), Some("https://jquery.com/"));
        assert_eq!(release.dest_dir, None);
        assert!(release.skip.is_none());
    }

    #[test]
    fn test_get_unknown_version_is_version_not_found() {
        let provider = provider_with_catalog();
        let err = provider.get("jquery", "9.9.9").unwrap_err();
        assert_eq!(err.to_string(), "jquery 9.9.9: version not found.");
    }

    #[test]
    fn test_latest_version_takes_first_page_entry() {
        let provider = provider_with_catalog();
        assert_eq!(provider.latest_version("jquery").unwrap(), "3.6.4");
    }

    #[test]
    fn test_scoped_name_rejected_without_network() {
        let provider = GoogleCdnProvider::new(MockTransport::new());
        let err = provider.find("@babel/core").unwrap_err();
        assert_eq!(err.to_string(), "@babel/core: unexpected library name.");
        assert_eq!(provider.transport.request_count(), 0);
    }
}
