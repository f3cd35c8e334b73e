//! Plain-text rendering of canonical records.
//!
//! The layouts are line-oriented and stable so shell pipelines can parse
//! them; quiet mode drops everything but the machine-usable column.

use cdnget::{Library, LibrarySummary, ProviderInfo, Release};

/// Collapses newlines in a description to keep one entry per line.
fn one_line(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

/// One line per provider: code and site URL.
pub fn render_cdn_list(infos: &[ProviderInfo], quiet: bool) -> String {
    let mut buf = String::new();
    for info in infos {
        if quiet {
            buf.push_str(&format!("{}\n", info.code));
        } else {
            buf.push_str(&format!("{:<10}  # {}\n", info.code, info.site_url));
        }
    }
    buf
}

/// One line per library: name and description.
pub fn render_list(entries: &[LibrarySummary], quiet: bool) -> String {
    let mut buf = String::new();
    for entry in entries {
        if quiet {
            buf.push_str(&format!("{}\n", entry.name));
        } else {
            let description = entry.description.as_deref().unwrap_or("");
            buf.push_str(&format!("{:<20}  # {}\n", entry.name, one_line(description)));
        }
    }
    buf
}

fn push_field(buf: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.is_empty() {
            buf.push_str(&format!("{:<9} {}\n", format!("{}:", label), value));
        }
    }
}

fn joined_tags(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(", "))
    }
}

/// Labeled metadata lines followed by the version list, newest first.
pub fn render_find(library: &Library, quiet: bool) -> String {
    let mut buf = String::new();
    if quiet {
        for version in &library.versions {
            buf.push_str(&format!("{}\n", version));
        }
        return buf;
    }
    push_field(&mut buf, "name", Some(&library.name));
    push_field(&mut buf, "desc", library.description.as_deref());
    push_field(&mut buf, "tags", joined_tags(&library.tags).as_deref());
    push_field(&mut buf, "site", library.homepage.as_deref());
    push_field(&mut buf, "info", library.info_url.as_deref());
    push_field(&mut buf, "license", library.license.as_deref());
    if !library.versions.is_empty() {
        buf.push_str("versions:\n");
        for version in &library.versions {
            buf.push_str(&format!("  - {}\n", version));
        }
    }
    buf
}

/// Labeled metadata lines followed by the download URL list.
pub fn render_get(release: &Release, quiet: bool) -> String {
    let mut buf = String::new();
    if quiet {
        for url in &release.urls {
            buf.push_str(&format!("{}\n", url));
        }
        return buf;
    }
    push_field(&mut buf, "name", Some(&release.name));
    push_field(&mut buf, "version", Some(&release.version));
    push_field(&mut buf, "desc", release.description.as_deref());
    push_field(&mut buf, "tags", joined_tags(&release.tags).as_deref());
    push_field(&mut buf, "site", release.homepage.as_deref());
    push_field(&mut buf, "info", release.info_url.as_deref());
    push_field(&mut buf, "npmpkg", release.package_url.as_deref());
    push_field(&mut buf, "default", release.default_file.as_deref());
    push_field(&mut buf, "license", release.license.as_deref());
    if !release.urls.is_empty() {
        buf.push_str("urls:\n");
        for url in &release.urls {
            buf.push_str(&format!("  - {}\n", url));
        }
    }
    buf
}
