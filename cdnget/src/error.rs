//! Error types shared by the transport, providers, and reconciler.

use std::io;
use std::path::PathBuf;

/// Result type for cdnget operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or downloading a release.
#[derive(Debug)]
pub enum Error {
    /// Library name failed validation before any request was made.
    InvalidLibraryName(String),

    /// Version string failed validation before any request was made.
    InvalidVersionNumber(String),

    /// The provider cannot enumerate its catalog without a search pattern.
    ListNotSupported { code: String },

    /// No library with this name exists on the provider.
    LibraryNotFound {
        library: String,
        hint: Option<String>,
    },

    /// The library exists but has no release with this version.
    VersionNotFound { library: String, version: String },

    /// The server answered with a non-success status code.
    Http {
        url: String,
        status: u16,
        reason: String,
    },

    /// The request failed before a response arrived.
    Network { url: String, reason: String },

    /// The HTTP client could not be constructed.
    ClientCreation(String),

    /// The response body did not have the expected shape.
    UnexpectedPayload { url: String, reason: String },

    /// Download target directory does not exist.
    TargetMissing { path: PathBuf },

    /// Download target exists but is not a directory.
    NotADirectory { path: PathBuf },

    /// Failed to read a local file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a local file.
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    CreateDirFailed { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLibraryName(name) => {
                write!(f, "{}: unexpected library name.", name)
            }
            Self::InvalidVersionNumber(version) => {
                write!(f, "{}: unexpected version number.", version)
            }
            Self::ListNotSupported { code } => {
                write!(
                    f,
                    "{}: cannot list libraries; please specify pattern such as 'jquery*'.",
                    code
                )
            }
            Self::LibraryNotFound { library, hint } => match hint {
                Some(hint) => {
                    write!(f, "{}: library not found (maybe '{}'?).", library, hint)
                }
                None => write!(f, "{}: library not found.", library),
            },
            Self::VersionNotFound { library, version } => {
                write!(f, "{} {}: version not found.", library, version)
            }
            Self::Http {
                url,
                status,
                reason,
            } => {
                write!(f, "GET {}: {} {}", url, status, reason)
            }
            Self::Network { url, reason } => {
                write!(f, "failed to fetch {}: {}", url, reason)
            }
            Self::ClientCreation(reason) => {
                write!(f, "failed to create HTTP client: {}", reason)
            }
            Self::UnexpectedPayload { url, reason } => {
                write!(f, "failed to parse response from {}: {}", url, reason)
            }
            Self::TargetMissing { path } => {
                write!(f, "{}: not exist.", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "{}: not a directory.", path.display())
            }
            Self::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            Self::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            Self::CreateDirFailed { path, source } => {
                write!(
                    f,
                    "failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFailed { source, .. } => Some(source),
            Self::WriteFailed { source, .. } => Some(source),
            Self::CreateDirFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_name_display() {
        let err = Error::InvalidLibraryName("foo bar".to_string());
        assert_eq!(err.to_string(), "foo bar: unexpected library name.");
    }

    #[test]
    fn test_library_not_found_display() {
        let err = Error::LibraryNotFound {
            library: "blablabla".to_string(),
            hint: None,
        };
        assert_eq!(err.to_string(), "blablabla: library not found.");
    }

    #[test]
    fn test_library_not_found_with_hint_display() {
        let err = Error::LibraryNotFound {
            library: "jquery.js".to_string(),
            hint: Some("jqueryjs".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "jquery.js: library not found (maybe 'jqueryjs'?)."
        );
    }

    #[test]
    fn test_version_not_found_display() {
        let err = Error::VersionNotFound {
            library: "jquery".to_string(),
            version: "999.999.999".to_string(),
        };
        assert_eq!(err.to_string(), "jquery 999.999.999: version not found.");
    }

    #[test]
    fn test_http_display() {
        let err = Error::Http {
            url: "https://api.cdnjs.com/libraries/x".to_string(),
            status: 500,
            reason: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "GET https://api.cdnjs.com/libraries/x: 500 Internal Server Error"
        );
    }

    #[test]
    fn test_filesystem_errors_display() {
        let err = Error::TargetMissing {
            path: PathBuf::from("static"),
        };
        assert_eq!(err.to_string(), "static: not exist.");

        let err = Error::NotADirectory {
            path: PathBuf::from("static/file.txt"),
        };
        assert_eq!(err.to_string(), "static/file.txt: not a directory.");
    }

    #[test]
    fn test_io_error_source() {
        let err = Error::ReadFailed {
            path: PathBuf::from("a.js"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&err).is_some());

        let err = Error::LibraryNotFound {
            library: "x".to_string(),
            hint: None,
        };
        assert!(std::error::Error::source(&err).is_none());
    }
}
