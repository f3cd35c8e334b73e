//! cdnget - download libraries from public CDN services
//!
//! This library resolves and retrieves library releases from several public
//! CDN services (cdnjs, jsdelivr, unpkg, and the Google Hosted Libraries
//! catalog) behind one uniform interface, then synchronizes a selected
//! release's files onto local disk.
//!
//! The pieces:
//!
//! - [`transport`] — blocking HTTP with manual redirect handling and gzip
//!   negotiation behind the [`Transport`] trait.
//! - [`version`] — the version ordering the catalogs publish.
//! - [`provider`] — the [`Provider`] trait, its four backends, and the
//!   [`ProviderRegistry`] used to dispatch by service code.
//! - [`record`] — the canonical [`Library`] and [`Release`] shapes every
//!   backend is normalized into.
//! - [`reconcile`] — the idempotent downloader.
//!
//! ```no_run
//! use cdnget::{sync, ProviderRegistry};
//!
//! # fn main() -> cdnget::Result<()> {
//! let registry = ProviderRegistry::new()?;
//! let provider = registry.get("cdnjs").expect("known code");
//! let release = provider.get("jquery", "2.2.4")?;
//! let transport = cdnget::ReqwestTransport::new()?;
//! sync(
//!     &transport,
//!     &release,
//!     std::path::Path::new("static/lib"),
//!     false,
//!     &mut std::io::stdout(),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod provider;
pub mod reconcile;
pub mod record;
pub mod transport;
pub mod version;

pub use error::{Error, Result};
pub use provider::{Provider, ProviderInfo, ProviderRegistry};
pub use reconcile::sync;
pub use record::{Library, LibrarySummary, Release, SkipRule};
pub use transport::{ReqwestTransport, Transport, TransportConfig};

#[cfg(test)]
pub use transport::tests::MockTransport;
