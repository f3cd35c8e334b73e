//! cdnget - download libraries from public CDN services.
//!
//! Thin binary over the `cdnget` library: argument parsing, dispatch by
//! argument arity, plain-text rendering, and exit-code wiring.

mod error;
mod render;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cdnget::{Provider, ProviderRegistry, ReqwestTransport};

use crate::error::CliError;

/// Download JavaScript libraries from public CDN services.
#[derive(Debug, Parser)]
#[command(name = "cdnget", version, about, after_help = "\
Examples:
  $ cdnget                                  # list CDNs
  $ cdnget cdnjs                            # list libraries
  $ cdnget cdnjs 'jquery*'                  # search libraries
  $ cdnget cdnjs jquery                     # library details and versions
  $ cdnget cdnjs jquery 2.2.4               # release details and file URLs
  $ cdnget cdnjs jquery 2.2.4 /tmp/static   # download files")]
struct Cli {
    /// CDN code, e.g. cdnjs
    cdn: Option<String>,

    /// Library name, or a glob pattern containing '*'
    library: Option<String>,

    /// Version number, or 'latest'
    #[arg(id = "lib-version", value_name = "VERSION")]
    version: Option<String>,

    /// Directory to download files into
    directory: Option<PathBuf>,

    /// Print names, versions, or URLs only
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging (to stderr)
    #[arg(long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let default_directive = if debug {
        "cdnget=debug,cdnget_cli=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                print!("{}", output);
            }
        }
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}

/// Dispatches by argument arity, mirroring the positional grammar.
fn run(cli: &Cli) -> Result<String, CliError> {
    let registry = ProviderRegistry::new().map_err(CliError::Core)?;

    let Some(cdn) = &cli.cdn else {
        let infos: Vec<_> = registry
            .providers()
            .iter()
            .map(|provider| provider.info())
            .collect();
        debug!(count = infos.len(), "listing registered CDNs");
        return Ok(render::render_cdn_list(&infos, cli.quiet));
    };
    let provider = registry
        .get(cdn)
        .ok_or_else(|| CliError::NoSuchCdn(cdn.clone()))?;
    debug!(cdn = %cdn, "dispatching to provider");

    let Some(library) = &cli.library else {
        let entries = provider.list()?;
        return Ok(render::render_list(&entries, cli.quiet));
    };

    let Some(version) = &cli.version else {
        if library.contains('*') {
            let entries = provider.search(library)?;
            return Ok(render::render_list(&entries, cli.quiet));
        }
        let found = provider.find(library)?;
        return Ok(render::render_find(&found, cli.quiet));
    };

    let version = resolve_version(provider, library, version)?;
    let release = provider.get(library, &version)?;

    let Some(directory) = &cli.directory else {
        return Ok(render::render_get(&release, cli.quiet));
    };

    let transport = ReqwestTransport::new()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    cdnget::sync(&transport, &release, directory, cli.quiet, &mut out)?;
    let _ = out.flush();
    Ok(String::new())
}

/// Resolves the `latest` keyword through the provider's cheap lookup;
/// exact versions pass through untouched.
fn resolve_version(
    provider: &dyn Provider,
    library: &str,
    version: &str,
) -> Result<String, CliError> {
    if version == "latest" {
        Ok(provider.latest_version(library)?)
    } else {
        Ok(version.to_string())
    }
}
