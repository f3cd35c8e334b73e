//! Idempotent file-download reconciler.
//!
//! [`sync`] brings a local directory in line with one resolved release:
//! every listed file is fetched in order and written only when its content
//! differs from what is already on disk. Progress is streamed line by line
//! to the caller's sink; a fetch failure aborts the whole call.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::record::Release;
use crate::transport::Transport;

/// Formats an integer with `,` as the thousands separator.
fn format_size(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Downloads every file of `release` under `target_dir`.
///
/// Files land in `<target_dir>/<dest_dir>` when the release carries a
/// destination override, otherwise in `<target_dir>/<name>/<version>`.
/// Files are processed strictly in listed order; an existing file with
/// byte-identical content is left untouched. The transport's pooled
/// connection is reused across the files of one call.
///
/// Progress lines go to `out` unless `quiet` is set; writes to `out` are
/// best-effort and never abort the sync. A failed fetch aborts the whole
/// call with no retry and no skip-and-continue.
pub fn sync<T: Transport, W: Write>(
    transport: &T,
    release: &Release,
    target_dir: &Path,
    quiet: bool,
    out: &mut W,
) -> Result<()> {
    if !target_dir.exists() {
        return Err(Error::TargetMissing {
            path: target_dir.to_path_buf(),
        });
    }
    if !target_dir.is_dir() {
        return Err(Error::NotADirectory {
            path: target_dir.to_path_buf(),
        });
    }

    let root = match &release.dest_dir {
        Some(dest_dir) => target_dir.join(dest_dir),
        None => target_dir.join(&release.name).join(&release.version),
    };
    let root = root.to_string_lossy().into_owned();
    debug!(root = %root, files = release.files.len(), "syncing release");

    for file in &release.files {
        // File paths start with '/', so plain concatenation yields the
        // local path and the download URL alike.
        let filepath = format!("{}{}", root, file);

        if let Some(skip) = &release.skip {
            if skip.matches(file) {
                if !quiet {
                    let _ = writeln!(out, "{} ... Skipped", file);
                }
                continue;
            }
        }

        if file.ends_with('/') {
            let dirpath = Path::new(&filepath);
            if dirpath.exists() {
                if !quiet {
                    let _ = writeln!(out, "{} ... Done (Already exists)", filepath);
                }
            } else {
                if !quiet {
                    let _ = write!(out, "{} ...", filepath);
                    let _ = out.flush();
                }
                fs::create_dir_all(dirpath).map_err(|source| Error::CreateDirFailed {
                    path: dirpath.to_path_buf(),
                    source,
                })?;
                if !quiet {
                    let _ = writeln!(out, "Done (Created)");
                }
            }
            continue;
        }

        if !quiet {
            let _ = write!(out, "{} ...", filepath);
            let _ = out.flush();
        }
        let url = format!("{}{}", release.base_url, file);
        let content = transport.get(&url)?;
        if !quiet {
            let _ = write!(out, " Done ({} byte)", format_size(content.len()));
        }

        let filepath = Path::new(&filepath);
        if let Some(dirpath) = filepath.parent() {
            if !dirpath.exists() {
                fs::create_dir_all(dirpath).map_err(|source| Error::CreateDirFailed {
                    path: dirpath.to_path_buf(),
                    source,
                })?;
            }
        }
        let unchanged = match fs::read(filepath) {
            Ok(existing) => existing == content,
            Err(_) => false,
        };
        if unchanged {
            if !quiet {
                let _ = write!(out, " (Unchanged)");
            }
        } else {
            fs::write(filepath, &content).map_err(|source| Error::WriteFailed {
                path: filepath.to_path_buf(),
                source,
            })?;
        }
        if !quiet {
            let _ = writeln!(out);
        }
    }
    Ok(())
}
