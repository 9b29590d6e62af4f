//! Line-oriented manifest readers
//!
//! Two inputs are supported: the URL list driving the download command, and
//! digest manifests (`<hex-digest> <relative-filename>` per line) driving the
//! verify command. Both are small relative to the data they describe and are
//! read fully into memory.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::app::hash::{Digest, DigestAlgorithm};
use crate::app::models::{unsafe_relative_path, ManifestEntry, UrlRecord};
use crate::errors::{ConfigError, ConfigResult, ManifestError, ManifestResult, Result};

async fn read_manifest_text(path: &Path) -> ManifestResult<String> {
    tokio::fs::read_to_string(path).await.map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ManifestError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ManifestError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Read a newline-delimited URL list, trimming whitespace and skipping blank lines
pub async fn read_url_lines(path: &Path) -> ManifestResult<Vec<String>> {
    let content = read_manifest_text(path).await?;
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    debug!("Read {} URLs from {}", urls.len(), path.display());
    Ok(urls)
}

/// Turn raw URLs into records, enforcing the prefix and path disjointness
///
/// Exact duplicate URLs are collapsed (first occurrence wins). Two different
/// URLs that resolve to the same local path are a configuration error.
pub fn build_url_records<S: AsRef<str>>(
    urls: &[S],
    prefix: &str,
    base_dir: &Path,
) -> ConfigResult<Vec<UrlRecord>> {
    let mut seen_urls = HashSet::new();
    let mut owners: HashMap<PathBuf, String> = HashMap::new();
    let mut records = Vec::with_capacity(urls.len());
    let mut duplicates = 0usize;

    for url in urls {
        let url = url.as_ref();
        if !seen_urls.insert(url.to_string()) {
            duplicates += 1;
            continue;
        }

        let record = UrlRecord::new(url, prefix, base_dir)?;
        let key: PathBuf = record.local_path.components().collect();
        match owners.entry(key) {
            Entry::Occupied(existing) => {
                return Err(ConfigError::PathCollision {
                    first: existing.get().clone(),
                    second: url.to_string(),
                    path: record.local_path,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(url.to_string());
            }
        }
        records.push(record);
    }

    if duplicates > 0 {
        warn!("Ignored {} duplicate URL lines", duplicates);
    }

    Ok(records)
}

/// Read the URL list at `path` and build validated records
pub async fn load_url_records(path: &Path, prefix: &str, base_dir: &Path) -> Result<Vec<UrlRecord>> {
    let urls = read_url_lines(path).await?;
    let records = build_url_records(&urls, prefix, base_dir)?;
    info!(
        "Loaded {} URLs from {} into {}",
        records.len(),
        path.display(),
        base_dir.display()
    );
    Ok(records)
}

/// Parse one digest manifest line
///
/// Returns `Ok(None)` for blank lines and `#` comments. The filename is the
/// rest of the line after the first whitespace run, with a leading `*`
/// (binary-mode marker) removed. Filenames must stay under the data
/// directory: absolute paths and `..` components are rejected.
pub fn parse_manifest_line(
    line: &str,
    algorithm: DigestAlgorithm,
) -> std::result::Result<Option<ManifestEntry>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (digest, rest) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| "missing filename".to_string())?;

    let filename = rest.trim_start();
    let filename = filename.strip_prefix('*').unwrap_or(filename);
    if filename.is_empty() {
        return Err("missing filename".to_string());
    }

    if let Some(reason) = unsafe_relative_path(filename) {
        return Err(format!("filename {} {}", filename, reason));
    }

    let expected_digest = Digest::from_hex(digest, algorithm).map_err(|e| e.to_string())?;

    Ok(Some(ManifestEntry {
        expected_digest,
        relative_filename: filename.to_string(),
    }))
}

/// Read every entry of a digest manifest
///
/// # Errors
///
/// Returns `ManifestError::InvalidFormat` with the 1-based line number for the
/// first malformed line; an unreadable file is `NotFound` or `Unreadable`.
pub async fn read_digest_manifest(
    path: &Path,
    algorithm: DigestAlgorithm,
) -> ManifestResult<Vec<ManifestEntry>> {
    let content = read_manifest_text(path).await?;
    let mut entries = Vec::new();

    for (index, line) in content.lines().enumerate() {
        match parse_manifest_line(line, algorithm) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(reason) => {
                return Err(ManifestError::InvalidFormat {
                    path: path.to_path_buf(),
                    line: index + 1,
                    reason,
                })
            }
        }
    }

    debug!("Parsed {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// List manifest files in `dir` whose names end with `suffix`, sorted by name
pub async fn discover_manifests(dir: &Path, suffix: &str) -> ManifestResult<Vec<PathBuf>> {
    let unreadable = |source| ManifestError::Unreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut read_dir = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut manifests = Vec::new();

    while let Some(entry) = read_dir.next_entry().await.map_err(unreadable)? {
        let name = entry.file_name();
        let is_manifest = name.to_str().is_some_and(|name| name.ends_with(suffix));
        if is_manifest && entry.path().is_file() {
            manifests.push(entry.path());
        }
    }

    manifests.sort();
    Ok(manifests)
}
