//! Hashing utilities for layer fingerprints and dependency listings.
//!
//! This module provides:
//! - `ContentHash`: A full 64-character SHA-256 hash
//! - `Fingerprint`: Hash of the canonical JSON form of a value
//! - `list_files()`: Deterministic, content-hashed listing of a directory tree
//! - `hash_file()`: Single file hashing
//! - `hash_bytes()`: Arbitrary byte hashing

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// A full 64-character SHA-256 hash, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Values that can be reduced to a stable content fingerprint.
///
/// The fingerprint is the SHA-256 of the value's JSON serialization, so field
/// order and map ordering must be deterministic (use `BTreeMap`, not `HashMap`).
pub trait Fingerprint: Serialize {
  fn fingerprint(&self) -> Result<ContentHash, serde_json::Error> {
    let serialized = serde_json::to_vec(self)?;
    Ok(hash_bytes(&serialized))
  }
}

/// Error during directory hashing.
#[derive(Debug, thiserror::Error)]
pub enum DirHashError {
  #[error("failed to walk directory: {0}")]
  WalkDir(#[from] walkdir::Error),

  #[error("failed to read file {path}: {source}")]
  ReadFile {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

/// One regular file in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileEntry {
  /// Path relative to the listed root, always `/`-separated.
  pub path: String,
  pub sha256: ContentHash,
}

/// List every regular file under `root` with its content hash.
///
/// Symlinks are followed, so a linked library contributes the bytes of its
/// target under the link's own path. Timestamps and permissions are ignored;
/// only relative paths and contents influence the result.
///
/// # Arguments
///
/// * `root` - The directory to list
/// * `exclude` - File or directory names to skip entirely
///
/// # Returns
///
/// Entries sorted by relative path.
pub fn list_files(root: &Path, exclude: &[&str]) -> Result<Vec<FileEntry>, DirHashError> {
  let mut entries = Vec::new();

  let walker = WalkDir::new(root)
    .follow_links(true)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| e.file_name().to_str().map(|name| !exclude.contains(&name)).unwrap_or(true));

  for entry in walker {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }

    let rel_path = relative_slash_path(root, entry.path());
    if rel_path.is_empty() {
      continue;
    }

    entries.push(FileEntry {
      path: rel_path,
      sha256: hash_file(entry.path())?,
    });
  }

  entries.sort();
  Ok(entries)
}

/// Render `path` relative to `root` using `/` separators on every platform.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
  let rel = path.strip_prefix(root).unwrap_or(path);
  rel
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA-256 hash of the file.
pub fn hash_file(path: &Path) -> Result<ContentHash, DirHashError> {
  let read_err = |source| DirHashError::ReadFile {
    path: path.display().to_string(),
    source,
  };
  let mut file = fs::File::open(path).map_err(read_err)?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}
