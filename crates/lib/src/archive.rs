//! Reproducible jar creation and jar reading.
//!
//! Jars written here use stored (uncompressed) entries with a fixed 1980-01-01
//! timestamp. CDS maps class files straight out of the archive, so entries
//! must be byte-stable and seekable, and two builds of the same tree must
//! produce the same bytes.
//!
//! Symlinks in the source tree are always dereferenced: a library that a
//! binding symlinked into the lib directory is stored as a regular entry with
//! the target's content, since nothing can resolve the link at launch.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::consts::MANIFEST_PATH;
use crate::util::hash::relative_slash_path;

/// Errors creating or reading archives.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
  #[error("I/O error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("zip error on {path}: {source}")]
  Zip {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("failed to walk source tree: {0}")]
  Walk(#[from] walkdir::Error),

  #[error("unable to dereference symlink {path}: {message}")]
  Symlink { path: PathBuf, message: String },

  #[error("illegal entry {entry:?} escapes {dest}")]
  ZipSlip { entry: String, dest: PathBuf },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
  move |source| ArchiveError::Io {
    path: path.to_path_buf(),
    source,
  }
}

fn zip_err(path: &Path) -> impl FnOnce(zip::result::ZipError) -> ArchiveError + '_ {
  move |source| ArchiveError::Zip {
    path: path.to_path_buf(),
    source,
  }
}

fn walk_err(err: walkdir::Error) -> ArchiveError {
  let dangling = err.path().filter(|p| p.is_symlink()).map(Path::to_path_buf);
  match dangling {
    Some(path) => ArchiveError::Symlink {
      path,
      message: err.to_string(),
    },
    None => ArchiveError::Walk(err),
  }
}

/// Summary of a written jar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JarStats {
  pub files: usize,
  pub directories: usize,
}

struct SourceEntry {
  name: String,
  path: PathBuf,
  is_dir: bool,
  mode: Option<u32>,
}

/// Create a jar at `target` from every entry under `source`.
///
/// Entry names are relative to `source`; directory entries end in `/`. If
/// `META-INF/MANIFEST.MF` exists it is written first, after its directory,
/// as the JDK's `JarInputStream` expects.
pub fn create_jar(source: &Path, target: &Path) -> Result<JarStats, ArchiveError> {
  info!(source = %source.display(), target = %target.display(), "creating jar");

  let mut entries = collect_entries(source)?;
  entries.sort_by_key(|e| (entry_rank(&e.name), e.name.clone()));

  if let Some(parent) = target.parent() {
    fs::create_dir_all(parent).map_err(io_err(parent))?;
  }
  let file = File::create(target).map_err(io_err(target))?;
  let mut writer = ZipWriter::new(file);
  let mut stats = JarStats::default();

  for entry in &entries {
    let mut options = SimpleFileOptions::default()
      .compression_method(CompressionMethod::Stored)
      .last_modified_time(DateTime::default());
    if let Some(mode) = entry.mode {
      options = options.unix_permissions(mode);
    }

    if entry.is_dir {
      writer
        .add_directory(entry.name.as_str(), options)
        .map_err(zip_err(target))?;
      stats.directories += 1;
      continue;
    }

    writer.start_file(entry.name.as_str(), options).map_err(zip_err(target))?;
    let mut input = File::open(&entry.path).map_err(io_err(&entry.path))?;
    io::copy(&mut input, &mut writer).map_err(io_err(&entry.path))?;
    stats.files += 1;
  }

  writer.finish().map_err(zip_err(target))?;
  debug!(files = stats.files, directories = stats.directories, "jar written");
  Ok(stats)
}

fn collect_entries(source: &Path) -> Result<Vec<SourceEntry>, ArchiveError> {
  let mut entries = Vec::new();

  for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
    let entry = entry.map_err(walk_err)?;
    let rel = relative_slash_path(source, entry.path());
    if rel.is_empty() {
      continue;
    }

    // follow_links reports the target's metadata
    let metadata = entry.metadata().map_err(walk_err)?;
    let is_dir = metadata.is_dir();
    if !is_dir && !metadata.is_file() {
      continue;
    }

    entries.push(SourceEntry {
      name: if is_dir { format!("{}/", rel) } else { rel },
      path: entry.path().to_path_buf(),
      is_dir,
      mode: unix_mode(&metadata),
    });
  }

  Ok(entries)
}

fn entry_rank(name: &str) -> u8 {
  match name {
    "META-INF/" => 0,
    n if n == MANIFEST_PATH => 1,
    _ => 2,
  }
}

#[cfg(unix)]
fn unix_mode(metadata: &fs::Metadata) -> Option<u32> {
  use std::os::unix::fs::PermissionsExt;
  Some(metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &fs::Metadata) -> Option<u32> {
  None
}

/// Unpack `archive` into `dest`, rejecting entries that would escape it.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize, ArchiveError> {
  info!(archive = %archive.display(), dest = %dest.display(), "unpacking archive");

  let file = File::open(archive).map_err(io_err(archive))?;
  let mut zip = ZipArchive::new(file).map_err(zip_err(archive))?;
  let mut written = 0;

  for i in 0..zip.len() {
    let mut entry = zip.by_index(i).map_err(zip_err(archive))?;
    let name = entry.name().to_string();
    let rel = safe_relative_path(&name).ok_or_else(|| ArchiveError::ZipSlip {
      entry: name.clone(),
      dest: dest.to_path_buf(),
    })?;
    let out = dest.join(rel);

    if entry.is_dir() {
      fs::create_dir_all(&out).map_err(io_err(&out))?;
      continue;
    }

    if let Some(parent) = out.parent() {
      fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let mut output = File::create(&out).map_err(io_err(&out))?;
    io::copy(&mut entry, &mut output).map_err(io_err(&out))?;
    written += 1;

    if let Some(mode) = entry.unix_mode() {
      set_mode(&out, mode)?;
    }
  }

  Ok(written)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ArchiveError> {
  use std::os::unix::fs::PermissionsExt;
  fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777)).map_err(io_err(path))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), ArchiveError> {
  Ok(())
}

/// Validate a zip entry name as a path that stays below the extraction root.
fn safe_relative_path(name: &str) -> Option<PathBuf> {
  let path = Path::new(name);
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::Normal(part) => out.push(part),
      Component::CurDir => {}
      Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
    }
  }
  Some(out)
}

/// Read a single entry from a jar, or `None` if it does not exist.
pub fn read_entry(jar: &Path, name: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
  let file = File::open(jar).map_err(io_err(jar))?;
  let mut zip = ZipArchive::new(file).map_err(zip_err(jar))?;

  let mut entry = match zip.by_name(name) {
    Ok(entry) => entry,
    Err(zip::result::ZipError::FileNotFound) => return Ok(None),
    Err(source) => return Err(ArchiveError::Zip { path: jar.to_path_buf(), source }),
  };

  let mut buf = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
  entry.read_to_end(&mut buf).map_err(io_err(jar))?;
  Ok(Some(buf))
}

/// List the names of all entries in a jar, in archive order.
pub fn entry_names(jar: &Path) -> Result<Vec<String>, ArchiveError> {
  let file = File::open(jar).map_err(io_err(jar))?;
  let zip = ZipArchive::new(file).map_err(zip_err(jar))?;
  Ok(zip.file_names().map(str::to_string).collect())
}

/// Copy the tree under `source` into `target`, dereferencing symlinks.
///
/// Returns the number of files copied.
pub fn copy_tree(source: &Path, target: &Path) -> Result<usize, ArchiveError> {
  fs::create_dir_all(target).map_err(io_err(target))?;
  let mut copied = 0;

  for entry in collect_entries(source)? {
    let out = target.join(&entry.name);
    if entry.is_dir {
      fs::create_dir_all(&out).map_err(io_err(&out))?;
      continue;
    }
    if let Some(parent) = out.parent() {
      fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    fs::copy(&entry.path, &out).map_err(io_err(&entry.path))?;
    copied += 1;
  }

  debug!(source = %source.display(), target = %target.display(), copied, "copied tree");
  Ok(copied)
}

/// `*.jar` files directly under `dir`, sorted. A missing directory is empty.
pub fn list_jars(dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(io_err(dir)(e)),
  };

  let mut jars = Vec::new();
  for entry in entries {
    let path = entry.map_err(io_err(dir))?.path();
    if path.extension().is_some_and(|ext| ext == "jar") && path.is_file() {
      jars.push(path);
    }
  }
  jars.sort();
  Ok(jars)
}

/// Remove everything inside `dir`, keeping `dir` itself.
pub fn clear_dir(dir: &Path) -> Result<(), ArchiveError> {
  for entry in fs::read_dir(dir).map_err(io_err(dir))? {
    let path = entry.map_err(io_err(dir))?.path();
    let result = if path.is_dir() && !path.is_symlink() {
      fs::remove_dir_all(&path)
    } else {
      fs::remove_file(&path)
    };
    result.map_err(io_err(&path))?;
  }
  Ok(())
}
