//! Timestamp normalization.
//!
//! A CDS archive records the modification time of every class path entry and
//! refuses to map when they differ at launch. Setting everything to the zip
//! epoch before the training run makes the archive valid in the final image
//! and keeps repeated builds byte-identical.

use std::path::Path;

use filetime::FileTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::consts::ZIP_EPOCH_SECS;

/// Outcome of a normalization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeStats {
  pub updated: usize,
  pub failed: usize,
}

/// Set access and modification time of every entry under `root` to
/// 1980-01-01T00:00:00Z.
///
/// Failures on individual entries are logged and counted, never returned:
/// one file with a stray timestamp costs reproducibility for that file only.
/// Symlinks are not followed; the link itself is touched.
pub fn normalize(root: &Path) -> NormalizeStats {
  let epoch = FileTime::from_unix_time(ZIP_EPOCH_SECS, 0);
  let mut stats = NormalizeStats::default();

  // Children first, so touching a file never bumps its parent's mtime after
  // the parent was already normalized.
  for entry in WalkDir::new(root).contents_first(true) {
    let entry = match entry {
      Ok(entry) => entry,
      Err(e) => {
        warn!(error = %e, "unable to visit entry while normalizing timestamps");
        stats.failed += 1;
        continue;
      }
    };

    let result = if entry.path_is_symlink() {
      filetime::set_symlink_file_times(entry.path(), epoch, epoch)
    } else {
      filetime::set_file_times(entry.path(), epoch, epoch)
    };

    match result {
      Ok(()) => stats.updated += 1,
      Err(e) => {
        warn!(path = %entry.path().display(), error = %e, "unable to reset timestamp");
        stats.failed += 1;
      }
    }
  }

  debug!(root = %root.display(), updated = stats.updated, failed = stats.failed, "normalized timestamps");
  stats
}
