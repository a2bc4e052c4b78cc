//! Application manifest reading and runner manifest synthesis.
//!
//! [`AppManifest`] is the parsed form of a packaged application's
//! `META-INF/MANIFEST.MF`; [`write_runner_manifest`] produces the manifest of the
//! runner jar used by the CDS training run.

mod types;
mod writer;

pub use types::*;
pub use writer::*;
