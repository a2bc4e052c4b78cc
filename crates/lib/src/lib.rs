//! bootpack-lib: Spring Boot build-time optimization
//!
//! This crate turns a Spring Boot application into launch-ready output:
//! - `manifest` / `classpath`: read the application manifest and its classpath index
//! - `extract` / `archive`: rebuild the application into a CDS-friendly layout
//! - `performance`: run the CDS training run and contribute the shared archive
//! - `layer`: fingerprinted output layers that are reused while inputs are unchanged
//! - `build`: plan and execute a complete build
//! - `metadata` / `generations`: configuration metadata labels and end-of-support checks
//! - `helper`: launch-time `JAVA_TOOL_OPTIONS` contributions

pub mod archive;
pub mod build;
pub mod classpath;
pub mod config;
pub mod consts;
pub mod dependencies;
pub mod execute;
pub mod extract;
pub mod format;
pub mod generations;
pub mod helper;
pub mod jvm;
pub mod layer;
pub mod manifest;
pub mod metadata;
pub mod native_image;
pub mod performance;
pub mod slices;
pub mod timestamps;
pub mod util;
pub mod web_app_type;
