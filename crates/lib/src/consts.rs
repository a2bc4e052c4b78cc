//! Shared constants.

/// 1980-01-01T00:00:00Z, the oldest timestamp a zip entry can record.
pub const ZIP_EPOCH_SECS: i64 = 315_532_800;

/// Maximum manifest line length in bytes, continuation lines included.
pub const MANIFEST_MAX_LINE: usize = 72;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
pub const NATIVE_IMAGE_DIR: &str = "META-INF/native-image";

pub const RUNNER_JAR: &str = "runner.jar";
pub const SHARED_ARCHIVE: &str = "application.jsa";
pub const AOT_CACHE: &str = "application.aot";

/// Directory the libraries are relocated into for a CDS layout.
pub const DEPENDENCIES_DIR: &str = "dependencies";
/// Directory the tools jar mode extracts the libraries into.
pub const EXTRACTED_LIB_DIR: &str = "lib";
/// Directory holding the repackaged application classes jar.
pub const APPLICATION_DIR: &str = "application";

/// Marker written into a layer directory once its contribution succeeded.
pub const LAYER_COMPLETE_MARKER: &str = ".bootpack-layer.json";

/// Version of the layer marker format.
pub const LAYER_MARKER_VERSION: u32 = 1;

pub const PERFORMANCE_LAYER: &str = "spring-performance";
pub const WEB_APPLICATION_TYPE_LAYER: &str = "web-application-type";
pub const NATIVE_IMAGE_CLASSPATH_LAYER: &str = "native-image-classpath";
pub const SPRING_CLOUD_BINDINGS_LAYER: &str = "spring-cloud-bindings";

/// Maven artifact name of Spring Cloud Bindings.
pub const SPRING_CLOUD_BINDINGS: &str = "spring-cloud-bindings";

pub const LABEL_SPRING_BOOT_VERSION: &str = "org.springframework.boot.version";
pub const LABEL_IMAGE_TITLE: &str = "org.opencontainers.image.title";
pub const LABEL_IMAGE_VERSION: &str = "org.opencontainers.image.version";
