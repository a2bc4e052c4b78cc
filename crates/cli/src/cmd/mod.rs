mod build;
mod classpath;
mod helper;
mod info;
mod manifest;

pub use build::cmd_build;
pub use classpath::cmd_classpath;
pub use helper::cmd_helper;
pub use info::cmd_info;
pub use manifest::cmd_manifest;
