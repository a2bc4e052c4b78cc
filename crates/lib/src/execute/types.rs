//! Types for subprocess execution.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur running an external process.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The process could not be started at all.
  #[error("unable to start {cmd} in {dir}: {source}")]
  Spawn {
    cmd: String,
    dir: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The process ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd} (in {dir})")]
  CmdFailed {
    cmd: String,
    dir: PathBuf,
    code: Option<i32>,
    stderr: String,
  },
}

/// One external process invocation.
///
/// The child inherits the ambient environment; `env_remove` is applied first,
/// then `env`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
  pub command: String,
  pub args: Vec<String>,
  pub env: BTreeMap<String, String>,
  pub env_remove: Vec<String>,
  pub dir: PathBuf,
}

impl Execution {
  pub fn new(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
      ..Default::default()
    }
  }

  pub fn with_args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn without_env(mut self, key: impl Into<String>) -> Self {
    self.env_remove.push(key.into());
    self
  }

  pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.dir = dir.into();
    self
  }

  /// Command line for log and error messages.
  pub fn display(&self) -> String {
    std::iter::once(self.command.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Captured output of a successful process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
  pub stdout: String,
  pub stderr: String,
}
