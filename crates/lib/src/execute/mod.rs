//! External process execution.
//!
//! Every process the pipeline starts (archive extraction, the training run)
//! goes through the [`Executor`] trait. Production code uses
//! [`CommandExecutor`]; tests inject a recorder so nothing is spawned.
//!
//! Executions are awaited one at a time by the caller. There is no timeout and
//! no retry: a hung JVM blocks the build, and any failure is returned as-is.

mod cmd;
mod types;

use std::future::Future;

pub use cmd::CommandExecutor;
pub use types::*;

/// Runs [`Execution`]s.
pub trait Executor: Send + Sync {
  /// Run one process to completion and capture its output.
  ///
  /// A non-zero exit status is an error.
  fn execute(&self, execution: Execution) -> impl Future<Output = Result<ExecOutput, ExecuteError>> + Send;
}

impl<E: Executor> Executor for &E {
  fn execute(&self, execution: Execution) -> impl Future<Output = Result<ExecOutput, ExecuteError>> + Send {
    (**self).execute(execution)
  }
}
