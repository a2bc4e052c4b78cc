//! Process execution on tokio.

use tokio::process::Command;
use tracing::{debug, info};

use super::types::{ExecOutput, ExecuteError, Execution};
use super::Executor;

/// Runs executions as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

impl Executor for CommandExecutor {
  async fn execute(&self, execution: Execution) -> Result<ExecOutput, ExecuteError> {
    let cmd = execution.display();
    info!(cmd = %cmd, dir = %execution.dir.display(), "executing command");

    let mut command = Command::new(&execution.command);
    command.args(&execution.args);
    if !execution.dir.as_os_str().is_empty() {
      command.current_dir(&execution.dir);
    }
    for key in &execution.env_remove {
      command.env_remove(key);
    }
    for (key, value) in &execution.env {
      command.env(key, value);
    }

    let output = command.output().await.map_err(|source| ExecuteError::Spawn {
      cmd: cmd.clone(),
      dir: execution.dir.clone(),
      source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }

    if !output.status.success() {
      return Err(ExecuteError::CmdFailed {
        cmd,
        dir: execution.dir,
        code: output.status.code(),
        stderr,
      });
    }

    Ok(ExecOutput { stdout, stderr })
  }
}
