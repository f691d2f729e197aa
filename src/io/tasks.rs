//! Pre/post task hook execution.
//!
//! Each task is a shell command run through `sh -c`. A non-zero exit is
//! reported as a task error; callers in watch mode log it and keep the
//! session alive rather than letting one bad hook kill the watcher.

use tokio::process::Command;
use tracing::info;

use crate::core::config::TaskList;
use crate::core::errors::{MundlerError, Result};

/// Run the configured tasks in order, stopping at the first failure.
pub async fn run_tasks(tasks: Option<&TaskList>) -> Result<()> {
    let Some(tasks) = tasks else {
        return Ok(());
    };

    for command in tasks.commands() {
        info!("Running task '{command}'");
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .await
            .map_err(|e| MundlerError::task(command, format!("failed to spawn: {e}")))?;

        if !status.success() {
            return Err(MundlerError::task(
                command,
                format!("exited with {status}"),
            ));
        }
        info!("Task '{command}' completed successfully");
    }

    Ok(())
}
