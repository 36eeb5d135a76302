//! Best-effort command batches over one secure-shell session.
//!
//! Commands run in order, each as its own remote invocation. A non-zero exit
//! is recorded and the batch moves on; only a broken session stops it. The
//! outcome says exactly how far the batch got instead of raising.

use tracing::{error, info, warn};

use crate::application::ports::{ShellConnector, ShellSession};
use crate::domain::{
    BatchOutcome, CommandBatch, CommandResult, SshTarget, trim_output, validate_private_key,
};

/// Run `batch` on `target` through one session.
///
/// The session is closed on every path after it was opened.
pub async fn run_batch(
    connector: &impl ShellConnector,
    target: &SshTarget,
    batch: &CommandBatch,
) -> BatchOutcome {
    if let Err(e) = validate_private_key(&target.private_key) {
        error!(host = %target.host, error = %e, "authentication failed, check the private key");
        return BatchOutcome::AuthFailed(e.to_string());
    }

    info!(host = %target.host, user = %target.username, commands = batch.len(), "opening session");
    let mut session = match connector.connect(target).await {
        Ok(session) => session,
        Err(e) if e.is_authentication() => {
            error!(host = %target.host, error = %e, "authentication failed, check the private key");
            return BatchOutcome::AuthFailed(e.to_string());
        }
        Err(e) => {
            error!(host = %target.host, error = %e, "ssh connection failed");
            return BatchOutcome::ConnectFailed(e.to_string());
        }
    };

    let mut results = Vec::with_capacity(batch.len());
    let mut failure = None;
    for (index, command) in batch.iter().enumerate() {
        info!(index, command, "executing command");
        match session.exec(command).await {
            Ok(output) => {
                if output.exit_code != Some(0) {
                    warn!(
                        index,
                        command,
                        exit_code = ?output.exit_code,
                        stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                        "command failed, continuing with the batch"
                    );
                }
                results.push(CommandResult {
                    index,
                    command: command.to_string(),
                    stdout: trim_output(&output.stdout),
                    exit_code: output.exit_code,
                });
            }
            Err(e) => {
                error!(index, command, error = %e, "ssh session failed, aborting the batch");
                failure = Some((index, e.to_string()));
                break;
            }
        }
    }

    session.close().await;

    match failure {
        None => {
            info!(host = %target.host, commands = results.len(), "batch complete");
            BatchOutcome::Complete(results)
        }
        Some((failed_at, reason)) => BatchOutcome::Partial {
            results,
            failed_at,
            reason,
        },
    }
}
