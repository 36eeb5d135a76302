//! Human-readable terminal renderer.

use crate::domain::{BatchOutcome, CommandResult, DeviceDetails, ReadyState};
use crate::output::OutputContext;

/// Renders domain types as terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    pub fn render_details(&self, details: &DeviceDetails) {
        self.ctx.kv("Device:", &details.id);
        self.ctx.kv("State:", state_display(&details.state));
        self.ctx
            .kv("Address:", details.primary_address().unwrap_or("-"));
        if let Some(hostname) = details.extra.get("hostname").and_then(|v| v.as_str()) {
            self.ctx.kv("Hostname:", hostname);
        }
    }

    pub fn render_ready_state(&self, id: &str, state: &ReadyState) {
        match state {
            ReadyState::Ready(details) => {
                self.ctx.success(&format!("device {id} is ready"));
                self.render_details(details);
            }
            ReadyState::Pending(reason) => {
                self.ctx.info(&format!("device {id} is not ready: {reason}"));
            }
        }
    }

    /// Print every result, then a one-line summary of how the batch ended.
    ///
    /// Command output goes to stdout even under `--quiet`; it is the point of
    /// the command.
    pub fn render_batch(&self, outcome: &BatchOutcome) {
        for result in outcome.results() {
            if !self.ctx.quiet {
                self.ctx.header(&format_result_header(result));
            }
            if !result.stdout.is_empty() {
                println!("{}", result.stdout);
            }
        }
        match outcome {
            BatchOutcome::Complete(results) => {
                let failed = results.iter().filter(|r| !r.succeeded()).count();
                if failed == 0 {
                    self.ctx.success(&format!("{} command(s) completed", results.len()));
                } else {
                    self.ctx.warn(&format!(
                        "{} command(s) completed, {failed} exited non-zero",
                        results.len()
                    ));
                }
            }
            BatchOutcome::Partial {
                failed_at, reason, ..
            } => self
                .ctx
                .error(&format!("session lost at command {}: {reason}", failed_at + 1)),
            BatchOutcome::AuthFailed(reason) => {
                self.ctx.error(&format!("authentication failed: {reason}"));
            }
            BatchOutcome::ConnectFailed(reason) => {
                self.ctx.error(&format!("connection failed: {reason}"));
            }
        }
    }
}

/// `[1] uname -a` or `[2] false (exit 1)`.
#[must_use]
pub fn format_result_header(result: &CommandResult) -> String {
    let position = result.index + 1;
    match result.exit_code {
        Some(0) => format!("[{position}] {}", result.command),
        Some(code) => format!("[{position}] {} (exit {code})", result.command),
        None => format!("[{position}] {} (no exit status)", result.command),
    }
}

/// State string for display, with a placeholder when the service sent none.
#[must_use]
pub fn state_display(state: &str) -> &str {
    if state.is_empty() { "unknown" } else { state }
}
