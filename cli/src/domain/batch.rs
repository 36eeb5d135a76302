//! Remote command batches and their outcomes.

use std::collections::BTreeMap;

use serde::Serialize;

/// Ordered commands submitted together to one remote session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    commands: Vec<String>,
}

impl CommandBatch {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Captured output of one command in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// Position in the batch. Together with `command` this is the result key.
    pub index: usize,
    pub command: String,
    /// Standard output with trailing whitespace removed.
    pub stdout: String,
    /// Remote exit status; `None` when the remote side reported none.
    pub exit_code: Option<i32>,
}

impl CommandResult {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Decode raw stdout and trim trailing whitespace.
#[must_use]
pub fn trim_output(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim_end().to_string()
}

/// How a batch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every command was attempted. Individual commands may still have a
    /// non-zero exit code.
    Complete(Vec<CommandResult>),
    /// The session broke while running command `failed_at`; later commands
    /// were not attempted.
    Partial {
        results: Vec<CommandResult>,
        failed_at: usize,
        reason: String,
    },
    /// The key was unusable or rejected. Nothing ran.
    AuthFailed(String),
    /// The host could not be reached or its identity was refused. Nothing ran.
    ConnectFailed(String),
}

impl BatchOutcome {
    #[must_use]
    pub fn results(&self) -> &[CommandResult] {
        match self {
            Self::Complete(results) | Self::Partial { results, .. } => results,
            Self::AuthFailed(_) | Self::ConnectFailed(_) => &[],
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Short tag used in JSON output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Complete(_) => "complete",
            Self::Partial { .. } => "partial",
            Self::AuthFailed(_) => "auth_failed",
            Self::ConnectFailed(_) => "connect_failed",
        }
    }

    /// Command-keyed view of the results.
    ///
    /// When the same command string appears more than once only the last
    /// result survives; use [`BatchOutcome::results`] to keep every entry.
    #[must_use]
    pub fn by_command(&self) -> BTreeMap<String, String> {
        self.results()
            .iter()
            .map(|r| (r.command.clone(), r.stdout.clone()))
            .collect()
    }
}
