//! Infrastructure implementation of the `ShellConnector` / `ShellSession`
//! ports on top of the system OpenSSH client.
//!
//! One batch is one TCP session: `connect` starts a control master
//! (`ssh -M -N -S <socket>`) authenticated with the private key, every
//! command is a separate channel multiplexed over that socket, and `close`
//! asks the master to exit. The key file, socket and master log live in a
//! private temp directory that is removed when the session is dropped; the
//! master process is killed on drop as well.
//!
//! Every client invocation carries the session key and host-key options, so
//! a lost socket can never fall back to the user's own identities.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::application::ports::{
    CommandRunner, ExecOutput, ShellConnector, ShellSession, TimedOut,
};
use crate::domain::{HostKeyPolicy, SessionError, SshTarget, trim_output, validate_private_key};
use crate::infra::command_runner::TokioCommandRunner;

pub const SSH_PROGRAM: &str = "ssh";

/// Timeout for control commands (`-O check`, `-O exit`).
const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);

const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Exit code OpenSSH uses for its own failures.
const SSH_ERROR_EXIT: i32 = 255;

/// Where a session connects to, without the credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub host: String,
    pub port: u16,
    pub username: String,
}

impl From<&SshTarget> for Destination {
    fn from(target: &SshTarget) -> Self {
        Self {
            host: target.host.clone(),
            port: target.port,
            username: target.username.clone(),
        }
    }
}

/// Files private to one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub key: PathBuf,
    pub control: PathBuf,
    /// Master diagnostics (`ssh -E`).
    pub log: PathBuf,
}

/// Opens multiplexed OpenSSH sessions.
pub struct OpenSshConnector<R> {
    runner: R,
    known_hosts: PathBuf,
}

impl OpenSshConnector<TokioCommandRunner> {
    /// Connector pinning host keys in `~/.metalctl/known_hosts`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_known_hosts(
            TokioCommandRunner::new(),
            home.join(".metalctl").join("known_hosts"),
        ))
    }
}

impl<R> OpenSshConnector<R> {
    /// Connector with an explicit runner and `known_hosts` path (for testing).
    pub fn with_known_hosts(runner: R, known_hosts: PathBuf) -> Self {
        Self {
            runner,
            known_hosts,
        }
    }
}

impl<R: CommandRunner + Clone> ShellConnector for OpenSshConnector<R> {
    type Session = OpenSshSession<R>;

    async fn connect(&self, target: &SshTarget) -> Result<Self::Session, SessionError> {
        validate_private_key(&target.private_key)?;

        let dir = tempfile::Builder::new()
            .prefix("metalctl-")
            .tempdir()
            .map_err(|e| SessionError::Connect(format!("creating session directory: {e}")))?;
        let paths = SessionPaths {
            key: dir.path().join("id"),
            control: dir.path().join("ctl"),
            log: dir.path().join("master.log"),
        };
        write_private_key(&paths.key, &target.private_key)
            .map_err(|e| SessionError::Key(format!("{e:#}")))?;
        if target.host_key_policy != HostKeyPolicy::AcceptAny {
            prepare_known_hosts(&self.known_hosts)
                .map_err(|e| SessionError::Connect(format!("{e:#}")))?;
        }

        let pinned = pinned_options(target.host_key_policy, &self.known_hosts);
        let args = master_args(target, &paths, &pinned);
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        debug!(host = %target.host, policy = %target.host_key_policy, "starting ssh control master");
        let master = self
            .runner
            .spawn(SSH_PROGRAM, &argv)
            .map_err(|e| SessionError::Connect(format!("{e:#}")))?;

        let mut session = OpenSshSession {
            runner: self.runner.clone(),
            master,
            destination: Destination::from(target),
            paths,
            pinned,
            command_timeout: target.command_timeout,
            _dir: dir,
        };
        session.wait_until_ready(target.connect_timeout).await?;
        Ok(session)
    }
}

/// An authenticated control master and the files it uses.
pub struct OpenSshSession<R> {
    runner: R,
    master: tokio::process::Child,
    destination: Destination,
    paths: SessionPaths,
    pinned: Vec<String>,
    command_timeout: Duration,
    _dir: tempfile::TempDir,
}

impl<R: CommandRunner> OpenSshSession<R> {
    async fn wait_until_ready(&mut self, connect_timeout: Duration) -> Result<(), SessionError> {
        let deadline = Instant::now() + connect_timeout + CONTROL_TIMEOUT;
        loop {
            let exited = self
                .master
                .try_wait()
                .map_err(|e| SessionError::Connect(format!("waiting for ssh: {e}")))?;
            if let Some(status) = exited {
                let stderr = self.master_log().await;
                return Err(classify_master_failure(&stderr, status.code()));
            }
            if self.control_command("check").await {
                debug!(host = %self.destination.host, "ssh session established");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::Connect(format!(
                    "timed out after {}s connecting to {}",
                    connect_timeout.as_secs(),
                    self.destination.host
                )));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn control_command(&self, operation: &str) -> bool {
        let args = control_args(&self.destination, &self.paths.control, operation);
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner
            .run_with_timeout(SSH_PROGRAM, &argv, CONTROL_TIMEOUT)
            .await
            .is_ok_and(|o| o.status.success())
    }

    async fn master_log(&self) -> String {
        tokio::fs::read_to_string(&self.paths.log)
            .await
            .unwrap_or_default()
    }

    fn master_alive(&mut self) -> bool {
        matches!(self.master.try_wait(), Ok(None))
    }
}

impl<R: CommandRunner> ShellSession for OpenSshSession<R> {
    async fn exec(&mut self, command: &str) -> Result<ExecOutput, SessionError> {
        if !self.master_alive() {
            return Err(SessionError::Channel("connection lost".to_string()));
        }

        let args = exec_args(&self.destination, &self.paths, &self.pinned, command);
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = match self
            .runner
            .run_with_timeout(SSH_PROGRAM, &argv, self.command_timeout)
            .await
        {
            Ok(output) => output,
            // A timeout costs this channel only.
            Err(e) if e.downcast_ref::<TimedOut>().is_some() => {
                warn!(host = %self.destination.host, command, error = %e, "command timed out");
                return Ok(ExecOutput {
                    stdout: Vec::new(),
                    stderr: e.to_string().into_bytes(),
                    exit_code: None,
                });
            }
            Err(e) => return Err(SessionError::Channel(format!("{e:#}"))),
        };

        let exit_code = output.status.code();
        // 255 is also a legal remote exit code; it only means the session
        // broke when the master is gone too.
        if exit_code == Some(SSH_ERROR_EXIT) && !self.master_alive() {
            let stderr = trim_output(&output.stderr);
            return Err(SessionError::Channel(if stderr.is_empty() {
                "connection lost".to_string()
            } else {
                stderr
            }));
        }
        Ok(ExecOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code,
        })
    }

    async fn close(mut self) {
        if !self.control_command("exit").await {
            debug!(host = %self.destination.host, "control master did not acknowledge exit");
        }
        let _ = self.master.kill().await;
        debug!(host = %self.destination.host, "ssh session closed");
    }
}

// ── Argument construction ────────────────────────────────────────────────────

/// `-o` options enforcing `policy`.
#[must_use]
pub fn host_key_options(policy: HostKeyPolicy, known_hosts: &Path) -> Vec<String> {
    match policy {
        HostKeyPolicy::AcceptAny => vec![
            "StrictHostKeyChecking=no".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "GlobalKnownHostsFile=/dev/null".to_string(),
        ],
        HostKeyPolicy::TrustOnFirstUse => vec![
            "StrictHostKeyChecking=accept-new".to_string(),
            format!("UserKnownHostsFile={}", known_hosts.display()),
        ],
        HostKeyPolicy::Strict => vec![
            "StrictHostKeyChecking=yes".to_string(),
            format!("UserKnownHostsFile={}", known_hosts.display()),
        ],
    }
}

/// `-o` options shared by every invocation of one session: the session key
/// only, no prompts, and the host-key policy.
#[must_use]
pub fn pinned_options(policy: HostKeyPolicy, known_hosts: &Path) -> Vec<String> {
    let mut options = vec![
        "BatchMode=yes".to_string(),
        "IdentitiesOnly=yes".to_string(),
        "IdentityAgent=none".to_string(),
        "PasswordAuthentication=no".to_string(),
        "KbdInteractiveAuthentication=no".to_string(),
        "PreferredAuthentications=publickey".to_string(),
        "LogLevel=ERROR".to_string(),
    ];
    options.extend(host_key_options(policy, known_hosts));
    options
}

/// Arguments for the control master.
#[must_use]
pub fn master_args(target: &SshTarget, paths: &SessionPaths, pinned: &[String]) -> Vec<String> {
    let mut args = vec![
        "-M".to_string(),
        "-N".to_string(),
        "-S".to_string(),
        paths.control.display().to_string(),
        "-E".to_string(),
        paths.log.display().to_string(),
        "-i".to_string(),
        paths.key.display().to_string(),
        "-p".to_string(),
        target.port.to_string(),
        "-l".to_string(),
        target.username.clone(),
    ];
    push_options(&mut args, pinned);
    push_options(
        &mut args,
        &[
            format!("ConnectTimeout={}", target.connect_timeout.as_secs().max(1)),
            "ServerAliveInterval=15".to_string(),
        ],
    );
    args.push("--".to_string());
    args.push(target.host.clone());
    args
}

/// Arguments running `command` over an existing control socket.
///
/// The key and `pinned` options are repeated so that a client which cannot
/// reach the socket authenticates exactly like the master or not at all.
#[must_use]
pub fn exec_args(
    destination: &Destination,
    paths: &SessionPaths,
    pinned: &[String],
    command: &str,
) -> Vec<String> {
    let mut args = vec![
        "-S".to_string(),
        paths.control.display().to_string(),
        "-o".to_string(),
        "ControlMaster=no".to_string(),
        "-i".to_string(),
        paths.key.display().to_string(),
    ];
    push_options(&mut args, pinned);
    args.extend([
        "-p".to_string(),
        destination.port.to_string(),
        "-l".to_string(),
        destination.username.clone(),
        "--".to_string(),
        destination.host.clone(),
        command.to_string(),
    ]);
    args
}

/// Arguments for a control operation (`check`, `exit`).
#[must_use]
pub fn control_args(destination: &Destination, control: &Path, operation: &str) -> Vec<String> {
    vec![
        "-S".to_string(),
        control.display().to_string(),
        "-O".to_string(),
        operation.to_string(),
        "-p".to_string(),
        destination.port.to_string(),
        "-l".to_string(),
        destination.username.clone(),
        "--".to_string(),
        destination.host.clone(),
    ]
}

fn push_options(args: &mut Vec<String>, options: &[String]) {
    for option in options {
        args.push("-o".to_string());
        args.push(option.clone());
    }
}

/// Markers OpenSSH prints when the key is unusable or rejected.
const AUTH_MARKERS: &[&str] = &[
    "Permission denied",
    "Too many authentication failures",
    "Load key",
    "invalid format",
    "no mutual signature",
];

/// Markers OpenSSH prints when the host key policy refuses the server.
const HOST_KEY_MARKERS: &[&str] = &[
    "Host key verification failed",
    "REMOTE HOST IDENTIFICATION HAS CHANGED",
    "host key is known",
];

/// Map the stderr of a control master that exited during setup.
#[must_use]
pub fn classify_master_failure(stderr: &str, code: Option<i32>) -> SessionError {
    let message = stderr
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| !l.is_empty())
        .map_or_else(
            || match code {
                Some(c) => format!("ssh exited with code {c}"),
                None => "ssh was killed by a signal".to_string(),
            },
            str::to_string,
        );

    if AUTH_MARKERS.iter().any(|m| stderr.contains(m)) {
        SessionError::Authentication(message)
    } else if HOST_KEY_MARKERS.iter().any(|m| stderr.contains(m)) {
        SessionError::Connect(format!("host key rejected: {message}"))
    } else {
        SessionError::Connect(message)
    }
}

// ── Private helpers ──────────────────────────────────────────────────────────

fn write_private_key(path: &Path, pem: &str) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("create {}", path.display()))?;
    let pem = pem.trim();
    // OpenSSH refuses key files without a trailing newline.
    writeln!(file, "{pem}").with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn prepare_known_hosts(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))
                .with_context(|| format!("set permissions on {}", parent.display()))?;
        }
    }
    Ok(())
}
