//! Application context — unified state passed to every command handler.
//!
//! `AppContext` owns the output context, the config store and the state
//! manager. Command handlers take `&AppContext` and build the API client or
//! SSH connector they need from it.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::application::services::lifecycle::LifecycleController;
use crate::domain::{ConfigError, MetalConfig, MetalctlConfig, SshConfig};
use crate::infra::config::YamlConfigStore;
use crate::infra::http::UreqTransport;
use crate::infra::metal_api::MetalApiClient;
use crate::infra::state::StateManager;
use crate::output::{HumanRenderer, OutputContext, TerminalReporter};

/// Lifecycle controller wired to the production HTTP stack.
pub type Controller = LifecycleController<MetalApiClient<UreqTransport>>;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    pub no_color: bool,
    pub quiet: bool,
    pub json: bool,
}

/// File locations overriding the defaults under `~/.metalctl`.
#[derive(Default)]
pub struct PathFlags {
    pub config: Option<PathBuf>,
    pub state: Option<PathBuf>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub paths: PathFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context. Quiet under `--json` so only the JSON
    /// document reaches stdout.
    pub output: OutputContext,
    pub mode: OutputMode,
    pub config_store: YamlConfigStore,
    pub state_mgr: StateManager,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if no state path was given and the home directory
    /// cannot be determined.
    pub fn new(flags: AppFlags) -> Result<Self> {
        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let config_store = flags
            .paths
            .config
            .map_or_else(YamlConfigStore::default, YamlConfigStore::with_path);
        let state_mgr = match flags.paths.state {
            Some(path) => StateManager::with_path(path),
            None => StateManager::new()?,
        };

        Ok(Self {
            output: OutputContext::new(
                flags.output.no_color,
                flags.output.quiet || flags.output.json,
            ),
            mode,
            config_store,
            state_mgr,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    #[must_use]
    pub fn renderer(&self) -> HumanRenderer<'_> {
        HumanRenderer::new(&self.output)
    }

    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Load the configuration bundle.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn config(&self) -> Result<MetalctlConfig> {
        self.config_store.load()
    }

    /// The `metal` section with credentials present.
    ///
    /// # Errors
    ///
    /// Returns an error if the section is missing or lacks credentials.
    pub fn metal_config(&self) -> Result<MetalConfig> {
        let path = self.config_store.path()?;
        let metal = self.config()?.metal.ok_or_else(|| ConfigError::MissingSection {
            section: "metal".to_string(),
            path: path.display().to_string(),
        })?;
        metal
            .validate_credentials()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(metal)
    }

    /// The `ssh` section, or an empty one for flags to fill in.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn ssh_config(&self) -> Result<SshConfig> {
        Ok(self.config()?.ssh.unwrap_or_default())
    }

    /// Lifecycle controller for the configured project.
    #[must_use]
    pub fn controller(&self, metal: &MetalConfig) -> Controller {
        LifecycleController::new(MetalApiClient::from_config(UreqTransport::default(), metal))
    }
}
