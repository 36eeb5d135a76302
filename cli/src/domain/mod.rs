//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod batch;
pub mod config;
pub mod device;
pub mod error;
pub mod ssh;
pub mod state;

pub use batch::{BatchOutcome, CommandBatch, CommandResult, trim_output};
pub use config::{MetalConfig, MetalctlConfig, SshConfig};
pub use device::{
    DeviceDetails, EnsureCreated, PendingReason, ProvisionRequest, ReadyState, StopOutcome,
};
pub use error::{ConfigError, DeviceAction, DeviceError, LifecycleError, SessionError, TransportError};
pub use ssh::{HostKeyPolicy, SshTarget, validate_private_key};
pub use state::DeviceRecord;
