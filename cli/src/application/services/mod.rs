//! Application services — use-case orchestration over port traits.
//!
//! Each service imports only from `crate::domain` and
//! `crate::application::ports`.

pub mod lifecycle;
pub mod operations;
pub mod remote_exec;
