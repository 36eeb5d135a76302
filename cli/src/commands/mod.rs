//! Command implementations

pub mod device;
pub mod exec;
pub mod version;
