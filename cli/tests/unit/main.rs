//! Unit tests for metalctl
//!
//! These tests use hand-written fakes for the HTTP transport, state store and
//! SSH connector, and run without network or process I/O.

mod config_store;
mod mocks;
mod property_tests;
mod remote_exec;
