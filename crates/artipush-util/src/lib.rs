//! Shared utilities for artipush.
//!
//! This crate provides cross-cutting concerns used by all other artipush crates:
//! error types, the cancellation/deadline context threaded through remote calls,
//! filesystem helpers, content hashing, and terminal status reporting.

pub mod context;
pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
