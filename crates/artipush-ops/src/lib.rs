//! High-level operations for artipush.
//!
//! Each module implements one user-facing workflow on top of the core, store
//! and util crates. The CLI is a thin layer over these functions.

pub mod ops_config;
pub mod ops_push;

pub use ops_push::Publisher;
