//! Core data types for artipush.
//!
//! This crate defines what a publish step is configured with and what it
//! produces: the registry configuration and its validation, `Artipush.toml`
//! loading with `${env:VAR}` interpolation, the source location handed in by
//! the host pipeline, the resulting artifact record, the static documentation
//! record, and the [`step::PublishStep`] capability trait.
//!
//! This crate is intentionally free of network I/O.

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "Artipush.toml";

/// File name of the optional env file read next to [`CONFIG_FILE`].
pub const ENV_FILE: &str = ".artipush.env";

pub mod artifact;
pub mod config;
pub mod docs;
pub mod properties;
pub mod source;
pub mod step;
