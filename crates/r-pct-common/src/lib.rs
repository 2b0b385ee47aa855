//! ---
//! pct_section: "01-core-functionality"
//! pct_subsection: "module"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Shared primitives and utilities for the R-PCT tooling."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
//! Shared primitives for the R-PCT workspace.
//! This crate exposes configuration loading and logging setup consumed by
//! the CLI and any embedding service.

pub mod config;
pub mod logging;

pub use config::{AppConfig, LoggingConfig, ReportsConfig};
pub use logging::{init_tracing, LogFormat};
