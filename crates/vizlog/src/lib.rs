//! # vizlog
//!
//! Training-loop plugins that forward statistics to a Visdom server.
//!
//! ## Overview
//!
//! vizlog provides:
//! - A `Stats` tree with dotted field-path lookups (`progress.percent`)
//! - The `Plugin` trait and a minimal `PluginHost` that fires plugins on hooks
//! - Visdom loggers: generic plots, scatter/line traces, and text panels
//! - `VisdomSaver` for periodically persisting server-side environments
//! - A blocking HTTP `VisdomClient` plus an in-memory `RecordingVisdom`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vizlog::prelude::*;
//!
//! let viz: SharedVisdom = Arc::new(VisdomClient::new(VisdomConfig::default())?);
//!
//! let mut host = PluginHost::new();
//! host.register(Box::new(VisdomPlotLogger::new(
//!     viz.clone(),
//!     "line",
//!     LoggerConfig::new(["progress.samples_used", "loss.last"])?
//!         .interval(Interval::every(10, Hook::Iteration)),
//! )?));
//! host.register(Box::new(VisdomSaver::new(viz, None, None)));
//!
//! host.stats_mut().set_path(&"loss.last".parse()?, 0.25.into())?;
//! host.call_hook(Hook::Iteration)?;
//! ```

pub mod client;
pub mod config;
pub mod format;
pub mod log;
pub mod plugin;
pub mod stats;

pub use client::{PlotKind, PlotOptions, SharedVisdom, Visdom, VisdomClient};
pub use config::VisdomConfig;
pub use stats::{FieldPath, Stats};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::recording::{RecordingVisdom, VisdomCall};
    pub use crate::client::{PlotKind, PlotOptions, SharedVisdom, Visdom, VisdomClient};
    pub use crate::config::VisdomConfig;
    pub use crate::log::{
        BaseVisdomLogger, LoggerConfig, UpdateType, VisdomLog, VisdomLogger, VisdomPlotLogger,
        VisdomSaver, VisdomTextLogger,
    };
    pub use crate::plugin::{Hook, Interval, Plugin, PluginHost, Trigger};
    pub use crate::stats::{FieldPath, Stats};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum VizlogError {
    #[error("Field '{path}' not found: missing key '{key}'")]
    FieldNotFound { path: String, key: String },

    #[error("Unsupported plot kind '{0}'")]
    UnsupportedPlotKind(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Visdom server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, VizlogError>;
