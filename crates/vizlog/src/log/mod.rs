//! Visdom logging plugins.
//!
//! Provides:
//! - `BaseVisdomLogger` and the `VisdomLog` trait shared by all loggers
//! - `VisdomLogger` for any supported plot kind
//! - `VisdomPlotLogger` for scatter/line traces that grow point by point
//! - `VisdomTextLogger` for formatted text panels
//! - `VisdomSaver` for persisting environments on the server

mod base;
mod generic;
mod plot;
mod saver;
mod text;

pub use base::{BaseVisdomLogger, LoggerConfig, VisdomLog};
pub use generic::VisdomLogger;
pub use plot::VisdomPlotLogger;
pub use saver::VisdomSaver;
pub use text::{UpdateType, VisdomTextLogger, LINE_BREAK};
