//! Visdom connection layer.
//!
//! Provides:
//! - `Visdom` trait, the seam every logger talks through
//! - `VisdomClient`, a blocking HTTP implementation
//! - `RecordingVisdom`, an in-memory implementation that records calls
//! - `payload`, the translation of plot requests into Visdom's wire format

mod http;
mod kind;
mod options;
pub mod payload;
pub mod recording;

pub use http::VisdomClient;
pub use kind::PlotKind;
pub use options::PlotOptions;

use crate::Result;
use serde_json::Value;
use std::sync::Arc;

/// Operations exposed by a Visdom server.
///
/// Every plotting call returns the id of the window it drew into. Passing
/// that id back as `win` makes the server update the same widget.
pub trait Visdom: Send + Sync {
    /// Draw `kind` from positional `args` into `win` (or a new window).
    fn plot(
        &self,
        kind: PlotKind,
        args: &[Value],
        win: Option<&str>,
        env: Option<&str>,
        opts: &PlotOptions,
    ) -> Result<String>;

    /// Append points `(x, y)` to the trace in an existing window.
    fn update_trace(
        &self,
        x: &Value,
        y: &Value,
        win: &str,
        env: Option<&str>,
        opts: &PlotOptions,
    ) -> Result<String>;

    /// Persist the named environments on the server.
    fn save(&self, envs: &[String]) -> Result<()>;

    /// Environment used when a caller does not name one.
    fn default_env(&self) -> &str;

    /// Whether the server is reachable.
    fn check_connection(&self) -> bool {
        true
    }
}

/// Connection handle shared by every logger in a run.
pub type SharedVisdom = Arc<dyn Visdom>;
