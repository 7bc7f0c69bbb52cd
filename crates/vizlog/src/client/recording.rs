//! In-memory Visdom stand-in that records every call.

use super::payload::{plot_message, update_message};
use super::{PlotKind, PlotOptions, Visdom};
use crate::Result;
use serde_json::Value;
use std::sync::Mutex;

/// A call received by [`RecordingVisdom`].
#[derive(Clone, Debug, PartialEq)]
pub enum VisdomCall {
    Plot {
        kind: PlotKind,
        win: Option<String>,
        env: Option<String>,
        /// The message the HTTP client would have sent
        message: Value,
        /// Window id handed back to the caller
        returned: String,
    },
    UpdateTrace {
        win: String,
        env: Option<String>,
        message: Value,
    },
    Save {
        envs: Vec<String>,
    },
}

impl VisdomCall {
    pub fn is_plot(&self) -> bool {
        matches!(self, VisdomCall::Plot { .. })
    }

    pub fn is_update(&self) -> bool {
        matches!(self, VisdomCall::UpdateTrace { .. })
    }

    pub fn is_save(&self) -> bool {
        matches!(self, VisdomCall::Save { .. })
    }
}

#[derive(Default)]
struct Recorded {
    calls: Vec<VisdomCall>,
    windows: usize,
}

/// Accepts every call a real server would, builds the same messages, and
/// keeps them for inspection instead of sending them.
///
/// A plot without a window gets a fresh id (`window_1`, `window_2`, ...);
/// a plot into an existing window returns that window's id.
pub struct RecordingVisdom {
    default_env: String,
    recorded: Mutex<Recorded>,
}

impl Default for RecordingVisdom {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingVisdom {
    pub fn new() -> Self {
        Self::with_env("main")
    }

    pub fn with_env(default_env: impl Into<String>) -> Self {
        Self {
            default_env: default_env.into(),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn calls(&self) -> Vec<VisdomCall> {
        self.lock().calls.clone()
    }

    pub fn plot_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_plot()).count()
    }

    pub fn update_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_update()).count()
    }

    pub fn save_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_save()).count()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Visdom for RecordingVisdom {
    fn plot(
        &self,
        kind: PlotKind,
        args: &[Value],
        win: Option<&str>,
        env: Option<&str>,
        opts: &PlotOptions,
    ) -> Result<String> {
        let message = plot_message(kind, args, win, env, opts)?;
        let mut recorded = self.lock();
        let returned = match win {
            Some(win) => win.to_string(),
            None => {
                recorded.windows += 1;
                format!("window_{}", recorded.windows)
            }
        };
        recorded.calls.push(VisdomCall::Plot {
            kind,
            win: win.map(str::to_string),
            env: env.map(str::to_string),
            message,
            returned: returned.clone(),
        });
        Ok(returned)
    }

    fn update_trace(
        &self,
        x: &Value,
        y: &Value,
        win: &str,
        env: Option<&str>,
        opts: &PlotOptions,
    ) -> Result<String> {
        let message = update_message(x, y, win, env, opts)?;
        self.lock().calls.push(VisdomCall::UpdateTrace {
            win: win.to_string(),
            env: env.map(str::to_string),
            message,
        });
        Ok(win.to_string())
    }

    fn save(&self, envs: &[String]) -> Result<()> {
        self.lock().calls.push(VisdomCall::Save {
            envs: envs.to_vec(),
        });
        Ok(())
    }

    fn default_env(&self) -> &str {
        &self.default_env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assigns_fresh_windows() {
        let viz = RecordingVisdom::new();
        let opts = PlotOptions::new();
        let first = viz.plot(PlotKind::Bar, &[json!([1])], None, None, &opts).unwrap();
        let second = viz.plot(PlotKind::Bar, &[json!([1])], None, None, &opts).unwrap();
        let reused = viz.plot(PlotKind::Bar, &[json!([2])], Some(&first), None, &opts).unwrap();

        assert_eq!(first, "window_1");
        assert_eq!(second, "window_2");
        assert_eq!(reused, "window_1");
        assert_eq!(viz.plot_count(), 3);
    }

    #[test]
    fn test_rejected_calls_are_not_recorded() {
        let viz = RecordingVisdom::new();
        assert!(viz
            .plot(PlotKind::Heatmap, &[json!("nope")], None, None, &PlotOptions::new())
            .is_err());
        assert!(viz.calls().is_empty());
    }

    #[test]
    fn test_counts_by_kind() {
        let viz = RecordingVisdom::with_env("eval");
        viz.save(&["eval".to_string()]).unwrap();
        viz.update_trace(&json!([1]), &json!([2]), "w", None, &PlotOptions::new())
            .unwrap();
        assert_eq!(viz.save_count(), 1);
        assert_eq!(viz.update_count(), 1);
        assert_eq!(viz.default_env(), "eval");

        viz.clear();
        assert!(viz.calls().is_empty());
    }
}
