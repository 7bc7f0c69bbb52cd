use super::base::{fire, BaseVisdomLogger, LoggerConfig, VisdomLog};
use crate::client::{PlotKind, SharedVisdom};
use crate::plugin::{Hook, Interval, Plugin};
use crate::stats::Stats;
use crate::Result;
use serde_json::Value;

/// Logger for any supported plot kind.
///
/// The gathered field values are passed positionally to the plot call,
/// e.g. a histogram logger over `["weights.data"]` plots the values found
/// at `weights.data` every time it fires.
///
/// # Example
///
/// ```ignore
/// let hist = VisdomLogger::new(
///     viz.clone(),
///     "histogram",
///     LoggerConfig::new(["random.data"])?
///         .interval(Interval::every(2, Hook::Iteration))
///         .opts(PlotOptions::new().title("Random!").numbins(20)),
/// )?;
/// ```
pub struct VisdomLogger {
    base: BaseVisdomLogger,
    kind: PlotKind,
}

impl VisdomLogger {
    /// Fails with `UnsupportedPlotKind` if `plot_type` is not a known kind.
    pub fn new(viz: SharedVisdom, plot_type: &str, config: LoggerConfig) -> Result<Self> {
        let kind = plot_type.parse::<PlotKind>()?;
        Ok(Self::with_kind(viz, kind, config))
    }

    pub fn with_kind(viz: SharedVisdom, kind: PlotKind, config: LoggerConfig) -> Self {
        Self {
            base: BaseVisdomLogger::new(viz, config),
            kind,
        }
    }

    pub fn kind(&self) -> PlotKind {
        self.kind
    }

    pub fn win(&self) -> Option<&str> {
        self.base.win()
    }
}

impl VisdomLog for VisdomLogger {
    fn base(&self) -> &BaseVisdomLogger {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseVisdomLogger {
        &mut self.base
    }

    fn log(&mut self, values: Vec<Value>) -> Result<()> {
        self.base.plot_windowed(self.kind, &values)
    }
}

impl Plugin for VisdomLogger {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn interval(&self) -> &Interval {
        self.base.interval()
    }

    fn on_hook(&mut self, hook: Hook, stats: &Stats) -> Result<()> {
        fire(self, hook, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::recording::{RecordingVisdom, VisdomCall};
    use crate::client::PlotOptions;
    use crate::VizlogError;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_unsupported_kind() {
        let viz = Arc::new(RecordingVisdom::new());
        let result = VisdomLogger::new(viz.clone(), "violin", LoggerConfig::new(["x"]).unwrap());
        assert!(matches!(result, Err(VizlogError::UnsupportedPlotKind(_))));
        assert!(viz.calls().is_empty());
    }

    #[test]
    fn test_histogram_logs_and_reuses_window() {
        let viz = Arc::new(RecordingVisdom::new());
        let mut logger = VisdomLogger::new(
            viz.clone(),
            "histogram",
            LoggerConfig::new(["random.data"]).unwrap()
                .opts(PlotOptions::new().title("Random!").numbins(4)),
        )
        .unwrap();
        let stats = Stats::from_value(json!({ "random": { "data": [0.1, 0.2, 0.9, 0.4] } })).unwrap();

        logger.on_hook(Hook::Iteration, &stats).unwrap();
        logger.on_hook(Hook::Iteration, &stats).unwrap();

        let calls = viz.calls();
        assert_eq!(calls.len(), 2);
        match &calls[1] {
            VisdomCall::Plot { kind, win, message, .. } => {
                assert_eq!(*kind, PlotKind::Histogram);
                assert_eq!(win.as_deref(), Some("window_1"));
                assert_eq!(message["layout"]["title"], json!("Random!"));
            }
            other => panic!("expected plot, got {:?}", other),
        }
        assert_eq!(logger.win(), Some("window_1"));
    }

    #[test]
    fn test_epoch_saves_once() {
        let viz = Arc::new(RecordingVisdom::new());
        let mut logger = VisdomLogger::new(viz.clone(), "bar", LoggerConfig::new(["counts"]).unwrap()).unwrap();
        let stats = Stats::from_value(json!({ "counts": [3, 1, 2] })).unwrap();

        logger.on_hook(Hook::Epoch, &stats).unwrap();
        assert_eq!(viz.plot_count(), 1);
        assert_eq!(viz.save_count(), 1);
    }

    #[test]
    fn test_every_named_kind_constructs() {
        let viz = Arc::new(RecordingVisdom::new());
        for name in ["image", "images", "svg", "pie", "stem", "surf", "contour", "quiver"] {
            let logger = VisdomLogger::new(viz.clone(), name, LoggerConfig::new(["x"]).unwrap());
            assert!(logger.is_ok(), "{} should be supported", name);
        }
    }

    #[test]
    fn test_image_logger_sends_png() {
        let viz = Arc::new(RecordingVisdom::new());
        let mut logger = VisdomLogger::new(
            viz.clone(),
            "image",
            LoggerConfig::new(["image.data"]).unwrap(),
        )
        .unwrap();
        let stats = Stats::from_value(json!({ "image": { "data": [[[0.0, 0.5], [1.0, 0.25]]] } })).unwrap();

        logger.on_hook(Hook::Iteration, &stats).unwrap();

        match &viz.calls()[0] {
            VisdomCall::Plot { kind, message, .. } => {
                assert_eq!(*kind, PlotKind::Image);
                let src = message["data"][0]["content"]["src"].as_str().unwrap();
                assert!(src.starts_with("data:image/png;base64,"));
            }
            other => panic!("expected plot, got {:?}", other),
        }
    }
}

