use super::base::{fire, BaseVisdomLogger, LoggerConfig, VisdomLog};
use crate::client::{PlotKind, SharedVisdom};
use crate::plugin::{Hook, Interval, Plugin};
use crate::stats::Stats;
use crate::{Result, VizlogError};
use serde_json::Value;

/// Scatter or line plot that grows one point per firing.
///
/// The first call creates the window from a single point; every later call
/// appends `(x, y)` to that window's trace.
///
/// # Example
///
/// ```ignore
/// let logger = VisdomPlotLogger::new(
///     viz.clone(),
///     "line",
///     LoggerConfig::new(["progress.samples_used", "loss.last"])?
///         .interval(Interval::every(2, Hook::Iteration)),
/// )?;
/// host.register(Box::new(logger));
/// ```
pub struct VisdomPlotLogger {
    base: BaseVisdomLogger,
    kind: PlotKind,
}

impl VisdomPlotLogger {
    /// `plot_type` must be `scatter` or `line`.
    ///
    /// The requested type is always used, whether or not the options carry a
    /// `plot_type` key.
    pub fn new(viz: SharedVisdom, plot_type: &str, config: LoggerConfig) -> Result<Self> {
        let kind = match plot_type.parse::<PlotKind>()? {
            kind @ (PlotKind::Scatter | PlotKind::Line) => kind,
            _ => return Err(VizlogError::UnsupportedPlotKind(plot_type.to_string())),
        };
        Ok(Self {
            base: BaseVisdomLogger::new(viz, config),
            kind,
        })
    }

    pub fn kind(&self) -> PlotKind {
        self.kind
    }

    pub fn win(&self) -> Option<&str> {
        self.base.win()
    }

    fn create(&mut self, values: Vec<Value>) -> Result<()> {
        let args = match self.kind {
            PlotKind::Line => {
                let [x, y] = xy(values)?;
                vec![Value::Array(vec![y]), Value::Array(vec![x])]
            }
            _ => vec![Value::Array(vec![Value::Array(values)])],
        };
        self.base.plot_windowed(self.kind, &args)
    }

    fn append(&self, win: &str, values: Vec<Value>) -> Result<()> {
        let [x, y] = xy(values)?;
        let base = &self.base;
        base.viz().update_trace(
            &Value::Array(vec![x]),
            &Value::Array(vec![y]),
            win,
            base.env(),
            base.opts(),
        )?;
        tracing::debug!(win, "Appended point");
        Ok(())
    }
}

fn xy(values: Vec<Value>) -> Result<[Value; 2]> {
    let count = values.len();
    <[Value; 2]>::try_from(values).map_err(|_| {
        VizlogError::InvalidArgument(format!(
            "plot loggers take exactly 2 values (x, y), got {}",
            count
        ))
    })
}

impl VisdomLog for VisdomPlotLogger {
    fn base(&self) -> &BaseVisdomLogger {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseVisdomLogger {
        &mut self.base
    }

    fn log(&mut self, values: Vec<Value>) -> Result<()> {
        match self.base.win().map(str::to_string) {
            Some(win) => self.append(&win, values),
            None => self.create(values),
        }
    }
}

impl Plugin for VisdomPlotLogger {
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
