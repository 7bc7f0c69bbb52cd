//! Shared state and hook handling for Visdom loggers.

use crate::client::{PlotKind, PlotOptions, SharedVisdom};
use crate::plugin::{Hook, Interval, Plugin};
use crate::stats::{FieldPath, Stats};
use crate::{Result, VizlogError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a logger reads and where it draws.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Stats to read, in the order they are passed to `log`
    pub fields: Vec<FieldPath>,
    /// When to fire; defaults to every iteration and every epoch
    #[serde(default = "default_interval")]
    pub interval: Interval,
    /// Existing window to draw into
    #[serde(default)]
    pub win: Option<String>,
    /// Target environment; the connection's default when unset
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub opts: PlotOptions,
}

fn default_interval() -> Interval {
    Interval::every(1, Hook::Iteration).and(1, Hook::Epoch)
}

impl LoggerConfig {
    /// Create a config reading the given dotted field names.
    ///
    /// Fails on an empty field name or an empty segment such as `"a..b"`.
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = fields
            .into_iter()
            .map(|f| f.as_ref().parse())
            .collect::<Result<Vec<FieldPath>>>()?;
        Ok(Self {
            fields,
            interval: default_interval(),
            win: None,
            env: None,
            opts: PlotOptions::default(),
        })
    }

    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn win(mut self, win: impl Into<String>) -> Self {
        self.win = Some(win.into());
        self
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn opts(mut self, opts: PlotOptions) -> Self {
        self.opts = opts;
        self
    }
}

/// State every Visdom logger carries: its configuration, the shared
/// connection, and the window it draws into.
///
/// On its own it cannot log; [`VisdomLog::log`] fails with
/// [`VizlogError::NotImplemented`]. Concrete loggers wrap it.
pub struct BaseVisdomLogger {
    viz: SharedVisdom,
    fields: Vec<FieldPath>,
    interval: Interval,
    win: Option<String>,
    env: Option<String>,
    opts: PlotOptions,
}

impl BaseVisdomLogger {
    pub fn new(viz: SharedVisdom, config: LoggerConfig) -> Self {
        Self {
            viz,
            fields: config.fields,
            interval: config.interval,
            win: config.win,
            env: config.env,
            opts: config.opts,
        }
    }

    pub fn viz(&self) -> &SharedVisdom {
        &self.viz
    }

    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    /// Window id; set by the first successful plot call.
    pub fn win(&self) -> Option<&str> {
        self.win.as_deref()
    }

    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn opts(&self) -> &PlotOptions {
        &self.opts
    }

    /// Resolve every configured field against `stats`, in order.
    pub fn gather(&self, stats: &Stats) -> Result<Vec<Value>> {
        self.fields
            .iter()
            .map(|field| stats.resolve(field).cloned())
            .collect()
    }

    /// Plot into this logger's window and remember the id the server returns.
    pub fn plot_windowed(&mut self, kind: PlotKind, args: &[Value]) -> Result<()> {
        let win = self
            .viz
            .plot(kind, args, self.win.as_deref(), self.env.as_deref(), &self.opts)?;
        if self.win.as_deref() != Some(win.as_str()) {
            tracing::info!(%kind, win = %win, "Visdom window assigned");
        }
        self.win = Some(win);
        Ok(())
    }

    /// Ask the server to persist this logger's environment.
    pub fn save_env(&self) -> Result<()> {
        let env = self
            .env
            .clone()
            .unwrap_or_else(|| self.viz.default_env().to_string());
        self.viz.save(&[env])
    }
}

/// The logging capability of a Visdom logger.
pub trait VisdomLog {
    fn base(&self) -> &BaseVisdomLogger;

    fn base_mut(&mut self) -> &mut BaseVisdomLogger;

    /// Send already-gathered field values to Visdom.
    fn log(&mut self, _values: Vec<Value>) -> Result<()> {
        Err(VizlogError::NotImplemented(
            "log is not implemented for BaseVisdomLogger; use a concrete logger".to_string(),
        ))
    }
}

impl VisdomLog for BaseVisdomLogger {
    fn base(&self) -> &BaseVisdomLogger {
        self
    }

    fn base_mut(&mut self) -> &mut BaseVisdomLogger {
        self
    }
}

/// Standard hook handling: gather the fields, log them, and persist the
/// environment at the end of every epoch.
pub(crate) fn fire<L: VisdomLog + ?Sized>(logger: &mut L, hook: Hook, stats: &Stats) -> Result<()> {
    let values = logger.base().gather(stats)?;
    logger.log(values)?;
    if hook == Hook::Epoch {
        logger.base().save_env()?;
    }
    Ok(())
}

impl Plugin for BaseVisdomLogger {
    fn name(&self) -> &str {
        "visdom_base"
    }

    fn interval(&self) -> &Interval {
        &self.interval
    }

    fn on_hook(&mut self, hook: Hook, stats: &Stats) -> Result<()> {
        fire(self, hook, stats)
    }
}
