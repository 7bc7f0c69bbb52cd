use crate::client::SharedVisdom;
use crate::plugin::{Hook, Interval, Plugin};
use crate::stats::Stats;
use crate::Result;

/// Persists Visdom environments to the server's disk on a schedule.
///
/// Unless different environments need different schedules, one saver per
/// run is enough.
pub struct VisdomSaver {
    viz: SharedVisdom,
    envs: Vec<String>,
    interval: Interval,
}

impl VisdomSaver {
    /// `envs` defaults to the connection's default environment and
    /// `interval` to once per epoch.
    pub fn new(viz: SharedVisdom, envs: Option<Vec<String>>, interval: Option<Interval>) -> Self {
        let envs = envs.unwrap_or_else(|| vec![viz.default_env().to_string()]);
        Self {
            viz,
            envs,
            interval: interval.unwrap_or_else(|| Interval::every(1, Hook::Epoch)),
        }
    }

    pub fn envs(&self) -> &[String] {
        &self.envs
    }

    /// Save all configured environments in a single request.
    pub fn save(&self) -> Result<()> {
        self.viz.save(&self.envs)
    }
}

impl Plugin for VisdomSaver {
    fn name(&self) -> &str {
        "visdom_saver"
    }

    fn interval(&self) -> &Interval {
        &self.interval
    }

    /// Saves on any hook named in the interval and ignores the rest.
    fn on_hook(&mut self, hook: Hook, _stats: &Stats) -> Result<()> {
        if self.interval.contains(hook) {
            self.save()?;
        }
        Ok(())
    }
}
