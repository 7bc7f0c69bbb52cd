//! Hooks, firing intervals, and a minimal plugin host.

use crate::stats::Stats;
use crate::{Result, VizlogError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Named point in the training loop where plugins may run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hook {
    Iteration,
    Batch,
    Epoch,
    Update,
}

impl Hook {
    pub const ALL: [Hook; 4] = [Hook::Iteration, Hook::Batch, Hook::Epoch, Hook::Update];

    pub fn as_str(self) -> &'static str {
        match self {
            Hook::Iteration => "iteration",
            Hook::Batch => "batch",
            Hook::Epoch => "epoch",
            Hook::Update => "update",
        }
    }
}

impl FromStr for Hook {
    type Err = VizlogError;

    fn from_str(s: &str) -> Result<Self> {
        Hook::ALL
            .into_iter()
            .find(|hook| hook.as_str() == s)
            .ok_or_else(|| VizlogError::InvalidArgument(format!("unknown hook '{}'", s)))
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire on every `every`-th invocation of `hook`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub every: u64,
    pub hook: Hook,
}

/// Set of `(every, hook)` triggers.
///
/// Parses from `"1:epoch,10:iteration"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interval(Vec<Trigger>);

impl Interval {
    pub fn new(triggers: Vec<Trigger>) -> Result<Self> {
        if let Some(bad) = triggers.iter().find(|t| t.every == 0) {
            return Err(VizlogError::InvalidArgument(format!(
                "interval for '{}' must be at least 1",
                bad.hook
            )));
        }
        Ok(Self(triggers))
    }

    /// Single trigger. `every` values of 0 are clamped to 1.
    pub fn every(every: u64, hook: Hook) -> Self {
        Self(vec![Trigger {
            every: every.max(1),
            hook,
        }])
    }

    /// Add another trigger. `every` values of 0 are clamped to 1.
    pub fn and(mut self, every: u64, hook: Hook) -> Self {
        self.0.push(Trigger {
            every: every.max(1),
            hook,
        });
        self
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct hooks named by the interval, in first-seen order.
    pub fn hooks(&self) -> Vec<Hook> {
        let mut hooks = Vec::new();
        for trigger in &self.0 {
            if !hooks.contains(&trigger.hook) {
                hooks.push(trigger.hook);
            }
        }
        hooks
    }

    pub fn contains(&self, hook: Hook) -> bool {
        self.0.iter().any(|t| t.hook == hook)
    }

    /// Whether the `count`-th invocation (1-based) of `hook` should fire.
    pub fn fires(&self, hook: Hook, count: u64) -> bool {
        self.0
            .iter()
            .any(|t| t.hook == hook && count > 0 && count % t.every == 0)
    }
}

impl FromStr for Interval {
    type Err = VizlogError;

    fn from_str(s: &str) -> Result<Self> {
        let mut triggers = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (every, hook) = part.split_once(':').ok_or_else(|| {
                VizlogError::InvalidArgument(format!(
                    "interval entry '{}' must look like '<every>:<hook>'",
                    part
                ))
            })?;
            let every: u64 = every.trim().parse().map_err(|_| {
                VizlogError::InvalidArgument(format!("invalid interval count '{}'", every))
            })?;
            triggers.push(Trigger {
                every,
                hook: hook.trim().parse::<Hook>()?,
            });
        }
        Interval::new(triggers)
    }
}

/// Component driven by the host at hook points.
pub trait Plugin {
    /// Short name used in log output.
    fn name(&self) -> &str {
        "plugin"
    }

    /// When the host should fire this plugin.
    fn interval(&self) -> &Interval;

    /// Run for `hook`, reading whatever it needs out of `stats`.
    fn on_hook(&mut self, hook: Hook, stats: &Stats) -> Result<()>;
}

/// Owns the run statistics and fires registered plugins on hooks.
///
/// Invocations are counted per hook starting at 1; a plugin with trigger
/// `(k, hook)` runs on every invocation whose count is a multiple of `k`.
/// The first plugin error aborts the remaining plugins for that hook.
#[derive(Default)]
pub struct PluginHost {
    stats: Stats,
    plugins: Vec<Box<dyn Plugin>>,
    counts: HashMap<Hook, u64>,
}

impl PluginHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stats(stats: Stats) -> Self {
        Self {
            stats,
            ..Default::default()
        }
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        tracing::debug!(plugin = plugin.name(), "Registered plugin");
        self.plugins.push(plugin);
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Number of times `hook` has been called so far.
    pub fn hook_count(&self, hook: Hook) -> u64 {
        self.counts.get(&hook).copied().unwrap_or(0)
    }

    pub fn call_hook(&mut self, hook: Hook) -> Result<()> {
        let count = self.counts.entry(hook).or_insert(0);
        *count += 1;
        let count = *count;

        for plugin in &mut self.plugins {
            if plugin.interval().fires(hook, count) {
                tracing::trace!(plugin = plugin.name(), %hook, count, "Firing plugin");
                plugin.on_hook(hook, &self.stats)?;
            }
        }
        Ok(())
    }
}
