//! Synthetic training run used by `vizlog demo`.

use anyhow::Result;
use serde_json::json;
use vizlog::prelude::*;

const SMOOTHING: f64 = 0.7;
const NUM_WEIGHTS: usize = 64;

/// Settings for a demo run.
pub struct DemoOptions {
    pub epochs: u64,
    pub iterations: u64,
    pub every: u64,
    pub plot: String,
    pub text_mode: String,
    pub env: Option<String>,
}

/// Decaying loss with a small deterministic wobble.
fn synthetic_loss(step: u64) -> f64 {
    let t = step as f64;
    (-0.05 * t).exp() + 0.05 * (0.7 * t).sin().abs()
}

/// Weights that shrink towards zero as training goes on.
fn synthetic_weights(epoch: u64) -> Vec<f64> {
    let scale = 1.0 / (1.0 + epoch as f64);
    (0..NUM_WEIGHTS)
        .map(|i| (0.37 * i as f64 + epoch as f64).sin() * scale)
        .collect()
}

/// Publishes `loss.*` the way a monitor plugin would: last value, smoothed
/// running average, and the mean over the current epoch.
#[derive(Default)]
struct LossMonitor {
    running_avg: Option<f64>,
    epoch_sum: f64,
    epoch_count: u64,
}

impl LossMonitor {
    fn register(stats: &mut Stats) {
        stats.insert(
            "loss",
            json!({
                "log_format": ":.4f",
                "log_iter_fields": ["{last:.4f}", "({running_avg:.4f})"],
                "log_epoch_fields": ["{epoch_mean:.4f}"],
            }),
        );
    }

    fn update(&mut self, stats: &mut Stats, loss: f64) -> Result<()> {
        let running = match self.running_avg {
            Some(avg) => SMOOTHING * avg + (1.0 - SMOOTHING) * loss,
            None => loss,
        };
        self.running_avg = Some(running);
        self.epoch_sum += loss;
        self.epoch_count += 1;

        stats.set_path(&"loss.last".parse::<FieldPath>()?, json!(loss))?;
        stats.set_path(&"loss.running_avg".parse::<FieldPath>()?, json!(running))?;
        Ok(())
    }

    fn end_epoch(&mut self, stats: &mut Stats) -> Result<f64> {
        let mean = if self.epoch_count == 0 {
            0.0
        } else {
            self.epoch_sum / self.epoch_count as f64
        };
        stats.set_path(&"loss.epoch_mean".parse::<FieldPath>()?, json!(mean))?;
        self.epoch_sum = 0.0;
        self.epoch_count = 0;
        Ok(mean)
    }
}

fn logger_config(fields: &[&str], interval: Interval, env: Option<&str>) -> Result<LoggerConfig> {
    let config = LoggerConfig::new(fields)?.interval(interval);
    Ok(match env {
        Some(env) => config.env(env),
        None => config,
    })
}

/// Register the demo's loggers against `viz`.
pub fn build_host(viz: SharedVisdom, options: &DemoOptions) -> Result<PluginHost> {
    let env = options.env.as_deref();
    let mut host = PluginHost::new();

    host.register(Box::new(VisdomPlotLogger::new(
        viz.clone(),
        &options.plot,
        logger_config(
            &["progress.samples_used", "loss.last"],
            Interval::every(options.every, Hook::Iteration),
            env,
        )?
        .opts(
            PlotOptions::new()
                .title("Training loss")
                .xlabel("samples")
                .ylabel("loss"),
        ),
    )?));

    host.register(Box::new(VisdomTextLogger::new(
        viz.clone(),
        logger_config(
            &["progress", "loss"],
            Interval::every(options.every, Hook::Iteration).and(1, Hook::Epoch),
            env,
        )?
        .opts(PlotOptions::new().title("Progress")),
        &options.text_mode,
    )?));

    host.register(Box::new(VisdomLogger::new(
        viz.clone(),
        "histogram",
        logger_config(&["weights.data"], Interval::every(1, Hook::Epoch), env)?
            .opts(PlotOptions::new().title("Weights").numbins(20)),
    )?));

    let envs = options.env.clone().map(|env| vec![env]);
    host.register(Box::new(VisdomSaver::new(viz, envs, None)));

    LossMonitor::register(host.stats_mut());
    host.stats_mut().insert(
        "progress",
        json!({
            "samples_used": 0,
            "epoch_size": options.iterations,
            "percent": 0.0,
            "log_iter_fields": ["{samples_used}/{epoch_size}", "({percent:.0f}%)"],
            "log_epoch_fields": [],
        }),
    );
    Ok(host)
}

/// Run the synthetic loop, firing iteration and epoch hooks.
pub fn run(viz: SharedVisdom, options: &DemoOptions) -> Result<()> {
    let mut host = build_host(viz, options)?;
    let mut monitor = LossMonitor::default();
    let mut step = 0u64;

    for epoch in 1..=options.epochs {
        for iteration in 1..=options.iterations {
            step += 1;
            let stats = host.stats_mut();
            stats.set_path(&"progress.samples_used".parse::<FieldPath>()?, json!(step))?;
            stats.set_path(
                &"progress.percent".parse::<FieldPath>()?,
                json!(100.0 * iteration as f64 / options.iterations as f64),
            )?;
            monitor.update(stats, synthetic_loss(step))?;
            host.call_hook(Hook::Iteration)?;
        }

        let mean = monitor.end_epoch(host.stats_mut())?;
        host.stats_mut()
            .set_path(&"weights.data".parse::<FieldPath>()?, json!(synthetic_weights(epoch)))?;
        host.call_hook(Hook::Epoch)?;
        tracing::info!(epoch, loss = mean, "Finished epoch");
    }

    Ok(())
}
