//! vizlog CLI
//!
//! Command-line interface for driving Visdom loggers and managing a server.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use vizlog::prelude::*;

mod demo;

#[derive(Parser)]
#[command(name = "vizlog")]
#[command(version, about = "vizlog - Visdom logging for training loops", long_about = None)]
struct Cli {
    /// JSON file with Visdom connection settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Visdom server, e.g. http://localhost
    #[arg(long, global = true)]
    server: Option<String>,

    /// Visdom port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Visdom environment
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic training loop that logs to Visdom
    Demo {
        /// Number of epochs
        #[arg(long, default_value = "3")]
        epochs: u64,

        /// Iterations per epoch
        #[arg(long, default_value = "20")]
        iterations: u64,

        /// Log every N iterations
        #[arg(long, default_value = "5")]
        every: u64,

        /// Loss plot type (scatter, line)
        #[arg(long, default_value = "line")]
        plot: String,

        /// Text panel update mode (REPLACE, APPEND)
        #[arg(long, default_value = "APPEND")]
        text_mode: String,

        /// Record calls in memory instead of contacting a server
        #[arg(long)]
        dry_run: bool,
    },

    /// Persist environments on the server
    Save {
        /// Environments to save (defaults to the configured environment)
        envs: Vec<String>,
    },

    /// Check that the server is reachable
    Ping,

    /// List supported plot kinds
    Kinds,
}

/// Config file, then environment variables, then command-line flags.
fn load_config(cli: &Cli) -> Result<VisdomConfig> {
    let mut config = match &cli.config {
        Some(path) => VisdomConfig::from_file(path)?,
        None => VisdomConfig::from_env()?,
    };
    if let Some(server) = &cli.server {
        config.server = server.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(env) = &cli.env {
        config.env = env.clone();
    }
    Ok(config)
}

fn connect(config: VisdomConfig) -> Result<VisdomClient> {
    let url = config.endpoint_url("");
    let client = VisdomClient::new(config)?;
    if !client.check_connection() {
        bail!("Visdom server at {} is unreachable", url);
    }
    Ok(client)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Demo {
            epochs,
            iterations,
            every,
            plot,
            text_mode,
            dry_run,
        } => {
            let options = demo::DemoOptions {
                epochs,
                iterations,
                every,
                plot,
                text_mode,
                env: cli.env.clone(),
            };
            tracing::info!(epochs, iterations, every, dry_run, "Starting demo run");

            if dry_run {
                let recorder = Arc::new(RecordingVisdom::with_env(config.env.clone()));
                demo::run(recorder.clone(), &options)?;
                println!(
                    "Recorded {} calls: {} plots, {} trace updates, {} saves",
                    recorder.calls().len(),
                    recorder.plot_count(),
                    recorder.update_count(),
                    recorder.save_count()
                );
            } else {
                let client = connect(config)?;
                demo::run(Arc::new(client), &options)?;
            }
        }
        Commands::Save { envs } => {
            let envs = if envs.is_empty() {
                vec![config.env.clone()]
            } else {
                envs
            };
            let client = connect(config)?;
            client.save(&envs)?;
            println!("Saved environments: {}", envs.join(", "));
        }
        Commands::Ping => {
            let url = config.endpoint_url("");
            connect(config)?;
            println!("Visdom server at {} is up", url);
        }
        Commands::Kinds => {
            list_kinds();
        }
    }

    Ok(())
}

fn list_kinds() {
    println!("Supported plot kinds:");
    println!();
    for kind in PlotKind::ALL {
        let note = match kind {
            PlotKind::Scatter => "points; also usable with VisdomPlotLogger",
            PlotKind::Line => "lines; also usable with VisdomPlotLogger",
            PlotKind::Bar => "one bar per value, one series per column",
            PlotKind::Histogram => "binned values (opts.numbins, default 30)",
            PlotKind::Heatmap => "2-D matrix",
            PlotKind::Boxplot => "one box per column",
            PlotKind::Text => "HTML text panel",
            PlotKind::Stem => "vertical stems from zero, one series per column",
            PlotKind::Pie => "non-negative slices (opts.legend labels them)",
            PlotKind::Surf => "3-D surface over a 2-D matrix",
            PlotKind::Contour => "contour lines over a 2-D matrix",
            PlotKind::Quiver => "arrow field from u and v matrices",
            PlotKind::Svg => "SVG markup panel",
            PlotKind::Image => "HxW or CxHxW array as a PNG",
            PlotKind::Images => "BxCxHxW batch tiled into one PNG grid",
        };
        println!("  {:<10} {}", kind.name(), note);
    }
}
