//! Blocking HTTP client for a Visdom server.

use super::payload::{plot_message, save_message, update_message};
use super::{PlotKind, PlotOptions, Visdom};
use crate::config::VisdomConfig;
use crate::{Result, VizlogError};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

/// Talks to Visdom's `events`, `update` and `save` endpoints.
///
/// Requests block until the server answers; errors are returned as-is,
/// there is no retry.
pub struct VisdomClient {
    config: VisdomConfig,
    http: Client,
}

impl VisdomClient {
    pub fn new(config: VisdomConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        tracing::debug!(url = %config.endpoint_url(""), env = %config.env, "Created Visdom client");
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &VisdomConfig {
        &self.config
    }

    /// POST `msg` as JSON and return the response body.
    fn send(&self, endpoint: &str, msg: &Value) -> Result<String> {
        let url = self.config.endpoint_url(endpoint);
        let response = self.http.post(&url).json(msg).send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(VizlogError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn env_or_default<'a>(&'a self, env: Option<&'a str>) -> &'a str {
        env.unwrap_or(&self.config.env)
    }
}

impl Visdom for VisdomClient {
    fn plot(
        &self,
        kind: PlotKind,
        args: &[Value],
        win: Option<&str>,
        env: Option<&str>,
        opts: &PlotOptions,
    ) -> Result<String> {
        let env = self.env_or_default(env);
        let msg = plot_message(kind, args, win, Some(env), opts)?;
        let window = self.send("events", &msg)?;
        tracing::debug!(%kind, win = %window, env, "Plotted");
        Ok(window)
    }

    fn update_trace(
        &self,
        x: &Value,
        y: &Value,
        win: &str,
        env: Option<&str>,
        opts: &PlotOptions,
    ) -> Result<String> {
        let env = self.env_or_default(env);
        let msg = update_message(x, y, win, Some(env), opts)?;
        let window = self.send("update", &msg)?;
        tracing::debug!(win, env, "Appended to trace");
        Ok(window)
    }

    fn save(&self, envs: &[String]) -> Result<()> {
        self.send("save", &save_message(envs))?;
        tracing::info!(?envs, "Saved Visdom environments");
        Ok(())
    }

    fn default_env(&self) -> &str {
        &self.config.env
    }

    fn check_connection(&self) -> bool {
        match self.http.get(self.config.endpoint_url("")).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("Visdom server unreachable: {}", e);
                false
            }
        }
    }
}
