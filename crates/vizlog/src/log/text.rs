use super::base::{BaseVisdomLogger, LoggerConfig, VisdomLog};
use crate::client::{PlotKind, SharedVisdom};
use crate::format::{format_template, FormatArgs};
use crate::plugin::{Hook, Interval, Plugin};
use crate::stats::{FieldPath, Stats};
use crate::{Result, VizlogError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Separator between appended messages.
pub const LINE_BREAK: &str = "<br>";

const SEPARATOR_WIDTH: usize = 80;

/// How a new message combines with the text already in the window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpdateType {
    #[default]
    Replace,
    Append,
}

impl FromStr for UpdateType {
    type Err = VizlogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "REPLACE" => Ok(UpdateType::Replace),
            "APPEND" => Ok(UpdateType::Append),
            other => Err(VizlogError::InvalidArgument(format!(
                "update type '{}' not found, must be one of REPLACE, APPEND",
                other
            ))),
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UpdateType::Replace => "REPLACE",
            UpdateType::Append => "APPEND",
        })
    }
}

/// Text window showing formatted stats.
///
/// Stats published by monitors carry their own display templates: an
/// object stat lists them under `log_iter_fields` and `log_epoch_fields`
/// (rendered against the object's keys, e.g. `"{last:.4f}"`), and may name
/// itself with `log_name`. A scalar stat is rendered with its parent's
/// `log_format` and `log_unit`. Columns are padded to stay aligned across
/// calls.
///
/// # Example
///
/// ```ignore
/// let logger = VisdomTextLogger::new(
///     viz.clone(),
///     LoggerConfig::new(["progress", "loss"])?.interval(Interval::every(2, Hook::Iteration)),
///     "APPEND",
/// )?;
/// ```
pub struct VisdomTextLogger {
    base: BaseVisdomLogger,
    update_type: UpdateType,
    text: String,
    /// Widest output seen, keyed by (field index, output index)
    widths: HashMap<(usize, usize), usize>,
}

impl VisdomTextLogger {
    /// Fails with `InvalidArgument` unless `update_type` is `REPLACE` or `APPEND`.
    pub fn new(viz: SharedVisdom, config: LoggerConfig, update_type: &str) -> Result<Self> {
        let update_type = update_type.parse::<UpdateType>()?;
        Ok(Self::with_update_type(viz, config, update_type))
    }

    pub fn with_update_type(viz: SharedVisdom, config: LoggerConfig, update_type: UpdateType) -> Self {
        Self {
            base: BaseVisdomLogger::new(viz, config),
            update_type,
            text: String::new(),
            widths: HashMap::new(),
        }
    }

    pub fn update_type(&self) -> UpdateType {
        self.update_type
    }

    /// Text currently shown in the window.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn win(&self) -> Option<&str> {
        self.base.win()
    }

    /// Combine `msg` with the current text and send the result.
    pub fn log_text(&mut self, msg: &str) -> Result<()> {
        if self.update_type == UpdateType::Append && !self.text.is_empty() {
            self.text.push_str(LINE_BREAK);
            self.text.push_str(msg);
        } else {
            self.text = msg.to_string();
        }
        let content = Value::Array(vec![Value::String(self.text.clone())]);
        self.base.plot_windowed(PlotKind::Text, &[content])
    }

    /// Render every field and log the joined line, framed by `prefix` and
    /// `suffix` as separate messages. Nothing is sent when no field produced
    /// output.
    fn log_all(
        &mut self,
        stats: &Stats,
        log_fields: &str,
        prefix: Option<&str>,
        suffix: Option<&str>,
        require_dict: bool,
    ) -> Result<()> {
        let mut results = Vec::new();
        for (field_idx, field) in self.base.fields().iter().enumerate() {
            let (parent, stat) = stats.resolve_with_parent(field)?;
            let (name, mut output) = gather_outputs(field, log_fields, parent, stat, require_dict)?;
            if output.is_empty() {
                continue;
            }
            align_output(&mut self.widths, field_idx, &mut output);
            results.push((name, output));
        }
        if results.is_empty() {
            return Ok(());
        }

        let output = join_results(&results);
        if let Some(prefix) = prefix {
            self.log_text(prefix)?;
        }
        self.log_text(&output)?;
        if let Some(suffix) = suffix {
            self.log_text(suffix)?;
        }
        Ok(())
    }
}

fn gather_outputs(
    field: &FieldPath,
    log_fields: &str,
    parent: &Map<String, Value>,
    stat: &Value,
    require_dict: bool,
) -> Result<(String, Vec<String>)> {
    match stat {
        Value::Object(map) => {
            let name = map
                .get("log_name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| field.dotted());
            let templates = map.get(log_fields).and_then(Value::as_array);
            let output = templates
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(|template| format_template(template, FormatArgs::named(map)))
                .collect::<Result<Vec<_>>>()?;
            Ok((name, output))
        }
        _ if !require_dict => {
            let number_format = parent.get("log_format").and_then(Value::as_str).unwrap_or("");
            let unit = parent.get("log_unit").and_then(Value::as_str).unwrap_or("");
            let template = format!("{{{}}}{}", number_format, unit);
            let output = format_template(&template, FormatArgs::positional(stat))?;
            Ok((field.dotted(), vec![output]))
        }
        _ => Ok((String::new(), Vec::new())),
    }
}

/// Pad each output to the widest value seen at its position, or record a
/// new widest value.
fn align_output(widths: &mut HashMap<(usize, usize), usize>, field_idx: usize, output: &mut [String]) {
    for (output_idx, o) in output.iter_mut().enumerate() {
        let width = widths.entry((field_idx, output_idx)).or_insert(0);
        let len = o.chars().count();
        if len < *width {
            o.push_str(&" ".repeat(*width - len));
        } else {
            *width = len;
        }
    }
}

/// `name: out1 out2` per field, fields separated by tabs.
fn join_results(results: &[(String, Vec<String>)]) -> String {
    results
        .iter()
        .map(|(name, output)| format!("{}: {}", name, output.join(" ")))
        .collect::<Vec<_>>()
        .join("\t")
}

impl VisdomLog for VisdomTextLogger {
    fn base(&self) -> &BaseVisdomLogger {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseVisdomLogger {
        &mut self.base
    }

    /// Logs the first value as the message; strings are used verbatim.
    fn log(&mut self, values: Vec<Value>) -> Result<()> {
        let msg = match values.into_iter().next() {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => {
                return Err(VizlogError::InvalidArgument(
                    "text logger needs a message".to_string(),
                ))
            }
        };
        self.log_text(&msg)
    }
}

impl Plugin for VisdomTextLogger {
    fn name(&self) -> &str {
        "text"
    }

    fn interval(&self) -> &Interval {
        self.base.interval()
    }

    fn on_hook(&mut self, hook: Hook, stats: &Stats) -> Result<()> {
        if hook == Hook::Epoch {
            let separator = "#".repeat(SEPARATOR_WIDTH);
            let prefix = format!("{}\nEpoch summary:", separator);
            self.log_all(stats, "log_epoch_fields", Some(prefix.as_str()), Some(separator.as_str()), true)?;
            self.base.save_env()?;
        } else {
            self.log_all(stats, "log_iter_fields", None, None, false)?;
        }
        Ok(())
    }
}
