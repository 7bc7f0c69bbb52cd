//! Run statistics and dotted field-path lookups.

use crate::{Result, VizlogError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Ordered key sequence addressing a value inside [`Stats`].
///
/// Parsed from dotted names: `"progress.percent"` becomes `["progress", "percent"]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Build a path from explicit segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(VizlogError::InvalidArgument(format!(
                "field path must have non-empty segments, got {:?}",
                segments
            )));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The dotted form, used as a display name by the text logger.
    pub fn dotted(&self) -> String {
        self.0.join(".")
    }
}

impl FromStr for FieldPath {
    type Err = VizlogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_segments(s.split('.'))
    }
}

impl TryFrom<String> for FieldPath {
    type Error = VizlogError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.dotted()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

/// Nested statistics mapping owned by the host loop.
///
/// Monitors publish into it between hook firings; loggers resolve their
/// field paths against it every time they fire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stats(Map<String, Value>);

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(VizlogError::InvalidArgument(format!(
                "stats root must be an object, got {}",
                other
            ))),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Resolve `path` to its leaf value.
    pub fn resolve(&self, path: &FieldPath) -> Result<&Value> {
        self.resolve_with_parent(path).map(|(_, stat)| stat)
    }

    /// Resolve `path`, also returning the object that holds the leaf.
    ///
    /// A missing key at any level, or an intermediate value that is not an
    /// object, is reported as [`VizlogError::FieldNotFound`].
    pub fn resolve_with_parent(&self, path: &FieldPath) -> Result<(&Map<String, Value>, &Value)> {
        let (last, init) = path
            .segments()
            .split_last()
            .ok_or_else(|| VizlogError::InvalidArgument("empty field path".to_string()))?;

        let mut parent = &self.0;
        for key in init {
            parent = match parent.get(key) {
                Some(Value::Object(map)) => map,
                _ => return Err(not_found(path, key)),
            };
        }

        let stat = parent.get(last).ok_or_else(|| not_found(path, last))?;
        Ok((parent, stat))
    }

    /// Store `value` at `path`, creating intermediate objects as needed.
    pub fn set_path(&mut self, path: &FieldPath, value: Value) -> Result<()> {
        let (last, init) = path
            .segments()
            .split_last()
            .ok_or_else(|| VizlogError::InvalidArgument("empty field path".to_string()))?;

        let mut parent = &mut self.0;
        for key in init {
            let slot = parent
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            parent = match slot {
                Value::Object(map) => map,
                other => {
                    return Err(VizlogError::InvalidArgument(format!(
                        "cannot descend into '{}' of '{}': value is {}",
                        key, path, other
                    )))
                }
            };
        }

        parent.insert(last.clone(), value);
        Ok(())
    }
}

impl From<Map<String, Value>> for Stats {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn not_found(path: &FieldPath, key: &str) -> VizlogError {
    VizlogError::FieldNotFound {
        path: path.dotted(),
        key: key.to_string(),
    }
}
