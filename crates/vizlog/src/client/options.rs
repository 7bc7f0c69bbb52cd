use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Presentation options forwarded with every plot call.
///
/// Well-known keys have fields; anything else (`markersize`, `colormap`,
/// `rownames`, `stacked`, ...) goes in `extra` and is passed through verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xlabel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ylabel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<Vec<String>>,
    /// Histogram bin count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbins: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Requested chart type for plot loggers (`scatter` or `line`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn xlabel(mut self, xlabel: impl Into<String>) -> Self {
        self.xlabel = Some(xlabel.into());
        self
    }

    pub fn ylabel(mut self, ylabel: impl Into<String>) -> Self {
        self.ylabel = Some(ylabel.into());
        self
    }

    pub fn legend<I, S>(mut self, legend: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legend = Some(legend.into_iter().map(Into::into).collect());
        self
    }

    pub fn numbins(mut self, numbins: usize) -> Self {
        self.numbins = Some(numbins);
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set an arbitrary pass-through option.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn get_extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_skips_unset() {
        let opts = PlotOptions::new().title("Loss").numbins(20).set("markersize", 5);
        let value = serde_json::to_value(&opts).unwrap();
        assert_eq!(
            value,
            json!({ "title": "Loss", "numbins": 20, "markersize": 5 })
        );
    }

    #[test]
    fn test_deserialize_extra_keys() {
        let opts: PlotOptions =
            serde_json::from_value(json!({ "title": "Acc", "colormap": "Electric" })).unwrap();
        assert_eq!(opts.title.as_deref(), Some("Acc"));
        assert_eq!(opts.get_extra("colormap"), Some(&json!("Electric")));
    }
}
