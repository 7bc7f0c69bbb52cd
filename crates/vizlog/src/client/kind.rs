use crate::{Result, VizlogError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Plot types the client knows how to send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    Scatter,
    Line,
    Stem,
    Bar,
    Histogram,
    Heatmap,
    Boxplot,
    Pie,
    Surf,
    Contour,
    Quiver,
    Text,
    Svg,
    Image,
    Images,
}

impl PlotKind {
    pub const ALL: [PlotKind; 15] = [
        PlotKind::Scatter,
        PlotKind::Line,
        PlotKind::Stem,
        PlotKind::Bar,
        PlotKind::Histogram,
        PlotKind::Heatmap,
        PlotKind::Boxplot,
        PlotKind::Pie,
        PlotKind::Surf,
        PlotKind::Contour,
        PlotKind::Quiver,
        PlotKind::Text,
        PlotKind::Svg,
        PlotKind::Image,
        PlotKind::Images,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PlotKind::Scatter => "scatter",
            PlotKind::Line => "line",
            PlotKind::Stem => "stem",
            PlotKind::Bar => "bar",
            PlotKind::Histogram => "histogram",
            PlotKind::Heatmap => "heatmap",
            PlotKind::Boxplot => "boxplot",
            PlotKind::Pie => "pie",
            PlotKind::Surf => "surf",
            PlotKind::Contour => "contour",
            PlotKind::Quiver => "quiver",
            PlotKind::Text => "text",
            PlotKind::Svg => "svg",
            PlotKind::Image => "image",
            PlotKind::Images => "images",
        }
    }
}

impl FromStr for PlotKind {
    type Err = VizlogError;

    fn from_str(s: &str) -> Result<Self> {
        PlotKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| VizlogError::UnsupportedPlotKind(s.to_string()))
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
