//! Translation of plot requests into the JSON messages Visdom accepts.
//!
//! Visdom renders Plotly figures: a plot message carries a list of traces
//! (`data`), a `layout`, the target window (`win`), the environment (`eid`)
//! and the raw `opts`. These builders are pure so that both the HTTP client
//! and the recording client validate arguments identically.

use super::{PlotKind, PlotOptions};
use crate::{Result, VizlogError};
use base64::{engine::general_purpose, Engine};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use serde_json::{json, Map, Value};

/// Bin count used by histograms when `numbins` is unset.
pub const DEFAULT_NUMBINS: usize = 30;

/// Images per row in an image grid when `nrow` is unset.
pub const DEFAULT_NROW: usize = 8;

/// Pixels between grid cells when `padding` is unset.
pub const DEFAULT_PADDING: usize = 2;

const MARGIN: u32 = 60;

/// Quiver arrowhead length as a fraction of the arrow.
const HEAD_LENGTH: f64 = 0.3;
/// Quiver arrowhead half-angle, in radians.
const HEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;

/// Message for the `events` endpoint.
pub fn plot_message(
    kind: PlotKind,
    args: &[Value],
    win: Option<&str>,
    env: Option<&str>,
    opts: &PlotOptions,
) -> Result<Value> {
    let data = match kind {
        PlotKind::Scatter => scatter_traces(args, opts, "markers")?,
        PlotKind::Line => line_traces(args, opts)?,
        PlotKind::Bar => bar_traces(args, opts)?,
        PlotKind::Histogram => histogram_traces(args, opts)?,
        PlotKind::Heatmap => heatmap_traces(args, opts)?,
        PlotKind::Boxplot => boxplot_traces(args, opts)?,
        PlotKind::Pie => pie_traces(args, opts)?,
        PlotKind::Stem => stem_traces(args, opts)?,
        PlotKind::Surf => surface_traces(args, opts, "surf", "surface")?,
        PlotKind::Contour => surface_traces(args, opts, "contour", "contour")?,
        PlotKind::Quiver => quiver_traces(args, opts)?,
        PlotKind::Text | PlotKind::Svg => {
            let content = text_content(args)?;
            let content = match kind {
                PlotKind::Svg => svg_markup(&content)?,
                _ => content,
            };
            return Ok(json!({
                "data": [{ "content": content, "type": "text" }],
                "win": win,
                "eid": env,
                "opts": serde_json::to_value(opts)?,
            }));
        }
        PlotKind::Image | PlotKind::Images => {
            let picture = match kind {
                PlotKind::Images => image_grid(required(args, 0, "images")?, opts)?,
                _ => image_array(required(args, 0, "image")?)?,
            };
            return Ok(json!({
                "data": [{
                    "content": { "src": picture.data_url()?, "caption": opts.get_extra("caption") },
                    "type": "image",
                }],
                "win": win,
                "eid": env,
                "opts": serde_json::to_value(opts)?,
            }));
        }
    };

    let mut layout = layout(opts);
    if matches!(kind, PlotKind::Bar | PlotKind::Histogram) {
        let stacked = opts
            .get_extra("stacked")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        layout.insert(
            "barmode".to_string(),
            Value::from(if stacked { "stack" } else { "group" }),
        );
    }

    Ok(json!({
        "data": data,
        "layout": layout,
        "win": win,
        "eid": env,
        "opts": serde_json::to_value(opts)?,
    }))
}

/// Message for the `update` endpoint, appending to the trace in `win`.
pub fn update_message(
    x: &Value,
    y: &Value,
    win: &str,
    env: Option<&str>,
    opts: &PlotOptions,
) -> Result<Value> {
    let x = vector(x)?;
    let y = vector(y)?;
    if x.len() != y.len() {
        return Err(VizlogError::InvalidArgument(format!(
            "trace update needs matching x and y lengths, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    Ok(json!({
        "x": x,
        "y": y,
        "win": win,
        "eid": env,
        "name": Value::Null,
        "append": true,
        "opts": serde_json::to_value(opts)?,
    }))
}

/// Message for the `save` endpoint.
pub fn save_message(envs: &[String]) -> Value {
    json!({ "data": envs })
}

fn layout(opts: &PlotOptions) -> Map<String, Value> {
    let mut layout = Map::new();
    layout.insert("showlegend".to_string(), Value::Bool(opts.legend.is_some()));
    if let Some(title) = &opts.title {
        layout.insert("title".to_string(), Value::from(title.as_str()));
    }
    if let Some(xlabel) = &opts.xlabel {
        layout.insert("xaxis".to_string(), json!({ "title": xlabel }));
    }
    if let Some(ylabel) = &opts.ylabel {
        layout.insert("yaxis".to_string(), json!({ "title": ylabel }));
    }
    if let Some(width) = opts.width {
        layout.insert("width".to_string(), Value::from(width));
    }
    if let Some(height) = opts.height {
        layout.insert("height".to_string(), Value::from(height));
    }
    layout.insert(
        "margin".to_string(),
        json!({ "l": MARGIN, "r": MARGIN, "t": MARGIN, "b": MARGIN }),
    );
    layout
}

/// `legend[idx]` if given, otherwise the 1-based series number.
fn series_name(opts: &PlotOptions, idx: usize) -> String {
    opts.legend
        .as_ref()
        .and_then(|legend| legend.get(idx).cloned())
        .unwrap_or_else(|| (idx + 1).to_string())
}

fn scatter_traces(args: &[Value], opts: &PlotOptions, mode: &str) -> Result<Vec<Value>> {
    let points = rows(required(args, 0, "scatter")?)?;
    let dims = points[0].len();
    if !(dims == 2 || dims == 3) {
        return Err(VizlogError::InvalidArgument(format!(
            "scatter points need 2 or 3 coordinates, got {}",
            dims
        )));
    }

    let labels: Vec<usize> = match args.get(1) {
        Some(y) => vector(y)?
            .into_iter()
            .map(|label| {
                if label >= 1.0 && label.fract() == 0.0 && label <= points.len() as f64 {
                    Ok(label as usize)
                } else {
                    Err(VizlogError::InvalidArgument(format!(
                        "scatter labels must be integers in 1..={}, got {}",
                        points.len(),
                        label
                    )))
                }
            })
            .collect::<Result<_>>()?,
        None => vec![1; points.len()],
    };
    if labels.len() != points.len() {
        return Err(VizlogError::InvalidArgument(format!(
            "scatter got {} points but {} labels",
            points.len(),
            labels.len()
        )));
    }

    let marker_size = opts
        .get_extra("markersize")
        .cloned()
        .unwrap_or_else(|| Value::from(10));
    let num_groups = labels.iter().copied().max().unwrap_or(1);

    let mut traces = Vec::new();
    for group in 1..=num_groups {
        let members: Vec<&Vec<f64>> = points
            .iter()
            .zip(&labels)
            .filter(|(_, label)| **label == group)
            .map(|(point, _)| point)
            .collect();
        if members.is_empty() {
            continue;
        }

        let mut trace = Map::new();
        trace.insert("x".to_string(), json!(members.iter().map(|p| p[0]).collect::<Vec<_>>()));
        trace.insert("y".to_string(), json!(members.iter().map(|p| p[1]).collect::<Vec<_>>()));
        if dims == 3 {
            trace.insert("z".to_string(), json!(members.iter().map(|p| p[2]).collect::<Vec<_>>()));
        }
        trace.insert("name".to_string(), Value::from(series_name(opts, group - 1)));
        trace.insert(
            "type".to_string(),
            Value::from(if dims == 3 { "scatter3d" } else { "scatter" }),
        );
        trace.insert("mode".to_string(), Value::from(mode));
        trace.insert("marker".to_string(), json!({ "size": marker_size }));
        traces.push(Value::Object(trace));
    }
    Ok(traces)
}

fn line_traces(args: &[Value], opts: &PlotOptions) -> Result<Vec<Value>> {
    let series = columns(required(args, 0, "line")?)?;
    let x = positions(args.get(1), series[0].len(), "line")?;

    Ok(series
        .into_iter()
        .enumerate()
        .map(|(idx, y)| {
            json!({
                "x": x,
                "y": y,
                "name": series_name(opts, idx),
                "type": "scatter",
                "mode": "lines",
            })
        })
        .collect())
}

/// Explicit x positions, or `0..len`.
fn positions(x: Option<&Value>, len: usize, kind: &str) -> Result<Vec<f64>> {
    let x = match x {
        Some(x) => vector(x)?,
        None => (0..len).map(|i| i as f64).collect(),
    };
    if x.len() != len {
        return Err(VizlogError::InvalidArgument(format!(
            "{} got {} x values for {} y values",
            kind,
            x.len(),
            len
        )));
    }
    Ok(x)
}

fn bar_traces(args: &[Value], opts: &PlotOptions) -> Result<Vec<Value>> {
    let series = columns(required(args, 0, "bar")?)?;
    let len = series[0].len();
    let x: Value = match opts.get_extra("rownames") {
        Some(Value::Array(names)) if names.len() == len => Value::Array(names.clone()),
        Some(_) => {
            return Err(VizlogError::InvalidArgument(format!(
                "bar 'rownames' must be a list of {} names",
                len
            )))
        }
        None => json!((1..=len).collect::<Vec<_>>()),
    };

    Ok(series
        .into_iter()
        .enumerate()
        .map(|(idx, y)| {
            json!({
                "x": x,
                "y": y,
                "name": series_name(opts, idx),
                "type": "bar",
            })
        })
        .collect())
}

fn histogram_traces(args: &[Value], opts: &PlotOptions) -> Result<Vec<Value>> {
    let values = vector(required(args, 0, "histogram")?)?;
    if values.is_empty() {
        return Err(VizlogError::InvalidArgument(
            "histogram needs at least one value".to_string(),
        ));
    }
    let numbins = opts.numbins.unwrap_or(DEFAULT_NUMBINS);
    if numbins == 0 {
        return Err(VizlogError::InvalidArgument(
            "histogram numbins must be at least 1".to_string(),
        ));
    }

    let (centers, counts) = histogram(&values, numbins);
    Ok(vec![json!({
        "x": centers,
        "y": counts,
        "name": series_name(opts, 0),
        "type": "bar",
    })])
}

/// Equal-width bins over `[min, max]`, the last bin closed on the right.
///
/// A constant input gets the range `[v - 0.5, v + 0.5]`.
fn histogram(values: &[f64], numbins: usize) -> (Vec<f64>, Vec<u64>) {
    let mut min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        min -= 0.5;
        max += 0.5;
    }

    let width = (max - min) / numbins as f64;
    let mut counts = vec![0u64; numbins];
    for &v in values {
        let idx = (((v - min) / width).floor() as usize).min(numbins - 1);
        counts[idx] += 1;
    }
    let centers = (0..numbins)
        .map(|i| min + width * (i as f64 + 0.5))
        .collect();
    (centers, counts)
}

fn heatmap_traces(args: &[Value], opts: &PlotOptions) -> Result<Vec<Value>> {
    let z = rows(required(args, 0, "heatmap")?)?;

    let mut trace = Map::new();
    trace.insert("z".to_string(), json!(z));
    trace.insert("type".to_string(), Value::from("heatmap"));
    trace.insert("colorscale".to_string(), colormap(opts));
    if let Some(names) = opts.get_extra("columnnames") {
        trace.insert("x".to_string(), names.clone());
    }
    if let Some(names) = opts.get_extra("rownames") {
        trace.insert("y".to_string(), names.clone());
    }
    Ok(vec![Value::Object(trace)])
}

fn colormap(opts: &PlotOptions) -> Value {
    opts.get_extra("colormap")
        .cloned()
        .unwrap_or_else(|| Value::from("Viridis"))
}

/// Surface and contour plots over a 2-D grid of heights.
fn surface_traces(
    args: &[Value],
    opts: &PlotOptions,
    kind: &str,
    trace_type: &str,
) -> Result<Vec<Value>> {
    let z = rows(required(args, 0, kind)?)?;
    Ok(vec![json!({
        "z": z,
        "type": trace_type,
        "colorscale": colormap(opts),
    })])
}

fn pie_traces(args: &[Value], opts: &PlotOptions) -> Result<Vec<Value>> {
    let values = vector(required(args, 0, "pie")?)?;
    if values.is_empty() || values.iter().any(|v| *v < 0.0) {
        return Err(VizlogError::InvalidArgument(
            "pie needs at least one value, all non-negative".to_string(),
        ));
    }
    Ok(vec![json!({
        "values": values,
        "labels": opts.legend,
        "type": "pie",
    })])
}

/// One trace per column; each value is a vertical segment from zero.
fn stem_traces(args: &[Value], opts: &PlotOptions) -> Result<Vec<Value>> {
    let series = columns(required(args, 0, "stem")?)?;
    let x = positions(args.get(1), series[0].len(), "stem")?;

    Ok(series
        .into_iter()
        .enumerate()
        .map(|(idx, y)| {
            let mut xs = Vec::with_capacity(3 * y.len());
            let mut ys = Vec::with_capacity(3 * y.len());
            for (xi, yi) in x.iter().zip(&y) {
                push_segment(&mut xs, &mut ys, (*xi, 0.0), (*xi, *yi));
            }
            json!({
                "x": xs,
                "y": ys,
                "name": series_name(opts, idx),
                "type": "scatter",
                "mode": "lines+markers",
            })
        })
        .collect())
}

/// Arrows `(u, v)` drawn from grid points, as one trace of line segments.
///
/// `args` are `[u, v]` or `[u, v, grid_x, grid_y]`; the default grid places
/// column `j` of row `i` at `(j, i)`. `normalize` scales the longest arrow to
/// that length and `arrowheads` (default true) adds heads.
fn quiver_traces(args: &[Value], opts: &PlotOptions) -> Result<Vec<Value>> {
    let u = rows(required(args, 0, "quiver")?)?;
    let v = rows(required(args, 1, "quiver")?)?;
    let (n, m) = (u.len(), u[0].len());
    let grid_x = match args.get(2) {
        Some(grid) => rows(grid)?,
        None => vec![(0..m).map(|j| j as f64).collect(); n],
    };
    let grid_y = match args.get(3) {
        Some(grid) => rows(grid)?,
        None => (0..n).map(|i| vec![i as f64; m]).collect(),
    };
    for other in [&v, &grid_x, &grid_y] {
        if other.len() != n || other[0].len() != m {
            return Err(VizlogError::InvalidArgument(format!(
                "quiver inputs must all be {}x{}",
                n, m
            )));
        }
    }

    let scale = match opts.get_extra("normalize").and_then(Value::as_f64) {
        Some(target) => {
            let longest = u
                .iter()
                .flatten()
                .zip(v.iter().flatten())
                .map(|(a, b)| a.hypot(*b))
                .fold(0.0, f64::max);
            if longest > 0.0 {
                target / longest
            } else {
                1.0
            }
        }
        None => 1.0,
    };
    let arrowheads = opts
        .get_extra("arrowheads")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for i in 0..n {
        for j in 0..m {
            let start = (grid_x[i][j], grid_y[i][j]);
            let (dx, dy) = (u[i][j] * scale, v[i][j] * scale);
            let end = (start.0 + dx, start.1 + dy);
            push_segment(&mut xs, &mut ys, start, end);

            if arrowheads && (dx != 0.0 || dy != 0.0) {
                let back = dy.atan2(dx) + std::f64::consts::PI;
                let len = dx.hypot(dy) * HEAD_LENGTH;
                for theta in [back - HEAD_ANGLE, back + HEAD_ANGLE] {
                    let tip = (end.0 + len * theta.cos(), end.1 + len * theta.sin());
                    push_segment(&mut xs, &mut ys, end, tip);
                }
            }
        }
    }

    Ok(vec![json!({
        "x": xs,
        "y": ys,
        "name": series_name(opts, 0),
        "type": "scatter",
        "mode": "lines",
    })])
}

/// Segment endpoints followed by a null so Plotly breaks the line.
fn push_segment(xs: &mut Vec<Value>, ys: &mut Vec<Value>, from: (f64, f64), to: (f64, f64)) {
    xs.extend([json!(from.0), json!(to.0), Value::Null]);
    ys.extend([json!(from.1), json!(to.1), Value::Null]);
}

fn boxplot_traces(args: &[Value], opts: &PlotOptions) -> Result<Vec<Value>> {
    let series = columns(required(args, 0, "boxplot")?)?;
    Ok(series
        .into_iter()
        .enumerate()
        .map(|(idx, y)| {
            let name = opts
                .legend
                .as_ref()
                .and_then(|legend| legend.get(idx).cloned())
                .unwrap_or_else(|| format!("column {}", idx + 1));
            json!({ "y": y, "type": "box", "name": name })
        })
        .collect())
}

/// A string, or a single-element list holding one.
fn text_content(args: &[Value]) -> Result<String> {
    match required(args, 0, "text")? {
        Value::String(text) => Ok(text.clone()),
        Value::Array(items) if items.len() == 1 => match &items[0] {
            Value::String(text) => Ok(text.clone()),
            other => Err(VizlogError::InvalidArgument(format!(
                "text expects a string, got {}",
                other
            ))),
        },
        other => Err(VizlogError::InvalidArgument(format!(
            "text expects a string, got {}",
            other
        ))),
    }
}

/// The `<svg>...</svg>` element inside `text`.
fn svg_markup(text: &str) -> Result<String> {
    const CLOSE: &str = "</svg>";
    match (text.find("<svg"), text.rfind(CLOSE)) {
        (Some(start), Some(end)) if end > start => Ok(text[start..end + CLOSE.len()].to_string()),
        _ => Err(VizlogError::InvalidArgument(
            "svg expects '<svg ...>...</svg>' markup".to_string(),
        )),
    }
}

/// Planar (channel-major) pixel data.
#[derive(Debug)]
struct Picture {
    channels: usize,
    height: usize,
    width: usize,
    data: Vec<f64>,
}

impl Picture {
    /// Pixels in `[0, 1]` are scaled to `[0, 255]`; everything is clamped
    /// and truncated to 8 bits.
    fn data_url(&self) -> Result<String> {
        let max = self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let scale = if max <= 1.0 { 255.0 } else { 1.0 };
        let plane = self.height * self.width;
        let pixels: Vec<u8> = (0..plane)
            .flat_map(|px| (0..self.channels).map(move |ch| ch * plane + px))
            .map(|idx| (self.data[idx] * scale).clamp(0.0, 255.0) as u8)
            .collect();

        let color = if self.channels == 3 {
            ExtendedColorType::Rgb8
        } else {
            ExtendedColorType::L8
        };
        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(
            &pixels,
            self.width as u32,
            self.height as u32,
            color,
        )?;
        Ok(format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&png)
        ))
    }
}

/// An `HxW` or `CxHxW` array with 1 or 3 channels.
fn image_array(value: &Value) -> Result<Picture> {
    let (shape, data) = tensor(value)?;
    let (channels, height, width) = match *shape.as_slice() {
        [h, w] => (1, h, w),
        [c, h, w] if c == 1 || c == 3 => (c, h, w),
        _ => {
            return Err(VizlogError::InvalidArgument(format!(
                "image expects HxW or CxHxW with 1 or 3 channels, got shape {:?}",
                shape
            )))
        }
    };
    Ok(Picture {
        channels,
        height,
        width,
        data,
    })
}

/// Tile a `BxCxHxW` batch into one picture, `nrow` images per row with
/// `padding` pixels of zero between them.
fn image_grid(value: &Value, opts: &PlotOptions) -> Result<Picture> {
    let (shape, data) = tensor(value)?;
    let (batch, channels, height, width) = match *shape.as_slice() {
        [b, c, h, w] if c == 1 || c == 3 => (b, c, h, w),
        _ => {
            return Err(VizlogError::InvalidArgument(format!(
                "images expects BxCxHxW with 1 or 3 channels, got shape {:?}",
                shape
            )))
        }
    };
    let setting = |key: &str, default: usize| {
        opts.get_extra(key)
            .and_then(Value::as_u64)
            .map_or(default, |n| n as usize)
    };
    let ncols = setting("nrow", DEFAULT_NROW).clamp(1, batch);
    let padding = setting("padding", DEFAULT_PADDING);
    let nrows = (batch + ncols - 1) / ncols;

    let grid_h = nrows * (height + padding) + padding;
    let grid_w = ncols * (width + padding) + padding;
    let plane = height * width;
    let mut grid = vec![0.0; channels * grid_h * grid_w];
    for b in 0..batch {
        let top = padding + (b / ncols) * (height + padding);
        let left = padding + (b % ncols) * (width + padding);
        for ch in 0..channels {
            for y in 0..height {
                let src = (b * channels + ch) * plane + y * width;
                let dst = ch * grid_h * grid_w + (top + y) * grid_w + left;
                grid[dst..dst + width].copy_from_slice(&data[src..src + width]);
            }
        }
    }

    Ok(Picture {
        channels,
        height: grid_h,
        width: grid_w,
        data: grid,
    })
}

/// Shape and row-major values of a rectangular nested list.
fn tensor(value: &Value) -> Result<(Vec<usize>, Vec<f64>)> {
    match value {
        Value::Array(items) if items.is_empty() => {
            Err(VizlogError::InvalidArgument("empty data".to_string()))
        }
        Value::Array(items) => {
            let mut inner: Option<Vec<usize>> = None;
            let mut data = Vec::new();
            for item in items {
                let (shape, values) = tensor(item)?;
                match &inner {
                    Some(expected) if *expected != shape => {
                        return Err(VizlogError::InvalidArgument(
                            "nested lists must all have the same shape".to_string(),
                        ))
                    }
                    Some(_) => {}
                    None => inner = Some(shape),
                }
                data.extend(values);
            }
            let mut shape = vec![items.len()];
            shape.extend(inner.unwrap_or_default());
            Ok((shape, data))
        }
        other => Ok((Vec::new(), vec![number(other)?])),
    }
}

fn required<'a>(args: &'a [Value], idx: usize, kind: &str) -> Result<&'a Value> {
    args.get(idx).ok_or_else(|| {
        VizlogError::InvalidArgument(format!("{} needs at least {} argument(s)", kind, idx + 1))
    })
}

fn number(value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| VizlogError::InvalidArgument(format!("expected a number, got {}", value)))
}

/// A number or a flat list of numbers.
fn vector(value: &Value) -> Result<Vec<f64>> {
    match value {
        Value::Array(items) => items.iter().map(number).collect(),
        other => Ok(vec![number(other)?]),
    }
}

/// A non-empty rectangular matrix; a flat list is a single row.
fn rows(value: &Value) -> Result<Vec<Vec<f64>>> {
    let rows: Vec<Vec<f64>> = match value {
        Value::Array(items) if items.iter().all(Value::is_array) && !items.is_empty() => {
            items.iter().map(vector).collect::<Result<_>>()?
        }
        other => vec![vector(other)?],
    };

    let width = rows[0].len();
    if width == 0 {
        return Err(VizlogError::InvalidArgument("empty data".to_string()));
    }
    if rows.iter().any(|row| row.len() != width) {
        return Err(VizlogError::InvalidArgument(
            "rows must all have the same length".to_string(),
        ));
    }
    Ok(rows)
}

/// Series for multi-series plots: a flat list is one series, an N x M
/// matrix is M series of length N.
fn columns(value: &Value) -> Result<Vec<Vec<f64>>> {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_array) => {
            let rows = rows(value)?;
            let width = rows[0].len();
            Ok((0..width)
                .map(|col| rows.iter().map(|row| row[col]).collect())
                .collect())
        }
        other => {
            let series = vector(other)?;
            if series.is_empty() {
                return Err(VizlogError::InvalidArgument("empty data".to_string()));
            }
            Ok(vec![series])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scatter_single_point() {
        let opts = PlotOptions::new().title("progress");
        let msg = plot_message(
            PlotKind::Scatter,
            &[json!([[128, 0.5]])],
            None,
            Some("main"),
            &opts,
        )
        .unwrap();

        assert_eq!(msg["win"], Value::Null);
        assert_eq!(msg["eid"], json!("main"));
        assert_eq!(msg["layout"]["title"], json!("progress"));
        assert_eq!(msg["layout"]["showlegend"], json!(false));
        let trace = &msg["data"][0];
        assert_eq!(trace["x"], json!([128.0]));
        assert_eq!(trace["y"], json!([0.5]));
        assert_eq!(trace["type"], json!("scatter"));
        assert_eq!(trace["mode"], json!("markers"));
    }

    #[test]
    fn test_scatter_groups_by_label() {
        let opts = PlotOptions::new().legend(["train", "val"]);
        let msg = plot_message(
            PlotKind::Scatter,
            &[json!([[0, 1], [1, 2], [2, 3]]), json!([1, 2, 1])],
            Some("window_1"),
            None,
            &opts,
        )
        .unwrap();

        let data = msg["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["name"], json!("train"));
        assert_eq!(data[0]["x"], json!([0.0, 2.0]));
        assert_eq!(data[1]["name"], json!("val"));
        assert_eq!(msg["win"], json!("window_1"));
    }

    #[test]
    fn test_scatter_rejects_bad_points() {
        let opts = PlotOptions::new();
        assert!(plot_message(PlotKind::Scatter, &[json!([1])], None, None, &opts).is_err());
        assert!(plot_message(PlotKind::Scatter, &[json!([[1, 2], [3]])], None, None, &opts).is_err());
        assert!(plot_message(PlotKind::Scatter, &[json!([[1, 2]]), json!([0])], None, None, &opts).is_err());
        assert!(plot_message(PlotKind::Scatter, &[], None, None, &opts).is_err());
    }

    #[test]
    fn test_line_columns_become_traces() {
        let opts = PlotOptions::new();
        let msg = plot_message(
            PlotKind::Line,
            &[json!([[1, 10], [2, 20], [3, 30]]), json!([5, 6, 7])],
            None,
            None,
            &opts,
        )
        .unwrap();
        let data = msg["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[1]["y"], json!([10.0, 20.0, 30.0]));
        assert_eq!(data[1]["x"], json!([5.0, 6.0, 7.0]));
        assert_eq!(data[0]["mode"], json!("lines"));

        assert!(plot_message(PlotKind::Line, &[json!([1, 2]), json!([1])], None, None, &opts).is_err());
    }

    #[test]
    fn test_histogram_binning() {
        let (centers, counts) = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(counts, vec![2, 3]);
        assert_eq!(centers, vec![1.0, 3.0]);

        let (centers, counts) = histogram(&[5.0, 5.0], 1);
        assert_eq!(counts, vec![2]);
        assert_eq!(centers, vec![5.0]);
    }

    #[test]
    fn test_histogram_message_uses_numbins() {
        let opts = PlotOptions::new().numbins(4);
        let msg = plot_message(PlotKind::Histogram, &[json!([0, 1, 2, 3])], None, None, &opts).unwrap();
        assert_eq!(msg["data"][0]["y"], json!([1, 1, 1, 1]));
        assert_eq!(msg["layout"]["barmode"], json!("group"));

        let default = plot_message(PlotKind::Histogram, &[json!([1.5])], None, None, &PlotOptions::new()).unwrap();
        assert_eq!(default["data"][0]["y"].as_array().unwrap().len(), DEFAULT_NUMBINS);

        assert!(plot_message(PlotKind::Histogram, &[json!([])], None, None, &opts).is_err());
    }

    #[test]
    fn test_bar_rownames() {
        let opts = PlotOptions::new().set("rownames", json!(["a", "b"])).set("stacked", true);
        let msg = plot_message(PlotKind::Bar, &[json!([3, 4])], None, None, &opts).unwrap();
        assert_eq!(msg["data"][0]["x"], json!(["a", "b"]));
        assert_eq!(msg["layout"]["barmode"], json!("stack"));

        let wrong = PlotOptions::new().set("rownames", json!(["a"]));
        assert!(plot_message(PlotKind::Bar, &[json!([3, 4])], None, None, &wrong).is_err());
    }

    #[test]
    fn test_heatmap_and_boxplot() {
        let opts = PlotOptions::new();
        let heat = plot_message(PlotKind::Heatmap, &[json!([[1, 2], [3, 4]])], None, None, &opts).unwrap();
        assert_eq!(heat["data"][0]["z"], json!([[1.0, 2.0], [3.0, 4.0]]));
        assert_eq!(heat["data"][0]["colorscale"], json!("Viridis"));

        let boxes = plot_message(PlotKind::Boxplot, &[json!([[1, 2], [3, 4]])], None, None, &opts).unwrap();
        assert_eq!(boxes["data"][1]["y"], json!([2.0, 4.0]));
        assert_eq!(boxes["data"][1]["name"], json!("column 2"));
    }

    #[test]
    fn test_text_message() {
        let opts = PlotOptions::new();
        let msg = plot_message(PlotKind::Text, &[json!(["hello<br>world"])], Some("w"), Some("main"), &opts).unwrap();
        assert_eq!(msg["data"][0]["content"], json!("hello<br>world"));
        assert_eq!(msg["data"][0]["type"], json!("text"));
        assert_eq!(msg["win"], json!("w"));

        assert!(plot_message(PlotKind::Text, &[json!(3)], None, None, &opts).is_err());
    }

    #[test]
    fn test_update_and_save_messages() {
        let msg = update_message(&json!([4]), &json!([0.2]), "window_1", Some("main"), &PlotOptions::new()).unwrap();
        assert_eq!(msg["append"], json!(true));
        assert_eq!(msg["win"], json!("window_1"));
        assert_eq!(msg["x"], json!([4.0]));

        assert!(update_message(&json!([1, 2]), &json!([1]), "w", None, &PlotOptions::new()).is_err());

        let envs = vec!["main".to_string(), "eval".to_string()];
        assert_eq!(save_message(&envs), json!({ "data": ["main", "eval"] }));
    }

    #[test]
    fn test_update_message_names_trace() {
        let msg = update_message(&json!([1]), &json!([2]), "w", None, &PlotOptions::new()).unwrap();
        assert!(msg.as_object().unwrap().contains_key("name"));
        assert_eq!(msg["name"], Value::Null);
    }

    #[test]
    fn test_scatter_rejects_labels_beyond_point_count() {
        let opts = PlotOptions::new();
        let huge = plot_message(
            PlotKind::Scatter,
            &[json!([[0, 1], [1, 2]]), json!([1, 1e15])],
            None,
            None,
            &opts,
        );
        assert!(matches!(huge, Err(VizlogError::InvalidArgument(_))));
        assert!(plot_message(PlotKind::Scatter, &[json!([[0, 1], [1, 2]]), json!([1, 3])], None, None, &opts).is_err());
        assert!(plot_message(PlotKind::Scatter, &[json!([[0, 1], [1, 2]]), json!([2, 2])], None, None, &opts).is_ok());
    }

    fn decode_png(msg: &Value) -> image::DynamicImage {
        let src = msg["data"][0]["content"]["src"].as_str().unwrap();
        let encoded = src.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_image_encodes_png() {
        let opts = PlotOptions::new().set("caption", "weights");
        let msg = plot_message(
            PlotKind::Image,
            &[json!([[0.0, 1.0], [0.5, 0.0]])],
            Some("w"),
            Some("main"),
            &opts,
        )
        .unwrap();
        assert_eq!(msg["data"][0]["type"], json!("image"));
        assert_eq!(msg["data"][0]["content"]["caption"], json!("weights"));
        assert_eq!(msg["win"], json!("w"));

        let gray = decode_png(&msg).to_luma8();
        assert_eq!(gray.dimensions(), (2, 2));
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
        assert_eq!(gray.get_pixel(1, 0).0[0], 255);
        assert_eq!(gray.get_pixel(0, 1).0[0], 127);
    }

    #[test]
    fn test_image_rgb_channels() {
        let chw = json!([[[200, 10]], [[0, 20]], [[0, 30]]]);
        let msg = plot_message(PlotKind::Image, &[chw], None, None, &PlotOptions::new()).unwrap();
        let rgb = decode_png(&msg).to_rgb8();
        assert_eq!(rgb.dimensions(), (2, 1));
        assert_eq!(rgb.get_pixel(0, 0).0, [200, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [10, 20, 30]);

        let two_channels = json!([[[1]], [[1]]]);
        assert!(plot_message(PlotKind::Image, &[two_channels], None, None, &PlotOptions::new()).is_err());
        assert!(plot_message(PlotKind::Image, &[json!([[1, 2], [3]])], None, None, &PlotOptions::new()).is_err());
    }

    #[test]
    fn test_images_grid_layout() {
        let batch = json!(vec![json!([[[1.0, 1.0], [1.0, 1.0]]]); 3]);
        let opts = PlotOptions::new().set("nrow", 2).set("padding", 1);
        let msg = plot_message(PlotKind::Images, &[batch], None, None, &opts).unwrap();
        let grid = decode_png(&msg).to_luma8();
        // Two rows of two cells, each 2 pixels plus 1 of padding.
        assert_eq!(grid.dimensions(), (7, 7));
        assert_eq!(grid.get_pixel(0, 0).0[0], 0);
        assert_eq!(grid.get_pixel(1, 1).0[0], 255);
        assert_eq!(grid.get_pixel(4, 1).0[0], 255);
        assert_eq!(grid.get_pixel(1, 4).0[0], 255);
        assert_eq!(grid.get_pixel(4, 4).0[0], 0);

        assert!(plot_message(PlotKind::Images, &[json!([[1, 2]])], None, None, &opts).is_err());
    }

    #[test]
    fn test_svg_extracts_markup() {
        let markup = "<?xml version=\"1.0\"?><svg height=\"10\"><circle r=\"4\"/></svg>\n";
        let msg = plot_message(PlotKind::Svg, &[json!(markup)], None, None, &PlotOptions::new()).unwrap();
        assert_eq!(msg["data"][0]["type"], json!("text"));
        assert_eq!(msg["data"][0]["content"], json!("<svg height=\"10\"><circle r=\"4\"/></svg>"));

        assert!(plot_message(PlotKind::Svg, &[json!("<p>no</p>")], None, None, &PlotOptions::new()).is_err());
    }

    #[test]
    fn test_pie_values_and_labels() {
        let opts = PlotOptions::new().legend(["a", "b"]);
        let msg = plot_message(PlotKind::Pie, &[json!([3, 1])], None, None, &opts).unwrap();
        assert_eq!(msg["data"][0]["type"], json!("pie"));
        assert_eq!(msg["data"][0]["values"], json!([3.0, 1.0]));
        assert_eq!(msg["data"][0]["labels"], json!(["a", "b"]));

        assert!(plot_message(PlotKind::Pie, &[json!([1, -1])], None, None, &opts).is_err());
    }

    #[test]
    fn test_stem_segments_from_zero() {
        let msg = plot_message(PlotKind::Stem, &[json!([2, 3]), json!([10, 20])], None, None, &PlotOptions::new()).unwrap();
        let trace = &msg["data"][0];
        assert_eq!(trace["x"], json!([10.0, 10.0, null, 20.0, 20.0, null]));
        assert_eq!(trace["y"], json!([0.0, 2.0, null, 0.0, 3.0, null]));
        assert_eq!(trace["mode"], json!("lines+markers"));
    }

    #[test]
    fn test_surf_and_contour() {
        let z = json!([[1, 2], [3, 4]]);
        let opts = PlotOptions::new().set("colormap", "Hot");
        let surf = plot_message(PlotKind::Surf, &[z.clone()], None, None, &opts).unwrap();
        assert_eq!(surf["data"][0]["type"], json!("surface"));
        assert_eq!(surf["data"][0]["colorscale"], json!("Hot"));
        let contour = plot_message(PlotKind::Contour, &[z], None, None, &PlotOptions::new()).unwrap();
        assert_eq!(contour["data"][0]["type"], json!("contour"));
        assert_eq!(contour["data"][0]["z"], json!([[1.0, 2.0], [3.0, 4.0]]));
    }

    #[test]
    fn test_quiver_arrows() {
        let plain = PlotOptions::new().set("arrowheads", false);
        let msg = plot_message(PlotKind::Quiver, &[json!([[1, 0]]), json!([[0, 2]])], None, None, &plain).unwrap();
        let trace = &msg["data"][0];
        assert_eq!(trace["x"], json!([0.0, 1.0, null, 1.0, 1.0, null]));
        assert_eq!(trace["y"], json!([0.0, 0.0, null, 0.0, 2.0, null]));

        let normalized = PlotOptions::new().set("arrowheads", false).set("normalize", 1.0);
        let msg = plot_message(PlotKind::Quiver, &[json!([[1, 0]]), json!([[0, 2]])], None, None, &normalized).unwrap();
        assert_eq!(msg["data"][0]["y"][4], json!(1.0));

        let headed = plot_message(PlotKind::Quiver, &[json!([[1]]), json!([[0]])], None, None, &PlotOptions::new()).unwrap();
        assert_eq!(headed["data"][0]["x"].as_array().unwrap().len(), 9);

        assert!(plot_message(PlotKind::Quiver, &[json!([[1, 0]]), json!([[0]])], None, None, &plain).is_err());
    }
}
