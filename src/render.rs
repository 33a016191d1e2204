use std::path::Path;

use image::{ImageFormat, RgbImage};
use plotters::prelude::*;

use crate::color::{generate_palette, ChannelColors, Rgb8};
use crate::config::PlotSettings;
use crate::data::{ChannelSeries, FunctionTable};
use crate::error::{Error, Result};

const FONT: &str = "sans-serif";
const X_DESC: &str = "Retention Time";
const Y_DESC: &str = "Intensity";

/// Above this many traces the legend would cover the plot and is left out.
const MAX_LEGEND_ENTRIES: usize = 24;

type DrawResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

// ---------------------------------------------------------------------------
// Traces
// ---------------------------------------------------------------------------

/// One polyline to draw: `(retention time, intensity)` points in x order.
#[derive(Debug, Clone)]
pub struct Trace {
    pub label: String,
    pub color: Rgb8,
    pub points: Vec<(f64, f64)>,
}

impl Trace {
    fn new(label: String, color: Rgb8, mut points: Vec<(f64, f64)>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { label, color, points }
    }
}

/// One trace per channel of `table`. An empty `channels` slice means all.
pub fn channel_traces(table: &FunctionTable, channels: &[i64]) -> Vec<Trace> {
    let chosen = if channels.is_empty() {
        table.channels()
    } else {
        channels.to_vec()
    };
    let colors = ChannelColors::new(&chosen);

    chosen
        .iter()
        .map(|&channel| {
            let points = table
                .rows
                .iter()
                .filter(|r| r.channel == channel)
                .map(|r| (r.retention_time, r.intensity))
                .collect();
            Trace::new(format!("Channel {channel}"), colors.color_for(channel), points)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// PNG output
// ---------------------------------------------------------------------------

/// Render the chosen channels of a table to a PNG at `path`.
pub fn render_channels(
    table: &FunctionTable,
    channels: &[i64],
    settings: &PlotSettings,
    path: &Path,
) -> Result<()> {
    let figure = Figure {
        title: table.label(),
        traces: channel_traces(table, channels),
    };
    figure.save(settings, path)?;
    log::info!(
        "{}: plotted {} channel(s) to {}",
        figure.title,
        figure.traces.len(),
        path.display()
    );
    Ok(())
}

/// Render two series of the same channel, one colour each.
pub fn render_comparison(
    a: &ChannelSeries,
    b: &ChannelSeries,
    settings: &PlotSettings,
    path: &Path,
) -> Result<()> {
    let palette = generate_palette(2);
    let figure = Figure {
        title: format!("Channel {}: {} vs {}", a.channel, a.label, b.label),
        traces: vec![
            Trace::new(a.label.clone(), palette[0], a.points.clone()),
            Trace::new(b.label.clone(), palette[1], b.points.clone()),
        ],
    };
    figure.save(settings, path)?;
    log::info!(
        "compared channel {} of {} and {} in {}",
        a.channel,
        a.label,
        b.label,
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Chart drawing
// ---------------------------------------------------------------------------

/// A titled line chart: retention time on x, intensity on y.
#[derive(Debug, Clone)]
pub struct Figure {
    pub title: String,
    pub traces: Vec<Trace>,
}

impl Figure {
    pub fn save(&self, settings: &PlotSettings, path: &Path) -> Result<()> {
        let img = self.draw(settings).map_err(|e| Error::render(path, e))?;
        img.save_with_format(path, ImageFormat::Png)
            .map_err(|e| Error::render(path, e))
    }

    /// Draw onto an in-memory canvas of `settings.pixel_size()`.
    ///
    /// When no font can be loaded the chart is drawn again without title,
    /// tick labels and legend.
    pub fn draw(&self, settings: &PlotSettings) -> DrawResult<RgbImage> {
        let (width, height) = settings.pixel_size().ok_or_else(|| {
            format!(
                "figure size {}x{} in at {} dpi is out of range",
                settings.width, settings.height, settings.dpi
            )
        })?;

        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        if let Err(e) = self.paint(&mut buffer, (width, height), settings, true) {
            log::warn!("{}: drawing without text ({e})", self.title);
            self.paint(&mut buffer, (width, height), settings, false)?;
        }
        RgbImage::from_raw(width, height, buffer).ok_or_else(|| "pixel buffer size mismatch".into())
    }

    fn paint(
        &self,
        buffer: &mut [u8],
        size: (u32, u32),
        settings: &PlotSettings,
        with_text: bool,
    ) -> DrawResult<()> {
        // Points to pixels.
        let scale = f64::from(settings.dpi) / 72.0;
        let px = |points: f64| (points * scale).round().max(1.0) as u32;
        let font = |points: f64| (FONT, (points * scale).max(1.0));
        let stroke = px(1.0);

        let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
        root.fill(&WHITE)?;

        let bounds = Bounds::of(&self.traces).unwrap_or(Bounds::UNIT);
        let mut builder = ChartBuilder::on(&root);
        builder.margin(px(8.0));
        if with_text {
            builder
                .caption(&self.title, font(14.0))
                .x_label_area_size(px(30.0))
                .y_label_area_size(px(52.0));
        }
        let mut chart =
            builder.build_cartesian_2d(bounds.x_min..bounds.x_max, bounds.y_min..bounds.y_max)?;

        if with_text {
            chart
                .configure_mesh()
                .x_desc(X_DESC)
                .y_desc(Y_DESC)
                .label_style(font(9.0))
                .axis_desc_style(font(11.0))
                .draw()?;
        } else {
            chart.plotting_area().draw(&Rectangle::new(
                [(bounds.x_min, bounds.y_min), (bounds.x_max, bounds.y_max)],
                BLACK.stroke_width(stroke),
            ))?;
        }

        let legend_len = px(18.0) as i32;
        for trace in &self.traces {
            let [r, g, b] = trace.color;
            let color = RGBColor(r, g, b);
            let series = if let [point] = trace.points.as_slice() {
                chart.draw_series(std::iter::once(Circle::new(*point, stroke + 2, color.filled())))?
            } else {
                chart.draw_series(LineSeries::new(
                    trace.points.iter().copied(),
                    color.stroke_width(stroke),
                ))?
            };
            series
                .label(trace.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + legend_len, y)], color.stroke_width(stroke)));
        }

        if with_text && !self.traces.is_empty() {
            if self.traces.len() <= MAX_LEGEND_ENTRIES {
                chart
                    .configure_series_labels()
                    .position(SeriesLabelPosition::UpperRight)
                    .label_font(font(9.0))
                    .background_style(WHITE.mix(0.8))
                    .border_style(&BLACK)
                    .draw()?;
            } else {
                log::debug!("{}: {} traces, legend omitted", self.title, self.traces.len());
            }
        }

        root.present()?;
        Ok(())
    }
}

/// Data range mapped onto the plot area.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Bounds {
    const UNIT: Bounds = Bounds {
        x_min: 0.0,
        x_max: 1.0,
        y_min: 0.0,
        y_max: 1.0,
    };

    /// Spans every point with some headroom; the y range always includes
    /// the zero baseline.
    fn of(traces: &[Trace]) -> Option<Self> {
        let mut points = traces.iter().flat_map(|t| t.points.iter());
        let &(x0, y0) = points.next()?;
        let mut b = Bounds {
            x_min: x0,
            x_max: x0,
            y_min: y0.min(0.0),
            y_max: y0.max(0.0),
        };
        for &(x, y) in points {
            b.x_min = b.x_min.min(x);
            b.x_max = b.x_max.max(x);
            b.y_min = b.y_min.min(y);
            b.y_max = b.y_max.max(y);
        }
        if b.x_max - b.x_min <= f64::EPSILON {
            b.x_min -= 0.5;
            b.x_max += 0.5;
        }
        if b.y_max - b.y_min <= f64::EPSILON {
            b.y_max += 1.0;
        }
        b.y_max += (b.y_max - b.y_min) * 0.05;
        Some(b)
    }
}
