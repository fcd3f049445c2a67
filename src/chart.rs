/// Bar chart of grouped counts
///
/// A `BarChart` is built from an `AggregationResult` and rendered to an SVG
/// document with plotters. Each render produces a complete document; the
/// browser swaps it in wholesale.

use crate::aggregate::AggregationResult;
use crate::error::ChartError;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::Serialize;

/// Fill colour of the bars
const BAR_COLOR: RGBColor = RGBColor(99, 110, 250);

/// Pixels left empty on either side of each bar
const BAR_MARGIN: u32 = 8;

/// Headroom above the tallest bar so its label stays inside the plot
const Y_HEADROOM: f64 = 1.15;

/// Titles and size of the chart
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_title: String,

    /// Label for the Y-axis
    pub y_title: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Gapminder Barplot".to_string(),
            x_title: "Continent".to_string(),
            y_title: "Count".to_string(),
            width: 480,
            height: 450,
        }
    }
}

/// A single bar
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bar {
    pub category: String,
    pub count: usize,
    pub percentage: f64,
    /// Text drawn above the bar, e.g. `60.0%`
    pub label: String,
}

/// Chart model: bars in descending-count order plus fixed titles
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub bars: Vec<Bar>,
}

/// Format a percentage to one decimal place with a `%` suffix
pub fn format_percentage(percentage: f64) -> String {
    format!("{:.1}%", percentage)
}

impl BarChart {
    pub fn from_aggregation(result: &AggregationResult, options: &ChartOptions) -> Self {
        let mut bars: Vec<Bar> = result
            .groups()
            .iter()
            .map(|g| Bar {
                category: g.category.clone(),
                count: g.count,
                percentage: g.percentage,
                label: format_percentage(g.percentage),
            })
            .collect();
        bars.sort_by(|a, b| b.count.cmp(&a.count));

        BarChart {
            title: options.title.clone(),
            x_title: options.x_title.clone(),
            y_title: options.y_title.clone(),
            bars,
        }
    }

    /// An empty chart: titles and axes, no bars
    pub fn empty(options: &ChartOptions) -> Self {
        Self::from_aggregation(&AggregationResult::default(), options)
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Draw the chart as an SVG document of `width` × `height` pixels.
    ///
    /// The x axis is segmented: bar `i` spans `Exact(i)..Exact(i + 1)` and its
    /// tick and percentage label sit at `CenterOf(i)`.
    pub fn render_svg(&self, width: u32, height: u32) -> Result<String, ChartError> {
        let slots = self.bars.len().max(1);
        let max_count = self.bars.iter().map(|b| b.count).max().unwrap_or(0);
        let y_top = (max_count as f64 * Y_HEADROOM).max(1.0);

        let categories: Vec<&str> = self.bars.iter().map(|b| b.category.as_str()).collect();
        let x_label = |x: &SegmentValue<usize>| -> String {
            match x {
                SegmentValue::CenterOf(i) => {
                    categories.get(*i).map(|c| c.to_string()).unwrap_or_default()
                }
                _ => String::new(),
            }
        };
        // Counts are whole numbers; leave fractional ticks unlabelled
        let y_label = |y: &f64| -> String {
            if (y - y.round()).abs() < 1e-9 {
                format!("{:.0}", y)
            } else {
                String::new()
            }
        };

        let label_style = TextStyle::from(("sans-serif", 13).into_font())
            .pos(Pos::new(HPos::Center, VPos::Bottom));

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_error)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(&self.title, ("sans-serif", 22).into_font())
                .margin(12)
                .x_label_area_size(45)
                .y_label_area_size(55)
                .build_cartesian_2d((0usize..slots).into_segmented(), 0f64..y_top)
                .map_err(render_error)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(slots + 1)
                .x_label_formatter(&x_label)
                .y_label_formatter(&y_label)
                .x_desc(&self.x_title)
                .y_desc(&self.y_title)
                .draw()
                .map_err(render_error)?;

            chart
                .draw_series(self.bars.iter().enumerate().map(|(i, bar)| {
                    let mut rect = Rectangle::new(
                        [
                            (SegmentValue::Exact(i), 0.0),
                            (SegmentValue::Exact(i + 1), bar.count as f64),
                        ],
                        BAR_COLOR.filled(),
                    );
                    rect.set_margin(0, 0, BAR_MARGIN, BAR_MARGIN);
                    rect
                }))
                .map_err(render_error)?;

            chart
                .draw_series(self.bars.iter().enumerate().map(|(i, bar)| {
                    Text::new(
                        bar.label.clone(),
                        (SegmentValue::CenterOf(i), bar.count as f64),
                        label_style.clone(),
                    )
                }))
                .map_err(render_error)?;

            root.present().map_err(render_error)?;
        }

        Ok(svg)
    }
}

fn render_error<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}
