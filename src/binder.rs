/// Reactive binding between the table's visible rows and the chart
///
/// A `Binding` connects exactly one producer to exactly one handler. Each
/// `emit` runs the handler to completion on the caller's thread and replaces
/// the previously stored output. There is no queue: the caller (one session,
/// one event at a time) already serializes emissions.

use crate::aggregate::aggregate_visible;
use crate::chart::BarChart;
use crate::context::DashboardContext;
use crate::dataset::Record;
use crate::error::AggregationError;
use std::sync::Arc;

/// Single-producer, single-consumer signal with a synchronous handler
pub struct Binding<In: ?Sized, Out> {
    handler: Box<dyn FnMut(Option<&In>) -> Out>,
    latest: Option<Out>,
    generation: u64,
}

impl<In: ?Sized, Out> Binding<In, Out> {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(Option<&In>) -> Out + 'static,
    {
        Binding {
            handler: Box::new(handler),
            latest: None,
            generation: 0,
        }
    }

    /// Run the handler for a new upstream value and keep its output.
    ///
    /// `None` is the unset signal the table emits before any interaction.
    pub fn emit(&mut self, value: Option<&In>) -> &Out {
        let out = (self.handler)(value);
        self.generation += 1;
        self.latest.insert(out)
    }

    /// Output of the most recent emission, if any
    pub fn latest(&self) -> Option<&Out> {
        self.latest.as_ref()
    }

    /// Number of emissions so far
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// One rendered state of the chart
#[derive(Debug, Clone)]
pub struct ChartFrame {
    pub chart: BarChart,
    /// `None` when drawing failed; the bars are still reported
    pub svg: Option<String>,
}

/// Wire the dashboard's chart to the table's visible rows.
///
/// A row set missing the grouping column, or a render failure, is logged and
/// leaves the session usable: the next emission recomputes from scratch.
pub fn chart_binding(ctx: Arc<DashboardContext>) -> Binding<[Record], ChartFrame> {
    Binding::new(move |visible: Option<&[Record]>| {
        let chart = match aggregate_visible(visible, &ctx.dataset, &ctx.group_by) {
            Ok(result) => BarChart::from_aggregation(&result, &ctx.chart),
            Err(AggregationError::MissingColumn { column, row }) => {
                log::warn!(
                    "Row {} has no '{}' column; showing an empty chart",
                    row,
                    column
                );
                BarChart::empty(&ctx.chart)
            }
        };

        let svg = match chart.render_svg(ctx.chart.width, ctx.chart.height) {
            Ok(svg) => Some(svg),
            Err(e) => {
                log::error!("{}", e);
                None
            }
        };

        ChartFrame { chart, svg }
    })
}
