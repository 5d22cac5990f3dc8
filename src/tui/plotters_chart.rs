//! Plotters-powered cumulative factor chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct FactorChart<'a> {
    /// Cumulative factor per month, x = position in `months`.
    pub points: &'a [(f64, f64)],
    /// `MM/YYYY` labels, one per point.
    pub months: &'a [String],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: String,
}

impl<'a> Widget for FactorChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let months = self.months;
        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 9)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(&self.y_label)
                .x_labels(months.len().clamp(2, 6))
                .y_labels(5)
                .x_label_formatter(&|v| month_label(months, *v))
                .y_label_formatter(&|v| format!("{v:.4}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let baseline_color = RGBColor(128, 128, 128);
            let curve_color = RGBColor(0, 255, 255); // cyan
            let point_color = WHITE;

            // No-change level.
            chart.draw_series(LineSeries::new([(x0, 1.0), (x1, 1.0)], &baseline_color))?;

            chart.draw_series(LineSeries::new(self.points.iter().copied(), &curve_color))?;

            // `Circle` radii come out wrong through the ratatui backend; pixels stay crisp.
            chart.draw_series(self.points.iter().map(|&(x, y)| Pixel::new((x, y), point_color)))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// Label for the tick at `x`, empty between months.
fn month_label(months: &[String], x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    months.get(rounded as usize).cloned().unwrap_or_default()
}
