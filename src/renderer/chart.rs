//! Loss-curve charts for a repair run
//!
//! Two side-by-side panels plot the same history: raw values on a linear axis,
//! and log10 of the magnitude so terms that differ by orders of magnitude stay
//! readable.

use crate::cleanup::LossBreakdown;
use crate::layout::{BoundingBox, Point};
use crate::stylesheet::Palette;

use super::svg::{SvgBuilder, TextAnchor};
use super::SvgConfig;

const PANEL_WIDTH: f64 = 400.0;
const PANEL_HEIGHT: f64 = 240.0;
const PANEL_GAP: f64 = 60.0;
const LOG_EPSILON: f64 = 1e-6;

type Extract = fn(&LossBreakdown) -> f64;

fn total(b: &LossBreakdown) -> f64 {
    b.total
}

fn overlap(b: &LossBreakdown) -> f64 {
    b.overlap
}

fn existing(b: &LossBreakdown) -> f64 {
    b.existing_constraint
}

fn new_constraint(b: &LossBreakdown) -> f64 {
    b.new_constraint
}

fn reachability(b: &LossBreakdown) -> f64 {
    b.reachability
}

const SERIES: &[(&str, &str, Extract)] = &[
    ("Total", "series-total", total),
    ("Overlap", "series-overlap", overlap),
    ("Existing Constraint", "series-existing", existing),
    ("New Constraint", "series-new", new_constraint),
    ("Reachability", "series-reachability", reachability),
];

/// Render loss curves for every term of `history`
pub fn render_loss_curves(history: &[LossBreakdown], config: &SvgConfig, palette: &Palette) -> String {
    let mut builder = SvgBuilder::new(config.clone());
    builder.add_palette(palette);

    draw_panel(&mut builder, history, palette, 0.0, "Loss", |v| v);
    draw_panel(
        &mut builder,
        history,
        palette,
        PANEL_WIDTH + PANEL_GAP,
        "log10 |Loss|",
        |v| (v.abs() + LOG_EPSILON).log10(),
    );
    draw_legend(&mut builder, palette);

    builder.build(BoundingBox::new(
        0.0,
        -20.0,
        2.0 * PANEL_WIDTH + PANEL_GAP,
        PANEL_HEIGHT + 20.0 + 20.0 * SERIES.len() as f64 + 20.0,
    ))
}

fn draw_panel(
    builder: &mut SvgBuilder,
    history: &[LossBreakdown],
    palette: &Palette,
    left: f64,
    title: &str,
    transform: impl Fn(f64) -> f64,
) {
    builder.start_group(None, &["panel".to_string()]);
    builder.add_text(
        title,
        Point::new(left + PANEL_WIDTH / 2.0, -10.0),
        TextAnchor::Middle,
        "",
    );
    let axis = format!(r#" stroke="{}""#, palette.resolve_or_default("axis"));
    builder.add_line(
        Point::new(left, PANEL_HEIGHT),
        Point::new(left + PANEL_WIDTH, PANEL_HEIGHT),
        "axis",
        &axis,
    );
    builder.add_line(Point::new(left, 0.0), Point::new(left, PANEL_HEIGHT), "axis", &axis);

    let columns: Vec<Vec<f64>> = SERIES
        .iter()
        .map(|(_, _, extract)| {
            history
                .iter()
                .map(|b| transform(extract(b)))
                .filter(|v| v.is_finite())
                .collect()
        })
        .collect();

    let (lo, hi) = columns
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });

    if lo.is_finite() && hi.is_finite() {
        let span = if hi > lo { hi - lo } else { 1.0 };
        let last = history.len().saturating_sub(1).max(1) as f64;

        for ((_, token, _), values) in SERIES.iter().zip(&columns) {
            if values.len() != history.len() {
                continue;
            }
            let points: Vec<Point> = values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    Point::new(
                        left + PANEL_WIDTH * i as f64 / last,
                        PANEL_HEIGHT * (1.0 - (v - lo) / span),
                    )
                })
                .collect();
            let stroke = format!(
                r#" stroke="{}" stroke-width="1.5""#,
                palette.resolve_or_default(token)
            );
            builder.add_polyline(&points, "series", &stroke);
        }

        builder.add_text(
            &format!("{hi:.3e}"),
            Point::new(left - 4.0, 0.0),
            TextAnchor::End,
            "",
        );
        builder.add_text(
            &format!("{lo:.3e}"),
            Point::new(left - 4.0, PANEL_HEIGHT),
            TextAnchor::End,
            "",
        );
    }
    builder.end_group();
}

fn draw_legend(builder: &mut SvgBuilder, palette: &Palette) {
    builder.start_group(Some("legend"), &[]);
    for (row, (label, token, _)) in SERIES.iter().enumerate() {
        let y = PANEL_HEIGHT + 30.0 + 20.0 * row as f64;
        let stroke = format!(
            r#" stroke="{}" stroke-width="3""#,
            palette.resolve_or_default(token)
        );
        builder.add_line(Point::new(0.0, y), Point::new(24.0, y), "series", &stroke);
        builder.add_text(label, Point::new(32.0, y), TextAnchor::Start, "");
    }
    builder.end_group();
}
