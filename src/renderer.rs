//! # Terminal Rendering
//!
//! Development-mode output for running the meter without the LED strip:
//! a 24-hour ASCII tide chart built from the interpolated window, and a
//! one-line picture of an LED frame.

use crate::leds::LedFrame;
use crate::window::PredictionWindow;
use chrono::{DateTime, Duration, Local, Utc};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

const ROWS: usize = 24;
const Y_AXIS_WIDTH: usize = 5; // Space for Y-axis labels
const HALF_SPAN_MINUTES: i64 = 720;
const STEP_MINUTES: i64 = 10;

/// Interpolated level every 10 minutes from -12 h to +12 h around `now`.
///
/// Entries outside the window are `None`; the chart leaves those columns blank.
pub fn chart_samples(window: &PredictionWindow, now: DateTime<Utc>) -> Vec<(i64, Option<f64>)> {
    (-HALF_SPAN_MINUTES..=HALF_SPAN_MINUTES)
        .step_by(STEP_MINUTES as usize)
        .map(|mins_rel| {
            let level = window
                .tide_at(now + Duration::minutes(mins_rel))
                .map(|tide| tide.level);
            (mins_rel, level)
        })
        .collect()
}

/// Build the ASCII tide chart, or `None` when the window covers none of the 24 hours.
pub fn ascii_chart(window: &PredictionWindow, now: DateTime<Utc>) -> Option<String> {
    let samples = chart_samples(window, now);
    let (min_ft, max_ft) = samples
        .iter()
        .filter_map(|(_, level)| *level)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), level| {
            (min.min(level), max.max(level))
        });
    if !min_ft.is_finite() {
        return None;
    }
    let range = (max_ft - min_ft).max(0.1);

    let tide_to_row = |tide_ft: f64| {
        let normalized = (tide_ft - min_ft) / range;
        ((1.0 - normalized) * (ROWS as f64 - 1.0)).round() as usize
    };

    let mut grid = vec![vec![' '; samples.len() + Y_AXIS_WIDTH]; ROWS];

    // Y-axis labels every whole foot (half foot for small ranges)
    let tide_step = if range > 4.0 { 1.0 } else { 0.5 };
    let mut label_ft = (min_ft / tide_step).ceil() * tide_step;
    while label_ft <= max_ft {
        let row = tide_to_row(label_ft);
        if row < ROWS {
            let label = format!("{:<width$}", format_height(label_ft), width = Y_AXIS_WIDTH - 1);
            for (i, ch) in label.chars().take(Y_AXIS_WIDTH - 1).enumerate() {
                grid[row][i] = ch;
            }
            grid[row][Y_AXIS_WIDTH - 1] = '│';
        }
        label_ft += tide_step;
    }

    for (column, (mins_rel, level)) in samples.iter().enumerate() {
        if let Some(level) = level {
            let row = tide_to_row(*level).min(ROWS - 1);
            grid[row][column + Y_AXIS_WIDTH] = if *mins_rel == 0 { 'X' } else { '•' };
        }
    }

    let mut out = String::new();
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    // Hour markers below the chart
    let padding = " ".repeat(Y_AXIS_WIDTH);
    let markers: String = (0..samples.len())
        .map(|i| if i % 6 == 0 { '|' } else { ' ' })
        .collect();
    out.push_str(&padding);
    out.push_str(&markers);
    out.push('\n');
    out.push_str(&format!(
        "{padding}-12h{:^width$}+12h   (now {})\n",
        "now",
        now.with_timezone(&Local).format("%-m/%-d %-I:%M%p"),
        width = samples.len().saturating_sub(8)
    ));
    Some(out)
}

/// Print the 24-hour chart to stdout.
pub fn draw_ascii(window: &PredictionWindow, now: DateTime<Utc>) {
    match ascii_chart(window, now) {
        Some(chart) => print!("{chart}"),
        None => println!("No tide predictions cover the last or next 12 hours."),
    }
}

/// One character per indicator: `·` for off, otherwise the initial of the
/// nearest primary/secondary colour.
pub fn render_frame(frame: &LedFrame) -> String {
    let group = |colours: &[Rgb888]| colours.iter().map(|c| colour_char(*c)).collect::<String>();
    format!(
        "[{}] [{}] [{}] {:>5}ms",
        group(&frame.low),
        group(&frame.level),
        group(&frame.high),
        frame.display_time.as_millis()
    )
}

fn colour_char(colour: Rgb888) -> char {
    if colour == Rgb888::BLACK {
        return '·';
    }
    let on = |v: u8| v >= 128;
    match (on(colour.r()), on(colour.g()), on(colour.b())) {
        (true, false, false) => 'R',
        (false, true, false) => 'G',
        (false, false, true) => 'B',
        (true, false, true) => 'M',
        (false, true, true) => 'C',
        (true, true, false) => 'Y',
        (true, true, true) => 'W',
        (false, false, false) => '*',
    }
}

/// Format a tide height with one decimal, dropping a trailing `.0`.
fn format_height(tide_ft: f64) -> String {
    if tide_ft.fract() == 0.0 {
        format!("{:.0}", tide_ft)
    } else {
        format!("{:.1}", tide_ft)
    }
}
