//! Tabular text rendering of parsed metrics.
//!
//! The display is a passive consumer: it reads the latest sequence of
//! [`Metric`] records and lays them out as a table with the columns
//! `Identifier | Type | Value | Tags`, each padded to its widest cell.

use std::fmt::Write;

use rustc_hash::FxHashSet;

use crate::metric::{Metric, Value};

const HEADER: [&str; 4] = ["Identifier", "Type", "Value", "Tags"];
const ABSENT: &str = "-";

/// Escape a tag value the way the exposition format writes it.
fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn value_cell(metric: &Metric) -> String {
    match metric.value() {
        None => ABSENT.to_string(),
        Some(Value::Scalar(v)) => v.to_string(),
        Some(Value::Histogram(buckets)) => {
            let mut cell = buckets
                .iter()
                .map(|(bound, count)| format!("{bound}={count}"))
                .collect::<Vec<_>>()
                .join(" ");
            if !cell.is_empty() {
                cell.push(' ');
            }
            let _ = write!(cell, "sum={} count={}", metric.sum(), metric.count());
            cell
        }
    }
}

fn tags_cell(metric: &Metric) -> String {
    metric
        .tags()
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", escape(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn row(metric: &Metric) -> [String; 4] {
    [
        metric.identifier().to_string(),
        metric.metric_type().to_string(),
        value_cell(metric),
        tags_cell(metric),
    ]
}

fn push_line<S: AsRef<str>>(out: &mut String, cells: &[S; 4], widths: &[usize; 4]) {
    let mut line = String::new();
    for (idx, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str(" | ");
        }
        let _ = write!(line, "{:<width$}", cell.as_ref());
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Render `metrics` as a table.
///
/// When `filter` is given only metrics whose identifier it lists are shown,
/// in input order.
#[must_use]
pub fn render(metrics: &[Metric], filter: Option<&[String]>) -> String {
    let filter: Option<FxHashSet<&str>> =
        filter.map(|names| names.iter().map(String::as_str).collect());

    let rows: Vec<[String; 4]> = metrics
        .iter()
        .filter(|metric| {
            filter
                .as_ref()
                .is_none_or(|names| names.contains(metric.identifier()))
        })
        .map(row)
        .collect();

    let mut widths = HEADER.map(|h| h.chars().count());
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADER, &widths);
    let rule = widths.map(|w| "-".repeat(w));
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for cells in &rows {
        push_line(&mut out, cells, &widths);
    }
    out
}

/// Render an error and its chain of sources, one per line.
#[must_use]
pub fn render_error(err: &dyn std::error::Error) -> String {
    let mut out = format!("error: {err}\n");
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(out, "  caused by: {cause}");
        source = cause.source();
    }
    out
}
