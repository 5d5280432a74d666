//! Prometheus text format parser
//!
//! This module turns a Prometheus text exposition payload into an ordered
//! sequence of [`Metric`] records.
//! <https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md>
//!
//! Supported are `# HELP` and `# TYPE` metadata, gauge, counter and histogram
//! types, and sample lines with an optional tag block and an optional
//! trailing timestamp. Other `#` lines are comments. Parsing is pure: no I/O,
//! no logging, no state shared between calls. The first malformed line
//! aborts the whole parse.

use crate::metric::Metric;

mod accumulator;
mod line;
mod number;
mod sample;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// The ways a single line can fail to parse.
pub enum ErrorKind {
    /// HELP or TYPE line without a metric name, or with nothing after it
    #[error("malformed metadata line: {0}")]
    MalformedMetadataLine(String),
    /// TYPE line naming a type other than gauge, counter or histogram
    #[error("unknown metric type: {0}")]
    UnknownMetricType(String),
    /// Tag segment missing `=`, quotes, or a key
    #[error("malformed tag: {0}")]
    MalformedTag(String),
    /// Sample line with an empty name or an unclosed tag block
    #[error("malformed sample line: {0}")]
    MalformedSampleLine(String),
    /// Value, bucket count or timestamp that is not a valid number
    #[error("invalid number: {0:?}")]
    NumberFormat(String),
    /// Histogram sample without an `le` tag
    #[error("histogram {metric} sample has no le tag")]
    MissingLabel {
        /// Identifier of the histogram
        metric: String,
    },
    /// Histogram sample repeating an `le` value
    #[error("histogram {metric} repeats bucket le={bucket:?}")]
    DuplicateBucketKey {
        /// Identifier of the histogram
        metric: String,
        /// The repeated `le` value
        bucket: String,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
/// Errors produced by [`parse`]
pub struct Error {
    /// 1-based number of the failing line
    pub line: usize,
    /// What went wrong
    pub kind: ErrorKind,
}

/// Parse a Prometheus text exposition payload.
///
/// Records are returned in the order their identifier, or for non-histograms
/// their identifier and tag combination, was first introduced.
///
/// # Errors
///
/// Returns the first line that fails to parse. No partial result is
/// returned.
pub fn parse(text: &str) -> Result<Vec<Metric>, Error> {
    let mut accumulator = accumulator::Accumulator::new();

    for (line, raw) in line::lines(text) {
        line::classify(raw)
            .and_then(|classified| accumulator.apply(classified))
            .map_err(|kind| Error { line, kind })?;
    }

    Ok(accumulator.finish())
}
