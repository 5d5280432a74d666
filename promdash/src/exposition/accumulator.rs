//! The metric accumulator.
//!
//! The exposition format spreads one logical metric across several physical
//! lines: HELP and TYPE metadata, one sample per tag combination, and for
//! histograms a run of `_bucket` samples followed by `_sum` and `_count`. The
//! [`Accumulator`] folds those lines, in order, into [`Metric`] records.
//!
//! # Semantics
//!
//! The accumulator tracks the *current* record, the one most recently created
//! or continued, by its index in the output. For each line:
//!
//! * HELP / TYPE for the current identifier update the current record,
//!   otherwise a new record is started.
//! * A sample named `<current>_sum` or `<current>_count` sets the current
//!   record's aggregate and changes nothing else.
//! * A sample named `<current>_bucket` continues the current record.
//! * A sample named `<current>` continues the current record, unless that
//!   record already holds tags from an earlier sample and is not a histogram,
//!   in which case a sibling record is started for the new tag combination.
//! * Any other sample starts a new record.
//!
//! Suffixes are only recognised against the current identifier, never by
//! searching earlier records.

use super::{
    ErrorKind,
    line::Line,
    number,
    sample::{self, Sample},
};
use crate::metric::{Metric, MetricType};

const SUM: &str = "_sum";
const COUNT: &str = "_count";
const BUCKET: &str = "_bucket";
const LE: &str = "le";

#[derive(Debug, Default)]
pub(crate) struct Accumulator {
    records: Vec<Metric>,
    current: Option<usize>,
}

impl Accumulator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Apply one classified line.
    pub(crate) fn apply(&mut self, line: Line<'_>) -> Result<(), ErrorKind> {
        match line {
            Line::Blank | Line::Comment => Ok(()),
            Line::Help { name, text } => {
                self.describe(name).set_help(text);
                Ok(())
            }
            Line::Type { name, metric_type } => {
                self.describe(name).set_type(metric_type);
                Ok(())
            }
            Line::Sample(raw) => self.sample(sample::tokenize(raw)?),
        }
    }

    /// The records in first-introduction order.
    pub(crate) fn finish(self) -> Vec<Metric> {
        self.records
    }

    /// Append `metric` and make it current.
    fn start_new(&mut self, metric: Metric) -> usize {
        self.records.push(metric);
        let idx = self.records.len() - 1;
        self.current = Some(idx);
        idx
    }

    /// Continue the current record with a new sample, splitting off a sibling
    /// if the sample is a further tag combination of a non-histogram.
    fn continue_current(&mut self, idx: usize) -> usize {
        let current = &self.records[idx];
        if current.tags().is_empty() || current.metric_type() == MetricType::Histogram {
            idx
        } else {
            let sibling = current.sibling();
            self.start_new(sibling)
        }
    }

    /// Record a bucket sample on the histogram at `idx`.
    fn merge_bucket(
        &mut self,
        idx: usize,
        value: &str,
        timestamp: Option<&str>,
    ) -> Result<(), ErrorKind> {
        let metric = &mut self.records[idx];
        let bound = metric
            .tag(LE)
            .map(str::to_string)
            .ok_or_else(|| ErrorKind::MissingLabel {
                metric: metric.identifier().to_string(),
            })?;
        let count = number::decode_count(value)?;
        if let Some(timestamp) = timestamp {
            number::decode_timestamp(timestamp)?;
        }
        if metric.insert_bucket(&bound, count) {
            Ok(())
        } else {
            Err(ErrorKind::DuplicateBucketKey {
                metric: metric.identifier().to_string(),
                bucket: bound,
            })
        }
    }

    /// The current record if it is named `name`, otherwise a new one.
    fn describe(&mut self, name: &str) -> &mut Metric {
        let idx = match self.current {
            Some(idx) if self.records[idx].identifier() == name => idx,
            _ => self.start_new(Metric::new(name)),
        };
        &mut self.records[idx]
    }

    fn sample(&mut self, sample: Sample<'_>) -> Result<(), ErrorKind> {
        let Sample {
            name,
            tags,
            value,
            timestamp,
        } = sample;

        let idx = match self.current {
            Some(idx) if self.records[idx].identifier() == name => self.continue_current(idx),
            Some(idx) => {
                let current = &mut self.records[idx];
                match name.strip_prefix(current.identifier()) {
                    Some(SUM) => {
                        current.set_sum(number::decode_float(value)?);
                        return Ok(());
                    }
                    Some(COUNT) => {
                        current.set_count(number::decode_float(value)?);
                        return Ok(());
                    }
                    Some(BUCKET) => idx,
                    _ => self.start_new(Metric::new(name)),
                }
            }
            None => self.start_new(Metric::new(name)),
        };

        let metric = &mut self.records[idx];
        metric.set_tags(tags);

        if metric.metric_type() == MetricType::Histogram {
            return self.merge_bucket(idx, value, timestamp);
        }

        let value = number::decode_float(value)?;
        let timestamp = timestamp.map(number::decode_timestamp).transpose()?;
        metric.set_scalar(value, timestamp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposition::line;

    fn run(text: &str) -> Result<Vec<Metric>, ErrorKind> {
        let mut accumulator = Accumulator::new();
        for (_, raw) in line::lines(text) {
            accumulator.apply(line::classify(raw)?)?;
        }
        Ok(accumulator.finish())
    }

    #[test]
    fn help_then_type_share_a_record() {
        let metrics = run("# HELP up is it up\n# TYPE up gauge\nup 1").expect("parse failed");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].help(), Some("is it up"));
        assert_eq!(metrics[0].metric_type(), MetricType::Gauge);
        assert_eq!(metrics[0].scalar(), Ok(1.0));
    }

    #[test]
    fn metadata_for_new_name_starts_record() {
        let metrics = run("# HELP a first\n# TYPE b counter").expect("parse failed");
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].identifier(), "a");
        assert_eq!(metrics[0].metric_type(), MetricType::Unspecified);
        assert_eq!(metrics[1].identifier(), "b");
        assert!(metrics[1].help().is_none());
    }

    #[test]
    fn sum_and_count_do_not_touch_tags() {
        let metrics = run(
            "# TYPE prom_warning counter\nprom_warning{a=\"1\"} 1\nprom_warning_sum{b=\"2\"} 1.6238\nprom_warning_count 1.11",
        )
        .expect("parse failed");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].sum(), 1.6238);
        assert_eq!(metrics[0].count(), 1.11);
        assert_eq!(metrics[0].tag("a"), Some("1"));
        assert_eq!(metrics[0].tag("b"), None);
    }

    #[test]
    fn suffix_must_extend_current_identifier() {
        // `foo_bar_sum` is not `foo` + `_sum`, and `other_sum` does not match
        // the current record at all.
        let metrics = run("foo 1\nfoo_bar_sum 2\nother_sum 3").expect("parse failed");
        let names: Vec<_> = metrics.iter().map(Metric::identifier).collect();
        assert_eq!(names, vec!["foo", "foo_bar_sum", "other_sum"]);
        assert_eq!(metrics[0].sum(), 0.0);
    }

    #[test]
    fn suffix_without_current_starts_record() {
        let metrics = run("orphan_count 4").expect("parse failed");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].identifier(), "orphan_count");
        assert_eq!(metrics[0].scalar(), Ok(4.0));
    }

    #[test]
    fn untagged_repeat_overwrites() {
        let metrics = run("up 1\nup 0").expect("parse failed");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].scalar(), Ok(0.0));
    }

    #[test]
    fn identical_tag_sets_append() {
        let metrics = run("up{a=\"1\"} 1\nup{a=\"1\"} 2").expect("parse failed");
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].scalar(), Ok(1.0));
        assert_eq!(metrics[1].scalar(), Ok(2.0));
    }

    #[test]
    fn bucket_on_untyped_metric_is_scalar() {
        let metrics = run("foo 1\nfoo_bucket{le=\"1\"} 5").expect("parse failed");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].scalar(), Ok(5.0));
        assert_eq!(metrics[0].tag("le"), Some("1"));
    }

    #[test]
    fn histogram_without_le_is_missing_label() {
        let err = run("# TYPE h histogram\nh_bucket{handler=\"/\"} 1").expect_err("should fail");
        assert_eq!(
            err,
            ErrorKind::MissingLabel {
                metric: "h".to_string()
            }
        );
    }

    #[test]
    fn histogram_duplicate_bucket() {
        let err = run("# TYPE h histogram\nh_bucket{le=\"1\"} 1\nh_bucket{le=\"1\"} 2")
            .expect_err("should fail");
        assert_eq!(
            err,
            ErrorKind::DuplicateBucketKey {
                metric: "h".to_string(),
                bucket: "1".to_string(),
            }
        );
    }

    #[test]
    fn histogram_samples_under_base_name_merge() {
        let metrics =
            run("# TYPE h histogram\nh{le=\"1\"} 1\nh{le=\"+Inf\"} 2").expect("parse failed");
        assert_eq!(metrics.len(), 1);
        let buckets = metrics[0].buckets().expect("histogram");
        assert_eq!(buckets.get("1"), Some(1));
        assert_eq!(buckets.get("+Inf"), Some(2));
    }

    #[test]
    fn histogram_bucket_must_be_whole() {
        let err = run("# TYPE h histogram\nh_bucket{le=\"1\"} 1.5").expect_err("should fail");
        assert_eq!(err, ErrorKind::NumberFormat("1.5".to_string()));
    }

    #[test]
    fn timestamp_is_recorded() {
        let metrics = run("up 1 1395066363000").expect("parse failed");
        assert_eq!(metrics[0].timestamp(), Some(1_395_066_363_000));
    }
}
