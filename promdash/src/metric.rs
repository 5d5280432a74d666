//! Metric records produced by the exposition parser.
//!
//! A [`Metric`] is created the first time the parser meets its identifier, or
//! a fresh tag combination of a non-histogram identifier, and is mutated in
//! place by subsequent lines describing it. Once [`crate::exposition::parse`]
//! returns, records are read-only to callers: every mutator is crate-private.

use std::{fmt, str::FromStr};

use crate::exposition::ErrorKind;

/// Ordered label pairs, insertion order preserved.
pub type Tags = Vec<(String, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// The kind of a metric as declared by a TYPE line.
pub enum MetricType {
    /// No TYPE line has been seen for the metric.
    #[default]
    Unspecified,
    /// A single numerical value that can go up and down.
    Gauge,
    /// A cumulative, monotonically increasing value.
    Counter,
    /// Observations counted in cumulative `le` buckets.
    Histogram,
}

impl MetricType {
    /// The lowercase name of this type, `unspecified` for [`MetricType::Unspecified`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Gauge => "gauge",
            Self::Counter => "counter",
            Self::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = ErrorKind;

    /// Decode a TYPE line's type word, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("gauge") {
            Ok(Self::Gauge)
        } else if s.eq_ignore_ascii_case("counter") {
            Ok(Self::Counter)
        } else if s.eq_ignore_ascii_case("histogram") {
            Ok(Self::Histogram)
        } else {
            Err(ErrorKind::UnknownMetricType(s.to_string()))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Histogram buckets keyed by their `le` label, in insertion order.
///
/// Bucket labels are unique. The labels are kept verbatim, so `"1"` and
/// `"1.0"` are distinct buckets.
pub struct Buckets {
    inner: Vec<(String, u64)>,
}

impl Buckets {
    /// Create an empty bucket map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bucket. Returns `false`, leaving the map untouched, if a
    /// bucket with this label already exists.
    pub fn insert(&mut self, bound: &str, count: u64) -> bool {
        if self.get(bound).is_some() {
            return false;
        }
        self.inner.push((bound.to_string(), count));
        true
    }

    /// The cumulative count of the bucket labelled `bound`.
    #[must_use]
    pub fn get(&self, bound: &str) -> Option<u64> {
        self.inner
            .iter()
            .find_map(|(b, count)| (b == bound).then_some(*count))
    }

    /// Number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no bucket has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The most recently inserted bucket, conventionally `+Inf`.
    #[must_use]
    pub fn last(&self) -> Option<(&str, u64)> {
        self.inner.last().map(|(b, count)| (b.as_str(), *count))
    }

    /// Iterate buckets in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.inner.iter().map(|(b, count)| (b.as_str(), *count))
    }
}

#[derive(Debug, Clone, PartialEq)]
/// The value carried by a [`Metric`].
pub enum Value {
    /// The value of an unspecified, gauge or counter metric.
    Scalar(f64),
    /// The buckets of a histogram metric.
    Histogram(Buckets),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Histogram(_) => "histogram",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors produced when reading a [`Metric`].
pub enum Error {
    /// The caller asked for a value variant the record does not hold.
    #[error("expected a {expected} value but the metric holds {found}")]
    TypeMismatch {
        /// The requested variant.
        expected: &'static str,
        /// The variant actually stored, `nothing` if no value was set.
        found: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// A single parsed metric.
pub struct Metric {
    identifier: String,
    help: Option<String>,
    metric_type: MetricType,
    value: Option<Value>,
    sum: f64,
    count: f64,
    tags: Tags,
    timestamp: Option<i64>,
}

impl Metric {
    pub(crate) fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            help: None,
            metric_type: MetricType::Unspecified,
            value: None,
            sum: 0.0,
            count: 0.0,
            tags: Vec::new(),
            timestamp: None,
        }
    }

    /// A sibling record for a new tag combination: same identifier, help and
    /// type, but no value, tags or aggregates.
    pub(crate) fn sibling(&self) -> Self {
        let mut metric = Self::new(&self.identifier);
        metric.help.clone_from(&self.help);
        metric.set_type(self.metric_type);
        metric
    }

    /// The metric name.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The HELP text, if a HELP line was seen.
    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// The declared type.
    #[must_use]
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// The stored value, absent if no sample line was applied.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The scalar value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the record holds histogram buckets or
    /// no value at all.
    pub fn scalar(&self) -> Result<f64, Error> {
        match &self.value {
            Some(Value::Scalar(v)) => Ok(*v),
            other => Err(Error::TypeMismatch {
                expected: "scalar",
                found: other.as_ref().map_or("nothing", Value::kind),
            }),
        }
    }

    /// The histogram buckets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the record is not a histogram.
    pub fn buckets(&self) -> Result<&Buckets, Error> {
        match &self.value {
            Some(Value::Histogram(buckets)) => Ok(buckets),
            other => Err(Error::TypeMismatch {
                expected: "histogram",
                found: other.as_ref().map_or("nothing", Value::kind),
            }),
        }
    }

    /// The value of the `<identifier>_sum` line, 0 if none was seen.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// The value of the `<identifier>_count` line, 0 if none was seen.
    #[must_use]
    pub fn count(&self) -> f64 {
        self.count
    }

    /// The tags of the last sample applied to this record.
    #[must_use]
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    /// The value of the first tag named `key`.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }

    /// The timestamp, in milliseconds since the Unix epoch, of the last scalar
    /// sample that carried one.
    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub(crate) fn set_help(&mut self, help: &str) {
        self.help = Some(help.to_string());
    }

    /// Set the type, keeping the value shape consistent with it: a histogram
    /// always holds buckets, nothing else ever does.
    pub(crate) fn set_type(&mut self, metric_type: MetricType) {
        self.metric_type = metric_type;
        match (metric_type, &self.value) {
            (MetricType::Histogram, Some(Value::Histogram(_))) => {}
            (MetricType::Histogram, _) => {
                self.value = Some(Value::Histogram(Buckets::new()));
            }
            (_, Some(Value::Histogram(_))) => self.value = None,
            _ => {}
        }
    }

    pub(crate) fn set_tags(&mut self, tags: Tags) {
        self.tags = tags;
    }

    pub(crate) fn set_scalar(&mut self, value: f64, timestamp: Option<i64>) {
        debug_assert_ne!(self.metric_type, MetricType::Histogram);
        self.value = Some(Value::Scalar(value));
        self.timestamp = timestamp;
    }

    /// Mutable buckets, `None` unless this record is a histogram.
    /// Record one histogram bucket. Returns false if `bound` is already
    /// present, leaving the earlier count in place.
    pub(crate) fn insert_bucket(&mut self, bound: &str, count: u64) -> bool {
        debug_assert_eq!(self.metric_type, MetricType::Histogram);
        if let Some(Value::Histogram(buckets)) = &mut self.value {
            return buckets.insert(bound, count);
        }
        let mut buckets = Buckets::new();
        buckets.insert(bound, count);
        self.value = Some(Value::Histogram(buckets));
        true
    }

    pub(crate) fn set_sum(&mut self, sum: f64) {
        self.sum = sum;
    }

    pub(crate) fn set_count(&mut self, count: f64) {
        self.count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_words_are_case_insensitive() {
        assert_eq!("gauge".parse::<MetricType>(), Ok(MetricType::Gauge));
        assert_eq!("COUNTER".parse::<MetricType>(), Ok(MetricType::Counter));
        assert_eq!("Histogram".parse::<MetricType>(), Ok(MetricType::Histogram));
        assert_eq!(
            "summary".parse::<MetricType>(),
            Err(ErrorKind::UnknownMetricType("summary".to_string()))
        );
    }

    #[test]
    fn fresh_metric_is_unspecified_and_empty() {
        let metric = Metric::new("up");
        assert_eq!(metric.identifier(), "up");
        assert_eq!(metric.metric_type(), MetricType::Unspecified);
        assert!(metric.help().is_none());
        assert!(metric.value().is_none());
        assert!(metric.tags().is_empty());
        assert_eq!(metric.sum(), 0.0);
        assert_eq!(metric.count(), 0.0);
    }

    #[test]
    fn wrong_variant_access_is_type_mismatch() {
        let mut metric = Metric::new("up");
        assert_eq!(
            metric.scalar(),
            Err(Error::TypeMismatch {
                expected: "scalar",
                found: "nothing"
            })
        );

        metric.set_scalar(1.0, None);
        assert_eq!(metric.scalar(), Ok(1.0));
        assert_eq!(
            metric.buckets(),
            Err(Error::TypeMismatch {
                expected: "histogram",
                found: "scalar"
            })
        );

        metric.set_type(MetricType::Histogram);
        assert!(metric.buckets().is_ok());
        assert_eq!(
            metric.scalar(),
            Err(Error::TypeMismatch {
                expected: "scalar",
                found: "histogram"
            })
        );
    }

    #[test]
    fn value_shape_follows_type() {
        let mut metric = Metric::new("latency");
        metric.set_type(MetricType::Histogram);
        assert!(matches!(metric.value(), Some(Value::Histogram(b)) if b.is_empty()));

        assert!(metric.insert_bucket("1", 3));
        assert!(!metric.insert_bucket("1", 4));
        metric.set_type(MetricType::Histogram);
        assert_eq!(metric.buckets().map(Buckets::len), Ok(1));

        metric.set_type(MetricType::Gauge);
        assert!(metric.value().is_none());
    }

    #[test]
    fn insert_bucket_keeps_first_count() {
        let mut metric = Metric::new("latency");
        metric.set_type(MetricType::Histogram);

        assert!(metric.insert_bucket("0.5", 2));
        assert!(metric.insert_bucket("+Inf", 5));
        assert!(!metric.insert_bucket("0.5", 7));

        let buckets = metric.buckets().expect("histogram");
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets.get("0.5"), Some(2));
    }

    #[test]
    fn duplicate_bucket_is_rejected() {
        let mut buckets = Buckets::new();
        assert!(buckets.insert("0.1", 1));
        assert!(buckets.insert("+Inf", 4));
        assert!(!buckets.insert("0.1", 9));

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets.get("0.1"), Some(1));
        assert_eq!(buckets.last(), Some(("+Inf", 4)));
        assert_eq!(
            buckets.iter().collect::<Vec<_>>(),
            vec![("0.1", 1), ("+Inf", 4)]
        );
    }

    #[test]
    fn sibling_copies_identity_only() {
        let mut metric = Metric::new("gc_gen");
        metric.set_help("gc gen");
        metric.set_type(MetricType::Counter);
        metric.set_tags(vec![("g".to_string(), "0".to_string())]);
        metric.set_scalar(10.0, Some(7));
        metric.set_sum(2.0);

        let sibling = metric.sibling();
        assert_eq!(sibling.identifier(), "gc_gen");
        assert_eq!(sibling.help(), Some("gc gen"));
        assert_eq!(sibling.metric_type(), MetricType::Counter);
        assert!(sibling.tags().is_empty());
        assert!(sibling.value().is_none());
        assert!(sibling.timestamp().is_none());
        assert_eq!(sibling.sum(), 0.0);
    }

    #[test]
    fn tag_lookup_returns_first_match() {
        let mut metric = Metric::new("m");
        metric.set_tags(vec![
            ("a".to_string(), "1".to_string()),
            ("a".to_string(), "2".to_string()),
        ]);
        assert_eq!(metric.tag("a"), Some("1"));
        assert_eq!(metric.tag("b"), None);
    }
}
