#![no_main]

use libfuzzer_sys::fuzz_target;
use promdash::{
    display,
    exposition::{self, ErrorKind},
    metric::{MetricType, Value},
};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        fuzz_exposition_parser(text);
    }
});

fn fuzz_exposition_parser(text: &str) {
    let first = exposition::parse(text);
    // No hidden state: a second parse must agree with the first.
    assert_eq!(first, exposition::parse(text));

    match first {
        Ok(metrics) => {
            for metric in &metrics {
                assert!(!metric.identifier().is_empty(), "empty identifier accepted");
                for (key, _value) in metric.tags() {
                    assert!(!key.is_empty(), "empty tag key accepted");
                }
                // The value shape always follows the declared type.
                match (metric.metric_type(), metric.value()) {
                    (MetricType::Histogram, Some(Value::Histogram(_))) => {}
                    (MetricType::Histogram, other) => {
                        panic!("histogram holds {other:?}")
                    }
                    (_, Some(Value::Histogram(_))) => panic!("buckets on a non-histogram"),
                    _ => {}
                }
            }
            let _ = display::render(&metrics, None);
        }
        Err(err) => {
            assert!(err.line >= 1, "line numbers start at 1");
            if let ErrorKind::MissingLabel { metric } | ErrorKind::DuplicateBucketKey { metric, .. } =
                &err.kind
            {
                assert!(!metric.is_empty());
            }
        }
    }

    // Use text as a label value, which must survive escaping.
    let escaped = text
        .replace('\\', r"\\")
        .replace('"', r#"\""#)
        .replace('\n', r"\n");
    if !text.contains('\r') {
        let line = format!("metric{{label=\"{escaped}\"}} 789");
        let metrics = exposition::parse(&line).expect("escaped label value must parse");
        assert_eq!(metrics[0].tag("label"), Some(text));
    }
}
