use std::{fmt::Write, hint::black_box};

use criterion::{Criterion, criterion_group, criterion_main};
use promdash::exposition;

const SAMPLE_METRICS: &str = r#"
# HELP http_requests_total The total number of HTTP requests.
# TYPE http_requests_total counter
http_requests_total{method="post",code="200"} 1027 1395066363000
http_requests_total{method="post",code="400"}    3 1395066363000

# Escaping in label values:
msdos_file_access_time_seconds{path="C:\\DIR\\FILE.TXT",error="Cannot find file:\n\"FILE.TXT\""} 1.458255915e9

# Minimalistic line:
metric_without_timestamp_and_labels 12.47

# A histogram, which has a pretty complex representation in the text format:
# HELP http_request_duration_seconds A histogram of the request duration.
# TYPE http_request_duration_seconds histogram
http_request_duration_seconds_bucket{le="0.05"} 24054
http_request_duration_seconds_bucket{le="0.1"} 33444
http_request_duration_seconds_bucket{le="0.2"} 100392
http_request_duration_seconds_bucket{le="0.5"} 129389
http_request_duration_seconds_bucket{le="1"} 133988
http_request_duration_seconds_bucket{le="+Inf"} 144320
http_request_duration_seconds_sum 53423
http_request_duration_seconds_count 144320
"#;

fn benchmark_parser(c: &mut Criterion) {
    c.bench_function("exposition_parser", |b| {
        b.iter(|| {
            let metrics = exposition::parse(black_box(SAMPLE_METRICS));
            black_box(metrics.map(|m| m.len()).unwrap_or_default());
        });
    });
}

fn benchmark_large_metrics(c: &mut Criterion) {
    let mut large_metrics = String::with_capacity(1_000_000);

    large_metrics.push_str("# TYPE http_requests_total counter\n");
    for i in 0..10_000 {
        let _ = writeln!(
            large_metrics,
            "http_requests_total{{method=\"GET\",code=\"200\",path=\"/api/v{}/users\"}} {} 1395066363000",
            i % 10,
            i * 10
        );
    }

    large_metrics.push_str("# TYPE request_latency_seconds histogram\n");
    for i in 0..1_000 {
        let _ = writeln!(
            large_metrics,
            "request_latency_seconds_bucket{{le=\"{}\"}} {}",
            f64::from(i) / 100.0,
            i * 3
        );
    }
    large_metrics.push_str("request_latency_seconds_bucket{le=\"+Inf\"} 3000\n");
    large_metrics.push_str("request_latency_seconds_sum 1234.5\n");
    large_metrics.push_str("request_latency_seconds_count 3000\n");

    let large_metrics = large_metrics;

    c.bench_function("exposition_parser_large", |b| {
        b.iter(|| {
            let metrics = exposition::parse(black_box(&large_metrics));
            black_box(metrics.map(|m| m.len()).unwrap_or_default());
        });
    });
}

fn benchmark_escaped_labels(c: &mut Criterion) {
    // Metrics with lots of escaped labels that require allocation
    let escaped_metrics = r#"
# TYPE escaped_metric gauge
escaped_metric{path="C:\\Program Files\\App\\data.txt",message="Error: \"File not found\"\nPlease check path"} 1.0
escaped_metric{path="D:\\Users\\John\\Documents\\report.pdf",message="Success\nProcessed in 100ms"} 2.0
escaped_metric{json="{\"key\": \"value\", \"array\": [1, 2, 3]}"} 3.0
"#
    .repeat(1000);

    c.bench_function("exposition_parser_escaped", |b| {
        b.iter(|| {
            let metrics = exposition::parse(black_box(&escaped_metrics));
            black_box(metrics.map(|m| m.len()).unwrap_or_default());
        });
    });
}

criterion_group!(
    benches,
    benchmark_parser,
    benchmark_large_metrics,
    benchmark_escaped_labels
);
criterion_main!(benches);
