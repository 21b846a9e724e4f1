//! 批量检测器基准测试
//!
//! 测试URL规范化、结果汇总以及批量调度本身的开销

use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use url_vitals::checker::{
    normalize, BatchChecker, BatchSummary, CheckResult, ProbeFailure, ProbeResponse, Prober,
};
use url_vitals::config::CheckerConfig;

/// 立即返回200的探测器，只衡量调度开销
struct InstantProber;

#[async_trait]
impl Prober for InstantProber {
    async fn probe(&self, _url: &str) -> Result<ProbeResponse, ProbeFailure> {
        Ok(ProbeResponse::new(200))
    }
}

fn sample_urls(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 3 {
            0 => format!("site{i}.example.com"),
            1 => format!("https://site{i}.example.com/path?q={i}"),
            _ => format!("localhost:{}", 8000 + i % 1000),
        })
        .collect()
}

fn normalize_benchmark(c: &mut Criterion) {
    let urls = sample_urls(1_000);

    c.bench_function("normalize_1000", |b| {
        b.iter(|| {
            for url in &urls {
                black_box(normalize(black_box(url)));
            }
        });
    });
}

fn summary_benchmark(c: &mut Criterion) {
    let results: Vec<CheckResult> = (0..1_000u16)
        .map(|i| {
            let code = [200, 301, 403, 404, 429, 500][usize::from(i % 6)];
            CheckResult::from_response(
                format!("site{i}"),
                format!("http://site{i}"),
                code,
                Duration::from_micros(u64::from(i) * 37),
            )
        })
        .collect();

    c.bench_function("batch_summary_1000", |b| {
        b.iter(|| black_box(BatchSummary::from_results(black_box(&results))));
    });

    c.bench_function("results_serialization_1000", |b| {
        b.iter(|| black_box(serde_json::to_string(&results).unwrap()));
    });
}

fn batch_scheduling_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("batch_scheduling");

    for concurrency in [1usize, 20, 100] {
        let config = CheckerConfig {
            concurrency,
            ..Default::default()
        };
        let checker = BatchChecker::with_prober(&config, Arc::new(InstantProber)).unwrap();
        let urls = sample_urls(500);

        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, _| {
                b.iter(|| runtime.block_on(checker.check_all(black_box(urls.clone()))));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    normalize_benchmark,
    summary_benchmark,
    batch_scheduling_benchmark
);
criterion_main!(benches);
