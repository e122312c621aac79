use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use stock_dashboard::generator;
use stock_dashboard::pipeline::{self, FilterConfig, PageConfig, RangeBound, SortConfig};

fn bench_pipeline(c: &mut Criterion) {
    let universe_size: usize = 5_000;
    let universe = generator::generate_universe(42, universe_size);

    let filters = FilterConfig {
        score: RangeBound::min(50.0),
        ..FilterConfig::default()
    };
    let sort = SortConfig::default();
    let page = PageConfig { size: 50, index: 1 };

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(universe_size as u64));

    group.bench_function("filter_sort_paginate", |b| {
        b.iter(|| {
            let output = pipeline::run(
                black_box(&universe),
                black_box(&filters),
                black_box(&sort),
                black_box(&page),
            )
            .expect("pipeline run");
            assert_eq!(output.visible.len(), page.size);
            output
        });
    });

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
