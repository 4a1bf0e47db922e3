//! Criterion benchmarks for the render-path hot paths.
//!
//! Benchmarks:
//! 1. Classification of a full synthetic snapshot
//! 2. Flattening (filter, group, sort, chunk) at growing asset counts
//! 3. Offset table build and window queries over the flattened rows

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use pricewall_core::data::{SnapshotProvider, SyntheticProvider};
use pricewall_core::domain::{AssetRecord, ClassifiedAsset, ScopeKey};
use pricewall_core::{flatten, Catalog, Classifier, Filters, OffsetTable, SizeModel};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_records(total: usize) -> Vec<Arc<AssetRecord>> {
    let catalog = Catalog::default_catalog();
    let sources = catalog.navigation_order();
    let per_source = total / sources.len().max(1);
    let provider = SyntheticProvider::new(sources, per_source, 1);
    provider
        .fetch_snapshot(&ScopeKey::default())
        .map(|s| s.prices.into_iter().map(Arc::new).collect())
        .unwrap_or_default()
}

fn make_classified(total: usize) -> Vec<ClassifiedAsset> {
    let catalog = Catalog::default_catalog();
    let classifier = Classifier::new(&catalog).unwrap();
    classifier.classify_all(&make_records(total))
}

// ── 1. Classification ────────────────────────────────────────────────

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let catalog = Catalog::default_catalog();
    let classifier = Classifier::new(&catalog).unwrap();
    let records = make_records(50_000);

    group.bench_function("classify_all_50k", |b| {
        b.iter(|| classifier.classify_all(black_box(&records)));
    });
    group.finish();
}

// ── 2. Flattening ────────────────────────────────────────────────────

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");
    let catalog = Catalog::default_catalog();

    for &count in &[5_000, 20_000, 50_000] {
        let assets = make_classified(count);
        group.bench_with_input(BenchmarkId::new("unfiltered", count), &count, |b, _| {
            b.iter(|| flatten(black_box(&assets), &Filters::default(), 6, &catalog));
        });
    }

    let assets = make_classified(50_000);
    let filters = Filters::default().search("a");
    group.bench_function("search_50k", |b| {
        b.iter(|| flatten(black_box(&assets), black_box(&filters), 6, &catalog));
    });

    group.finish();
}

// ── 3. Virtualizer ───────────────────────────────────────────────────

fn bench_virtualize(c: &mut Criterion) {
    let mut group = c.benchmark_group("virtualize");
    let catalog = Catalog::default_catalog();
    let assets = make_classified(50_000);
    let rows = flatten(&assets, &Filters::default(), 4, &catalog).rows;
    let sizes = SizeModel::new(48, 28, 132);

    group.bench_function("offset_table_build", |b| {
        b.iter(|| OffsetTable::for_rows(black_box(&rows), &sizes));
    });

    let table = OffsetTable::for_rows(&rows, &sizes);
    let extent = table.total_extent();
    group.bench_function("window_sweep_1000", |b| {
        b.iter(|| {
            let step = (extent / 1000).max(1);
            for i in 0..1000u64 {
                black_box(table.window(i * step, 900, 4));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_classify, bench_flatten, bench_virtualize);
criterion_main!(benches);
