use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use labtrack_api::inventory::{
    aggregate, apply, convert, decode_entries, encode_entries, reverse, Aliquot, StorageEntry,
    TransactionKind, Unit,
};

const SIZES: [f64; 4] = [0.5, 1.0, 5.0, 40.0];
const UNITS: [Unit; 4] = [
    Unit::Milliliters,
    Unit::Liters,
    Unit::Microliters,
    Unit::Milligrams,
];

fn layout(entries: usize, aliquots: usize) -> Vec<StorageEntry> {
    (0..entries)
        .map(|e| {
            let aliquots = (0..aliquots)
                .map(|a| {
                    Aliquot::new(
                        (e + a + 1) as f64,
                        SIZES[a % SIZES.len()],
                        UNITS[a % UNITS.len()],
                    )
                })
                .collect();
            StorageEntry::new(format!("F{}", e), aliquots)
        })
        .collect()
}

// Benchmark for quantity aggregation across layout sizes
fn aggregation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for size in [1usize, 8, 32, 128].iter() {
        let entries = layout(*size, 4);
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| aggregate(black_box(entries), Unit::Milliliters));
        });
    }

    group.finish();
}

// Benchmark for a single unit conversion
fn conversion_benchmark(c: &mut Criterion) {
    c.bench_function("unit_conversion", |b| {
        b.iter(|| convert(black_box(12.5), Unit::Liters, Unit::Microliters))
    });
}

// Benchmark for applying and reversing transaction deltas
fn reconcile_benchmark(c: &mut Criterion) {
    let entries = layout(32, 4);
    let delta = layout(4, 2);

    c.bench_function("apply_consumption", |b| {
        b.iter(|| {
            apply(
                black_box(&entries),
                black_box(&delta),
                TransactionKind::Consumption,
                0.0,
                Unit::Milliliters,
            )
        })
    });

    c.bench_function("apply_addition", |b| {
        b.iter(|| {
            apply(
                black_box(&entries),
                black_box(&delta),
                TransactionKind::Addition,
                0.0,
                Unit::Milliliters,
            )
        })
    });

    c.bench_function("reverse_consumption", |b| {
        b.iter(|| {
            reverse(
                black_box(&entries),
                black_box(&delta),
                TransactionKind::Consumption,
                Unit::Milliliters,
            )
        })
    });
}

// Benchmark for the JSON storage layout codec
fn codec_benchmark(c: &mut Criterion) {
    let entries = layout(32, 4);
    let encoded = encode_entries(&entries);

    c.bench_function("encode_entries", |b| {
        b.iter(|| encode_entries(black_box(&entries)))
    });

    c.bench_function("decode_entries", |b| {
        b.iter(|| decode_entries(black_box(&encoded)))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets =
        aggregation_benchmark,
        conversion_benchmark,
        reconcile_benchmark,
        codec_benchmark
}

criterion_main!(benches);
