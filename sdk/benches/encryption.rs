#![allow(
    clippy::unwrap_used,
    clippy::default_numeric_fallback,
    reason = "benchmark"
)]

use {
    criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main},
    sealstream_sdk::crypto::Codec,
};

fn criterion_benchmark(c: &mut Criterion) {
    let codec = Codec::new(&[1; 32], &[2; 32]).unwrap();

    let mut group = c.benchmark_group("seal");
    for size in [1024, 1024 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || (0..size).map(|_| rand::random::<u8>()).collect::<Vec<u8>>(),
                |input| codec.seal_bytes(&input).unwrap(),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();

    let mut group = c.benchmark_group("open");
    for size in [1024, 1024 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let input: Vec<u8> = (0..size).map(|_| rand::random::<u8>()).collect();
                    codec.seal_bytes(&input).unwrap()
                },
                |envelope| codec.open_bytes(&envelope).unwrap(),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
