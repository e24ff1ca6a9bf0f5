//! Value codec and chunking benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stashdb_bench::record_value;
use stashdb_codec::{chunk, decode_value, encode_value, Codec, KeyCodec};

/// Benchmark encoding values with each built-in codec.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in [256, 4096, 65536].iter() {
        let value = record_value(*size);
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("identity", size), &value, |b, value| {
            b.iter(|| black_box(encode_value(black_box(value), &Codec::Identity).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("compress", size), &value, |b, value| {
            b.iter(|| black_box(encode_value(black_box(value), &Codec::Compress).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark decoding values with each built-in codec.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in [256, 4096, 65536].iter() {
        let value = record_value(*size);
        group.throughput(Throughput::Bytes(*size as u64));

        for (name, codec) in [("identity", Codec::Identity), ("compress", Codec::Compress)] {
            let payload = encode_value(&value, &codec).unwrap();
            group.bench_with_input(BenchmarkId::new(name, size), &payload, |b, payload| {
                b.iter(|| black_box(decode_value(black_box(payload), &codec).unwrap()));
            });
        }
    }
    group.finish();
}

/// Benchmark splitting payloads into chunks and putting them back together.
fn bench_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunking");
    let fingerprint = KeyCodec::fingerprint("player_0");
    let payload = encode_value(&record_value(65536), &Codec::Identity).unwrap();
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for max_len in [256, 4096, 60000].iter() {
        group.bench_with_input(BenchmarkId::new("split", max_len), max_len, |b, &max_len| {
            b.iter(|| black_box(chunk::split(&fingerprint, black_box(&payload), max_len)));
        });

        let chunks = chunk::split(&fingerprint, &payload, *max_len);
        group.bench_with_input(BenchmarkId::new("reassemble", max_len), &chunks, |b, chunks| {
            b.iter(|| black_box(chunk::reassemble(chunks.clone()).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark key fingerprinting.
fn bench_fingerprint(c: &mut Criterion) {
    c.bench_function("fingerprint", |b| {
        b.iter(|| black_box(KeyCodec::fingerprint(black_box("player_12345"))));
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_chunking,
    bench_fingerprint
);
criterion_main!(benches);
