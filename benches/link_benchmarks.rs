// ABOUTME: Benchmarks for the frame codec's encode/decode throughput at a few payload sizes

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relaylink::{frame, Message};

fn sample_data_message(payload_len: usize) -> Message {
    Message::data(1, Bytes::from(vec![0x42u8; payload_len]))
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");
    for size in [16usize, 256, 4096] {
        let msg = sample_data_message(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &msg, |b, msg| {
            b.iter(|| black_box(frame::encode(msg)));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");
    for size in [16usize, 256, 4096] {
        let msg = sample_data_message(size);
        let framed = frame::encode(&msg);
        let body = framed[..framed.len() - 1].to_vec();
        group.bench_with_input(BenchmarkId::from_parameter(size), &body, |b, body| {
            b.iter(|| black_box(frame::decode(body).unwrap()));
        });
    }
    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_extract_from_stream");
    for size in [16usize, 256, 4096] {
        let msg = sample_data_message(size);
        let framed = frame::encode(&msg);
        group.bench_with_input(BenchmarkId::from_parameter(size), &framed, |b, framed| {
            b.iter(|| black_box(frame::extract(framed).unwrap().unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_extract);
criterion_main!(benches);
