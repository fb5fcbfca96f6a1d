//! Performance benchmarks for the packet codec: CRC-16/X.25, additive
//! checksum, and full frame encode/decode at varying payload sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use osdp_rs::codec::crc::{checksum, crc16};
use osdp_rs::codec::frame::{decode, encode, ControlByte};

fn generate_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn bench_crc16(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc16");
    for size in &[16usize, 64, 256, 1024] {
        let data = generate_payload(*size);
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| crc16(black_box(data)))
        });
    }
    group.finish();
}

fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum");
    for size in &[16usize, 64, 256, 1024] {
        let data = generate_payload(*size);
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| checksum(black_box(data)))
        });
    }
    group.finish();
}

fn bench_encode_decode_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_round_trip");
    let control = ControlByte {
        sequence: 1,
        use_crc: true,
        has_scb: false,
    };

    for size in &[0usize, 16, 64, 256] {
        let body = generate_payload(*size);
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &body, |b, body| {
            b.iter(|| {
                let packet = encode(black_box(0x7F), false, control, None, 0x60, body, None);
                decode(black_box(&packet), false).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_crc16, bench_checksum, bench_encode_decode_round_trip);
criterion_main!(benches);
