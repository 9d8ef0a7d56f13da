//! Criterion benchmarks for binlog reading.
//!
//! Benchmarks cover:
//! - Page checksum validation (CRC-32C)
//! - Streaming commit records through `BinlogReader`
//! - Streaming OOB forests through `BinlogReader` at several buffer sizes

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ibb::binlog::builder::LogBuilder;
use ibb::binlog::checksum::{validate_page_checksum, write_page_checksum};
use ibb::binlog::file::{BinlogSource, MemoryBinlogs};
use ibb::binlog::reader::BinlogReader;

const PAGE_SIZE: u32 = 16384;

fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// A log of many small commit records.
fn build_commit_log(groups: usize) -> (MemoryBinlogs, u64) {
    let mut b = LogBuilder::new(PAGE_SIZE, 1);
    let mut bytes = 0u64;
    for i in 0..groups {
        let body = payload(200 + (i % 7) * 50, i as u8);
        bytes += body.len() as u64;
        b.commit(&body, None, None);
    }
    (b.finish(), bytes)
}

/// A log of large event groups whose bodies live in OOB forests.
fn build_oob_log(groups: usize, nodes: usize) -> (MemoryBinlogs, u64) {
    let mut b = LogBuilder::new(PAGE_SIZE, 1);
    let mut bytes = 0u64;
    for g in 0..groups {
        let data: Vec<Vec<u8>> = (0..nodes).map(|n| payload(3000, (g + n) as u8)).collect();
        let slices: Vec<&[u8]> = data.iter().map(|d| d.as_slice()).collect();
        let forest = b.oob_forest(&slices);
        b.commit(b"commit", forest, None);
        bytes += (nodes * 3000 + 6) as u64;
    }
    (b.finish(), bytes)
}

fn drain(files: &MemoryBinlogs, buf: &mut [u8]) -> u64 {
    let file = files.open_file(1).unwrap();
    let mut rd = BinlogReader::open(Box::new(files.clone()), file, 0).unwrap();
    let mut total = 0u64;
    loop {
        let n = rd.read(buf).unwrap();
        if n == 0 {
            return total;
        }
        total += n as u64;
    }
}

fn bench_checksum(c: &mut Criterion) {
    let mut page = payload(PAGE_SIZE as usize, 3);
    write_page_checksum(&mut page);

    let mut group = c.benchmark_group("checksum");
    group.throughput(Throughput::Bytes(PAGE_SIZE as u64));
    group.bench_function("validate_page", |b| {
        b.iter(|| validate_page_checksum(black_box(&page)))
    });
    group.finish();
}

fn bench_commit_stream(c: &mut Criterion) {
    let (files, bytes) = build_commit_log(2000);
    let mut buf = vec![0u8; 16384];

    let mut group = c.benchmark_group("commit_stream");
    group.throughput(Throughput::Bytes(bytes));
    group.bench_function("read_all", |b| {
        b.iter(|| {
            let n = drain(black_box(&files), &mut buf);
            assert_eq!(n, bytes);
        })
    });
    group.finish();
}

fn bench_oob_stream(c: &mut Criterion) {
    let (files, bytes) = build_oob_log(20, 13);

    let mut group = c.benchmark_group("oob_stream");
    group.throughput(Throughput::Bytes(bytes));
    for buf_len in [512usize, 4096, 65536] {
        let mut buf = vec![0u8; buf_len];
        group.bench_with_input(BenchmarkId::from_parameter(buf_len), &files, |b, files| {
            b.iter(|| {
                let n = drain(files, &mut buf);
                assert_eq!(n, bytes);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_checksum, bench_commit_stream, bench_oob_stream);
criterion_main!(benches);
