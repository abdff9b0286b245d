// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Performance Benchmarks for Contact Encoding and Request Authentication
//!
//! Run with: cargo bench -p covalert-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use covalert_core::contact::RECORD_SIZE;
use covalert_core::{ContactBatch, ContactCodec, ContactRecord};

fn batch(n: usize) -> ContactBatch {
    (0..n)
        .map(|i| {
            ContactRecord::new(
                3_800_000_000 + i as u64,
                (i % 1024) as u16,
                format!("{:016x}", i),
                -70,
                -64,
            )
            .unwrap()
        })
        .collect()
}

// =============================================================================
// CONTACT CODEC BENCHMARKS
// =============================================================================

fn bench_contact_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("contact_codec");

    // A day of contacts in a busy place is a few thousand records
    for n in [1usize, 100, 5_000] {
        let batch = batch(n);
        let encoded = ContactCodec::encode(&batch);
        group.throughput(Throughput::Bytes((n * RECORD_SIZE) as u64));

        group.bench_with_input(BenchmarkId::new("encode", n), &batch, |b, batch| {
            b.iter(|| ContactCodec::encode(black_box(batch)))
        });
        group.bench_with_input(BenchmarkId::new("decode", n), &encoded, |b, bytes| {
            b.iter(|| ContactCodec::decode(black_box(bytes)))
        });
    }

    group.finish();
}

// =============================================================================
// REQUEST MAC BENCHMARKS
// =============================================================================

fn bench_request_mac(c: &mut Criterion) {
    use covalert_core::crypto::{MacKey, MacPrefix};

    let key = MacKey::from_bytes([7u8; 32]);
    let mut group = c.benchmark_group("request_mac");

    for n in [100usize, 5_000] {
        let payload = ContactCodec::encode(&batch(n));
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::new("sign_status", n), &payload, |b, payload| {
            b.iter(|| {
                key.sign(
                    MacPrefix::Status,
                    black_box("device-1"),
                    1_700_000_000,
                    black_box(payload),
                )
            })
        });
    }

    group.finish();
}

// =============================================================================
// STORAGE BENCHMARKS
// =============================================================================

fn bench_pending_storage(c: &mut Criterion) {
    use covalert_core::{Storage, SymmetricKey};

    let records = batch(500).records().to_vec();
    let mut group = c.benchmark_group("pending_storage");
    group.sample_size(20);

    group.bench_function("append_and_load_500", |b| {
        b.iter(|| {
            let storage = Storage::in_memory(SymmetricKey::generate()).unwrap();
            storage
                .append_pending_contacts(black_box(&records), 1_700_000_000)
                .unwrap();
            storage.load_pending_batch().unwrap()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_contact_codec,
    bench_request_mac,
    bench_pending_storage
);
criterion_main!(benches);
