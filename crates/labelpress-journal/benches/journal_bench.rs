// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for fingerprinting, ledger lookups, and event log
// retention in the labelpress-journal crate.

use chrono::{Local, TimeDelta};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use labelpress_journal::{Ledger, event_log::retain_recent, hash_bytes};

/// SHA-256 fingerprinting at label-sized and page-sized payloads.
fn bench_fingerprint(c: &mut Criterion) {
    let sizes: &[(&str, usize)] = &[
        ("10 KiB", 10 * 1024),
        ("100 KiB", 100 * 1024),
        ("1 MiB", 1024 * 1024),
    ];

    let mut group = c.benchmark_group("fingerprint_sha256");
    for &(label, size) in sizes {
        let data = vec![0xABu8; size];
        group.bench_function(label, |b| {
            b.iter(|| black_box(hash_bytes(black_box(&data))));
        });
    }
    group.finish();
}

/// Membership checks against a ledger holding a year of daily labels.
fn bench_ledger_contains(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let ledger = Ledger::load(dir.path().join("processed_files.txt")).expect("load failed");
    for i in 0..10_000 {
        ledger.record(&format!("LBL{i:05}.pdf")).expect("record failed");
    }

    c.bench_function("ledger_contains (10k entries)", |b| {
        b.iter(|| {
            black_box(ledger.contains(black_box("LBL04999.pdf")));
            black_box(ledger.contains(black_box("MISSING.pdf")));
        });
    });
}

/// Retention filtering over a log where half the lines have expired.
fn bench_retain_recent(c: &mut Criterion) {
    let now = Local::now().naive_local();
    let lines: Vec<String> = (0..2_000)
        .map(|i| {
            let at = now - TimeDelta::minutes(i64::from(i) / 4);
            format!("[{}] Saved: LBL{i:05}.pdf", at.format("%Y-%m-%d %H:%M:%S"))
        })
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let cutoff = now - TimeDelta::hours(2);

    c.bench_function("retain_recent (2k lines)", |b| {
        b.iter(|| black_box(retain_recent(black_box(&refs), cutoff)));
    });
}

criterion_group!(
    benches,
    bench_fingerprint,
    bench_ledger_contains,
    bench_retain_recent
);
criterion_main!(benches);
