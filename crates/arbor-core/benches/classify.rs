use arbor_core::{clamp_markers, classify, StatusIndex, VcsStatus};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write as _;
use std::path::PathBuf;

/// A diff with `hunks` hunks cycling through modify, add and delete shapes
fn synthetic_diff(hunks: usize) -> String {
    let mut out = String::from("diff --git a/big.rs b/big.rs\n--- a/big.rs\n+++ b/big.rs\n");
    for i in 0..hunks {
        let line = i * 10 + 1;
        match i % 3 {
            0 => {
                let _ = writeln!(out, "@@ -{line},2 +{line},3 @@\n-old a\n-old b\n+new a\n+new b\n+new c");
            }
            1 => {
                let _ = writeln!(out, "@@ -{line},0 +{line},2 @@\n+added a\n+added b");
            }
            _ => {
                let _ = writeln!(out, "@@ -{line},3 +{},0 @@\n-gone a\n-gone b\n-gone c", line - 1);
            }
        }
    }
    out
}

fn bench_classify(c: &mut Criterion) {
    let small = synthetic_diff(10);
    let large = synthetic_diff(5_000);

    c.bench_function("classify_10_hunks", |b| b.iter(|| classify(black_box(&small))));
    c.bench_function("classify_5000_hunks", |b| b.iter(|| classify(black_box(&large))));

    let markers = classify(&large);
    c.bench_function("clamp_5000_hunks", |b| {
        b.iter(|| clamp_markers(black_box(&markers), black_box(20_000)))
    });
}

fn bench_propagate(c: &mut Criterion) {
    let mut index = StatusIndex::new();
    for dir in 0..100 {
        for file in 0..100 {
            let status = if file % 7 == 0 {
                VcsStatus::Modified
            } else {
                VcsStatus::Untracked
            };
            index.insert(PathBuf::from(format!("/repo/d{dir}/f{file}.rs")), status);
        }
    }
    let clean = PathBuf::from("/repo/elsewhere");
    let dirty = PathBuf::from("/repo/d42");

    c.bench_function("propagate_clean_dir", |b| {
        b.iter(|| index.propagate(black_box(&clean)))
    });
    c.bench_function("propagate_dirty_dir", |b| {
        b.iter(|| index.propagate(black_box(&dirty)))
    });
}

criterion_group!(benches, bench_classify, bench_propagate);
criterion_main!(benches);
