//! Transaction lifecycle benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use snaptx_core::{Config, TransactionManager};
use snaptx_snapshot::{DirectorySnapshotProvider, InMemorySnapshotProvider};
use std::sync::Arc;
use tempfile::TempDir;

fn memory_manager(temp_dir: &TempDir) -> TransactionManager {
    let config = Config::new()
        .working_root(temp_dir.path().join("work"))
        .destroy_snapshot_on_commit(true);
    TransactionManager::new(Arc::new(InMemorySnapshotProvider::default()), config)
}

/// Benchmark begin + rollback with no touched files.
fn bench_begin_rollback(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let manager = memory_manager(&temp_dir);

    c.bench_function("begin_rollback", |b| {
        b.iter(|| {
            let mut tx = manager.begin().unwrap();
            black_box(tx.rollback().unwrap());
        });
    });
}

/// Benchmark begin + write + commit over a growing number of files.
fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");

    for files in [1usize, 10, 50].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(files), files, |b, &files| {
            let temp_dir = TempDir::new().unwrap();
            let manager = memory_manager(&temp_dir);
            let paths: Vec<_> = (0..files)
                .map(|i| temp_dir.path().join(format!("file_{i}.txt")))
                .collect();
            for path in &paths {
                std::fs::write(path, "initial").unwrap();
            }

            b.iter(|| {
                let mut tx = manager.begin().unwrap();
                for path in &paths {
                    tx.write(path, b"updated").unwrap();
                }
                black_box(tx.commit().unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark a conflicting commit rolled back through the directory provider.
fn bench_directory_conflict(c: &mut Criterion) {
    let mut group = c.benchmark_group("directory_conflict");
    group.sample_size(20);

    group.bench_function("two_writers", |b| {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("live");
        let provider =
            DirectorySnapshotProvider::open(&live, &temp_dir.path().join("snapshots")).unwrap();
        let config = Config::new()
            .working_root(temp_dir.path().join("work"))
            .destroy_snapshot_on_commit(true);
        let manager = TransactionManager::new(Arc::new(provider), config);
        let path = live.join("shared.txt");
        std::fs::write(&path, "v0").unwrap();

        b.iter(|| {
            let mut tx_a = manager.begin().unwrap();
            let mut tx_b = manager.begin().unwrap();
            tx_a.write(&path, "A").unwrap();
            tx_b.write(&path, "B").unwrap();
            tx_a.commit().unwrap();
            black_box(tx_b.commit().unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_begin_rollback, bench_commit, bench_directory_conflict);

criterion_main!(benches);
