//! Transaction log benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use graphlog_core::{
    open_log_file, recover, KernelHealth, LogConfig, LogHeader, TransactionLog,
};
use graphlog_storage::InMemoryLogChannel;
use graphlog_testkit::fixtures::{node_12_command, sample_commands, write_commands};
use std::sync::Arc;
use tempfile::TempDir;

/// Benchmark in-memory transaction writes.
fn bench_inmemory_transaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("inmemory_transaction");
    let commands = sample_commands();

    group.bench_function("all_kinds", |b| {
        let log = TransactionLog::new(
            InMemoryLogChannel::new(),
            Arc::new(KernelHealth::new()),
            LogConfig::default(),
        );
        b.iter(|| {
            log.with_channel(|channel| channel.reset());
            black_box(log.write_transaction(black_box(&commands)).unwrap());
        });
    });

    group.finish();
}

/// Benchmark file-backed transaction writes, with and without force.
fn bench_file_transaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_transaction");
    // Use smaller sample size for forced writes
    group.sample_size(20);

    for force in [false, true] {
        let id = if force { "forced" } else { "buffered" };
        group.bench_function(id, |b| {
            let dir = TempDir::new().unwrap();
            let config = LogConfig::new().force_on_write(force);
            let (channel, _) =
                open_log_file(&dir.path().join("graph.log.0"), LogHeader::new(0, 0), &config)
                    .unwrap();
            let log = TransactionLog::new(channel, Arc::new(KernelHealth::new()), config);
            let commands = vec![node_12_command(); 4];

            b.iter(|| {
                black_box(log.write_transaction(black_box(&commands)).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark recovery over logs of growing length.
fn bench_recovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("recovery");

    for count in [100usize, 1_000, 10_000] {
        let commands = vec![node_12_command(); count];
        let mut channel = write_commands(&commands);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                channel.rewind();
                let outcome = recover(&mut channel, |_, command| {
                    black_box(command);
                    Ok(())
                })
                .unwrap();
                black_box(outcome);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_inmemory_transaction,
    bench_file_transaction,
    bench_recovery,
);

criterion_main!(benches);
