//! Stress tests for the transaction log and kernel health.
//!
//! These tests verify behavior under heavy load and concurrent access.

use graphlog_core::{
    recover, Command, ErrorState, KernelEventHandler, KernelHealth, LogConfig, NodeRecord,
    PanicCause, TransactionLog,
};
use graphlog_storage::InMemoryLogChannel;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Transactions written per thread.
    pub transactions: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Commands in each transaction.
    pub commands_per_transaction: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            transactions: 200,
            threads: 4,
            commands_per_transaction: 5,
        }
    }
}

/// Node id encoding writer thread, transaction and position, so that the
/// origin of every replayed command can be checked.
fn tagged_node_id(thread: usize, transaction: usize, index: usize) -> i64 {
    ((thread as i64) << 40) | ((transaction as i64) << 16) | index as i64
}

fn tagged_transaction(thread: usize, transaction: usize, len: usize) -> Vec<Command> {
    (0..len)
        .map(|index| {
            let id = tagged_node_id(thread, transaction, index);
            Command::Node {
                before: NodeRecord::new(id),
                after: NodeRecord::in_use(id, false, id + 1, id + 2),
            }
        })
        .collect()
}

/// Writes transactions from several threads through one log, then replays
/// the log and checks that no two transactions interleave.
///
/// Returns the run result and the number of replayed commands.
pub fn stress_concurrent_transactions(config: &StressConfig) -> (StressTestResult, usize) {
    let log = Arc::new(TransactionLog::new(
        InMemoryLogChannel::new(),
        Arc::new(KernelHealth::new()),
        LogConfig::default(),
    ));
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let log = Arc::clone(&log);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let config = config.clone();

            thread::spawn(move || {
                for tx in 0..config.transactions {
                    let commands = tagged_transaction(t, tx, config.commands_per_transaction);
                    match log.write_transaction(&commands) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    let result = StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    );

    let bytes = log.with_channel(|channel| channel.to_bytes());
    let mut channel = InMemoryLogChannel::with_data(&bytes);
    let mut replayed = Vec::new();
    recover(&mut channel, |_, command| {
        replayed.push(command);
        Ok(())
    })
    .expect("Failed to recover");

    for (n, chunk) in replayed
        .chunks(config.commands_per_transaction)
        .enumerate()
    {
        let first = chunk[0].key();
        let expected_prefix = first >> 16;
        for (index, command) in chunk.iter().enumerate() {
            assert_eq!(
                command.key(),
                (expected_prefix << 16) | index as i64,
                "transaction {n} interleaved with another"
            );
        }
    }

    (result, replayed.len())
}

/// Panics one kernel from `threads` threads at once.
///
/// Returns how many calls reported making the transition and how many
/// times handlers were notified.
pub fn stress_concurrent_panics(threads: usize) -> (usize, usize) {
    struct Counter(AtomicUsize);

    impl KernelEventHandler for Counter {
        fn kernel_panic(&self, _error: ErrorState, _cause: &PanicCause) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let health = Arc::new(KernelHealth::new());
    let counter = Arc::new(Counter(AtomicUsize::new(0)));
    health
        .handlers()
        .register(counter.clone())
        .expect("Failed to register handler");

    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let health = Arc::clone(&health);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let won = health.panic(PanicCause::new(ErrorState::Unknown, format!("thread {t}")));
                // Every thread sees the panic once its own call returns.
                assert!(health.assert_healthy().is_err());
                won
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .filter(|won| *won)
        .count();
    (winners, counter.0.load(Ordering::SeqCst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlog_core::{CoreError, ExecutionOrder};
    use parking_lot::Mutex;

    #[test]
    fn test_concurrent_transactions_do_not_interleave() {
        let config = StressConfig {
            transactions: 50,
            threads: 4,
            commands_per_transaction: 4,
        };
        let (result, replayed) = stress_concurrent_transactions(&config);
        result.print_summary("Concurrent transactions");
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 200);
        assert_eq!(replayed, 800);
    }

    #[test]
    fn test_exactly_one_panic_wins() {
        for _ in 0..20 {
            let (winners, notified) = stress_concurrent_panics(8);
            assert_eq!(winners, 1);
            assert_eq!(notified, 1);
        }
    }

    #[test]
    fn test_first_cause_visible_to_all_threads() {
        let health = Arc::new(KernelHealth::new());
        assert!(health.panic(PanicCause::new(ErrorState::StorageMediaFull, "no space left")));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let health = Arc::clone(&health);
                thread::spawn(move || match health.assert_healthy() {
                    Err(CoreError::KernelPanicked { cause }) => cause.message().to_string(),
                    other => panic!("expected kernel panic, got {other:?}"),
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "no space left");
        }
    }

    #[test]
    fn test_writers_stop_after_panic() {
        let log = Arc::new(TransactionLog::new(
            InMemoryLogChannel::new(),
            Arc::new(KernelHealth::new()),
            LogConfig::default(),
        ));
        log.write_transaction(&tagged_transaction(0, 0, 2)).unwrap();
        let before = log.write_position();

        log.health()
            .panic(PanicCause::new(ErrorState::Unknown, "injected"));

        let handles: Vec<_> = (1..4)
            .map(|t| {
                let log = Arc::clone(&log);
                thread::spawn(move || log.write_transaction(&tagged_transaction(t, 0, 2)))
            })
            .collect();
        for handle in handles {
            let err = handle.join().unwrap().unwrap_err();
            assert!(matches!(err, CoreError::KernelPanicked { .. }));
        }
        assert_eq!(log.write_position(), before);
    }

    struct Named {
        name: &'static str,
        runs_after: Option<&'static str>,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    impl KernelEventHandler for Named {
        fn kernel_panic(&self, _error: ErrorState, _cause: &PanicCause) {
            self.seen.lock().push(self.name);
        }

        fn resource(&self) -> Option<&str> {
            Some(self.name)
        }

        fn order_compared_to(&self, other: &dyn KernelEventHandler) -> ExecutionOrder {
            match (self.runs_after, other.resource()) {
                (Some(target), Some(name)) if target == name => ExecutionOrder::After,
                _ => ExecutionOrder::DoesNotMatter,
            }
        }
    }

    #[test]
    fn test_handler_order_under_concurrent_registration() {
        let health = Arc::new(KernelHealth::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let names = ["index", "cache", "locks", "store"];

        let handles: Vec<_> = names
            .iter()
            .map(|&name| {
                let health = Arc::clone(&health);
                let seen = Arc::clone(&seen);
                thread::spawn(move || {
                    let runs_after = (name == "index").then_some("store");
                    health
                        .handlers()
                        .register(Arc::new(Named {
                            name,
                            runs_after,
                            seen,
                        }))
                        .unwrap();
                    // Readers racing with registration must always see a
                    // consistent snapshot.
                    let ordered = health.handlers().ordered();
                    assert!(!ordered.is_empty());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(health.handlers().len(), names.len());

        health.panic(PanicCause::new(ErrorState::Unknown, "order check"));
        let seen = seen.lock().clone();
        assert_eq!(seen.len(), names.len());

        let position = |name| seen.iter().position(|n| *n == name).unwrap();
        assert!(position("store") < position("index"));
    }
}
