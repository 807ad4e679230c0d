use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Events emitted by the [`super::ParallelScanner`].
#[derive(Debug, Clone)]
pub enum ScanEvent {
    ScanStarted { partitions: usize },
    PartitionStarted { index: usize, entries: usize },
    PartitionFinished { index: usize, emitted: usize },
    PartitionFailed { index: usize, error: String },
    ScanFinished {
        elapsed: Duration,
        metrics: ScanMetricsSnapshot,
    },
}

/// Observer hook for scan events.
pub trait ScanObserver: Send + Sync {
    fn on_event(&self, event: &ScanEvent);
}

/// A simple stderr logger for scan events.
#[derive(Default)]
pub struct StdErrScanObserver;

impl ScanObserver for StdErrScanObserver {
    fn on_event(&self, event: &ScanEvent) {
        eprintln!("{event:?}");
    }
}

/// Forwards scan events to `tracing`: failures at `warn`, scan boundaries at `info`, partition
/// progress at `debug`.
#[derive(Debug, Default)]
pub struct TracingScanObserver;

impl ScanObserver for TracingScanObserver {
    fn on_event(&self, event: &ScanEvent) {
        match event {
            ScanEvent::ScanStarted { partitions } => {
                tracing::info!(partitions, "scan started");
            }
            ScanEvent::PartitionStarted { index, entries } => {
                tracing::debug!(index, entries, "partition started");
            }
            ScanEvent::PartitionFinished { index, emitted } => {
                tracing::debug!(index, emitted, "partition finished");
            }
            ScanEvent::PartitionFailed { index, error } => {
                tracing::warn!(index, %error, "partition failed");
            }
            ScanEvent::ScanFinished { elapsed, metrics } => {
                tracing::info!(?elapsed, %metrics, "scan finished");
            }
        }
    }
}

/// Fans events out to a list of observers.
#[derive(Default)]
pub struct CompositeScanObserver {
    observers: Vec<Arc<dyn ScanObserver>>,
}

impl CompositeScanObserver {
    pub fn new(observers: Vec<Arc<dyn ScanObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeScanObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeScanObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ScanObserver for CompositeScanObserver {
    fn on_event(&self, event: &ScanEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Real-time counters for a scan.
///
/// The scanner updates these while partitions run; callers can snapshot them at any time.
pub struct ScanMetrics {
    run_id: AtomicU64,
    started_at: Mutex<Option<Instant>>,
    elapsed_ns: AtomicU64,

    partitions_started: AtomicU64,
    partitions_finished: AtomicU64,
    partitions_failed: AtomicU64,
    entries_read: AtomicU64,
    entries_emitted: AtomicU64,

    active_partitions: AtomicUsize,
    max_active_partitions: AtomicUsize,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            started_at: Mutex::new(None),
            elapsed_ns: AtomicU64::new(0),
            partitions_started: AtomicU64::new(0),
            partitions_finished: AtomicU64::new(0),
            partitions_failed: AtomicU64::new(0),
            entries_read: AtomicU64::new(0),
            entries_emitted: AtomicU64::new(0),
            active_partitions: AtomicUsize::new(0),
            max_active_partitions: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut started) = self.started_at.lock() {
            *started = Some(Instant::now());
        }

        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.partitions_started.store(0, Ordering::SeqCst);
        self.partitions_finished.store(0, Ordering::SeqCst);
        self.partitions_failed.store(0, Ordering::SeqCst);
        self.entries_read.store(0, Ordering::SeqCst);
        self.entries_emitted.store(0, Ordering::SeqCst);
        self.active_partitions.store(0, Ordering::SeqCst);
        self.max_active_partitions.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub fn on_partition_start(&self, entries: usize) {
        let _ = self.partitions_started.fetch_add(1, Ordering::SeqCst);
        let _ = self.entries_read.fetch_add(entries as u64, Ordering::SeqCst);
        let now = self.active_partitions.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_partitions, now);
    }

    pub fn on_partition_end(&self, emitted: usize) {
        let _ = self.partitions_finished.fetch_add(1, Ordering::SeqCst);
        let _ = self.entries_emitted.fetch_add(emitted as u64, Ordering::SeqCst);
        let _ = self.active_partitions.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_partition_failed(&self) {
        let _ = self.partitions_failed.fetch_add(1, Ordering::SeqCst);
        let _ = self.active_partitions.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ScanMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        ScanMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            partitions_started: self.partitions_started.load(Ordering::SeqCst),
            partitions_finished: self.partitions_finished.load(Ordering::SeqCst),
            partitions_failed: self.partitions_failed.load(Ordering::SeqCst),
            entries_read: self.entries_read.load(Ordering::SeqCst),
            entries_emitted: self.entries_emitted.load(Ordering::SeqCst),
            max_active_partitions: self.max_active_partitions.load(Ordering::SeqCst),
        }
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`ScanMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub partitions_started: u64,
    pub partitions_finished: u64,
    pub partitions_failed: u64,
    pub entries_read: u64,
    pub entries_emitted: u64,
    pub max_active_partitions: usize,
}

impl fmt::Display for ScanMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, partitions={}/{} (failed {}), entries={}->{}, max_active_partitions={}, elapsed={:?}",
            self.run_id,
            self.partitions_finished,
            self.partitions_started,
            self.partitions_failed,
            self.entries_read,
            self.entries_emitted,
            self.max_active_partitions,
            self.elapsed
        )
    }
}
