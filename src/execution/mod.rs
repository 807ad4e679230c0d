//! Parallel scans over independent partitions.
//!
//! A host scanning several tablets at once gives each one its own iterator stack. The
//! [`ParallelScanner`] does the same on a rayon pool: every partition gets a freshly built stack,
//! so every scripted iterator compiles its own function and is driven by exactly one thread.
//!
//! - Results keep partition order
//! - The first failing partition fails the scan
//! - Real-time metrics + observer hooks for monitoring

mod observer;

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;

use crate::config::{build_stack, IteratorSetting};
use crate::error::ScanResult;
use crate::iterator::{scan, SortedMapIterator};
use crate::script::ScriptEngine;
use crate::types::{Entry, Range};

pub use observer::{
    CompositeScanObserver, ScanEvent, ScanMetrics, ScanMetricsSnapshot, ScanObserver, StdErrScanObserver,
    TracingScanObserver,
};

/// Configuration for the [`ParallelScanner`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Number of worker threads.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self { num_threads: Some(n) }
    }
}

/// Runs one iterator stack per partition on a dedicated thread pool.
pub struct ParallelScanner {
    pool: ThreadPool,
    engine: ScriptEngine,
    observer: Option<Arc<dyn ScanObserver>>,
    metrics: Arc<ScanMetrics>,
}

impl ParallelScanner {
    /// Create a scanner whose stacks compile their scripts with `engine`.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads == Some(0)` or the thread pool cannot be built.
    pub fn new(opts: ScanOptions, engine: ScriptEngine) -> Self {
        if let Some(n) = opts.num_threads {
            assert!(n > 0, "num_threads must be > 0 when set");
        }

        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1);

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .expect("failed to build rayon thread pool");

        Self {
            pool,
            engine,
            observer: None,
            metrics: Arc::new(ScanMetrics::new()),
        }
    }

    /// Attach an observer for scan events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time scan metrics.
    pub fn metrics(&self) -> Arc<ScanMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Scan `range` of every partition through the stack described by `settings`.
    ///
    /// Returns one output list per partition, in input order.
    pub fn scan(
        &self,
        partitions: Vec<Vec<Entry>>,
        settings: &[IteratorSetting],
        range: &Range,
    ) -> ScanResult<Vec<Vec<Entry>>> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(ScanEvent::ScanStarted {
            partitions: partitions.len(),
        });

        let result = self.pool.install(|| {
            partitions
                .into_par_iter()
                .enumerate()
                .map(|(index, entries)| self.scan_partition(index, entries, settings, range))
                .collect::<ScanResult<Vec<_>>>()
        });

        self.metrics.end_run(start.elapsed());
        self.emit(ScanEvent::ScanFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });

        result
    }

    fn scan_partition(
        &self,
        index: usize,
        entries: Vec<Entry>,
        settings: &[IteratorSetting],
        range: &Range,
    ) -> ScanResult<Vec<Entry>> {
        self.metrics.on_partition_start(entries.len());
        self.emit(ScanEvent::PartitionStarted {
            index,
            entries: entries.len(),
        });

        let result = build_stack(Box::new(SortedMapIterator::new(entries)), settings, &self.engine)
            .and_then(|mut stack| scan(&mut stack, range));

        match &result {
            Ok(out) => {
                self.metrics.on_partition_end(out.len());
                self.emit(ScanEvent::PartitionFinished {
                    index,
                    emitted: out.len(),
                });
            }
            Err(err) => {
                self.metrics.on_partition_failed();
                self.emit(ScanEvent::PartitionFailed {
                    index,
                    error: err.to_string(),
                });
            }
        }
        result
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(o) = &self.observer {
            o.on_event(&event);
        }
    }
}
