use anyhow::Result;
use hdrhistogram::Histogram;
use std::time::Duration;

/// Counters owned by a single worker.
///
/// Only the owning task mutates them. The coordinator gets them by value
/// through the done channel once the worker has stopped.
#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub total_count: u64,
    pub success_count: u64,
    pub fail_count: u64,
    /// Running mean over successful requests only, in microseconds.
    pub average_response_micros: u64,
    pub elapsed: Duration,
    pub latency: Histogram<u64>,
}

impl WorkerStats {
    pub fn new() -> Result<Self> {
        Ok(WorkerStats {
            total_count: 0,
            success_count: 0,
            fail_count: 0,
            average_response_micros: 0,
            elapsed: Duration::default(),
            latency: Histogram::<u64>::new(3)?,
        })
    }

    pub fn record_attempt(&mut self) {
        self.total_count += 1;
    }

    pub fn record_failure(&mut self) {
        self.fail_count += 1;
    }

    pub fn record_success(&mut self, latency: Duration) {
        let micros = latency.as_micros() as u64;
        let all_times = self.average_response_micros * self.success_count;
        self.average_response_micros = (all_times + micros) / (self.success_count + 1);
        self.success_count += 1;
        self.latency.record(micros).unwrap_or_default();
    }
}

/// Aggregate of one run, built after every worker has been drained.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub parallelism: usize,
    pub total_count: u64,
    pub success_count: u64,
    pub fail_count: u64,
    /// Sum of every worker's elapsed time, not wall-clock time.
    pub total_runtime: Duration,
    /// Mean of the per-worker means, each worker weighted equally.
    pub average_response: Duration,
    pub latency: Histogram<u64>,
    /// Per-worker counters the aggregate was built from.
    pub workers: Vec<WorkerStats>,
}

impl RunStats {
    pub fn aggregate(parallelism: usize, workers: Vec<WorkerStats>) -> Result<Self> {
        let mut stats = RunStats {
            parallelism,
            total_count: 0,
            success_count: 0,
            fail_count: 0,
            total_runtime: Duration::default(),
            average_response: Duration::default(),
            latency: Histogram::<u64>::new(3)?,
            workers: Vec::new(),
        };

        let mut avg_resp = 0u64;
        for worker in &workers {
            stats.total_count += worker.total_count;
            stats.success_count += worker.success_count;
            stats.fail_count += worker.fail_count;
            stats.total_runtime += worker.elapsed;
            avg_resp += worker.average_response_micros;
            stats.latency.add(&worker.latency)?;
        }
        if !workers.is_empty() {
            stats.average_response = Duration::from_micros(avg_resp / workers.len() as u64);
        }
        stats.workers = workers;
        Ok(stats)
    }

    /// Drops the per-worker counters once only the totals are needed.
    pub fn into_totals(mut self) -> Self {
        self.workers = Vec::new();
        self
    }

    /// Aggregate throughput of successful requests.
    ///
    /// `total_runtime` covers `parallelism` workers running side by side, so it
    /// is scaled back down to one worker's worth of time. Returns 0 when no time
    /// was recorded.
    pub fn successful_requests_per_second(&self) -> f64 {
        let runtime = self.total_runtime.as_secs_f64();
        if runtime <= 0.0 {
            return 0.0;
        }
        self.success_count as f64 / runtime * self.parallelism as f64
    }

    /// Share of failed attempts, 0 when nothing was attempted.
    pub fn failure_percentage(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.fail_count as f64 / self.total_count as f64 * 100.0
    }
}
