use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::generator::RequestGenerator;
use crate::sink::StatsSink;
use crate::stats::{RunStats, WorkerStats};
use crate::worker::{https_connector, Worker, WorkerReport};

/// A cohort of workers hammering the target for a fixed duration.
pub struct WorkerSet {
    parallelism: usize,
    duration: Duration,
}

impl WorkerSet {
    pub fn new(parallelism: usize, duration: Duration) -> Self {
        WorkerSet {
            parallelism,
            duration,
        }
    }

    /// Starts every worker, sleeps out the duration, stops them all and waits
    /// for each one to report back before aggregating.
    pub async fn run(
        &self,
        generator: Arc<dyn RequestGenerator>,
        sink: &dyn StatsSink,
    ) -> Result<RunStats> {
        if self.parallelism == 0 {
            bail!("a run needs at least one worker");
        }
        if self.duration.is_zero() {
            bail!("run duration must be greater than zero");
        }

        // Everything is built before the first spawn so all workers start
        // together and the sleep below is the only thing timing the run.
        let connector = https_connector();
        let workers = (0..self.parallelism)
            .map(|id| Worker::new(id, connector.clone()))
            .collect::<Result<Vec<_>>>()?;

        let (done_tx, mut done_rx) = mpsc::channel::<WorkerReport>(self.parallelism);
        let mut stops = Vec::with_capacity(self.parallelism);
        let mut running = 0usize;

        for worker in workers {
            // Capacity 1 so the stop send never waits on the worker.
            let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
            tokio::spawn(worker.run(stop_rx, done_tx.clone(), generator.clone()));
            stops.push(stop_tx);
            running += 1;
        }
        // Only workers hold senders now, so recv() yields None if one of them
        // dies without reporting.
        drop(done_tx);

        tracing::debug!(workers = running, duration = ?self.duration, "Run started");
        sink.progress(&format!("{} threads running...", self.parallelism));

        tokio::time::sleep(self.duration).await;

        for (i, stop) in stops.iter().enumerate() {
            sink.progress(&format!("Stopping {} threads...", self.parallelism - i));
            // A worker that already quit has dropped its receiver; nothing to do.
            let _ = stop.try_send(());
        }

        let mut reports: Vec<WorkerStats> = Vec::with_capacity(self.parallelism);
        while running > 0 {
            sink.progress(&format!("Waiting for {} threads to terminate...", running));
            match done_rx.recv().await {
                Some(report) => {
                    tracing::trace!(worker = report.id, "Worker stopped");
                    reports.push(report.stats);
                    running -= 1;
                }
                None => bail!("{} workers exited without reporting", running),
            }
        }

        RunStats::aggregate(self.parallelism, reports)
    }
}
