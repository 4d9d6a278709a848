use anyhow::Result;
use std::future::Future;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::generator::RequestGenerator;
use crate::sink::StatsSink;
use crate::stats::RunStats;
use crate::worker_set::WorkerSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop,
}

#[derive(Debug)]
pub struct SearchState {
    previous: Option<RunStats>,
    parallelism: usize,
}

impl SearchState {
    pub fn new(start_parallelism: usize) -> Self {
        SearchState {
            previous: None,
            parallelism: start_parallelism,
        }
    }

    /// Worker count for the next run.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Feeds the result of the run just executed at `parallelism()`.
    pub fn observe(&mut self, run: RunStats) -> Step {
        if let Some(prev) = &self.previous {
            if run.success_count < prev.success_count {
                return Step::Stop;
            }
        }
        self.previous = Some(run);
        match self.parallelism.checked_mul(2) {
            Some(next) => {
                self.parallelism = next;
                Step::Continue
            }
            None => Step::Stop,
        }
    }
}

/// Doubles the worker count until the successful count drops. A plain hill
/// climb, so a noisy target can end it early.
pub struct Driver<'a> {
    config: SearchConfig,
    sink: &'a dyn StatsSink,
}

impl<'a> Driver<'a> {
    pub fn new(config: SearchConfig, sink: &'a dyn StatsSink) -> Self {
        Driver { config, sink }
    }

    /// Searches with real worker sets against `generator`.
    pub async fn run(&self, generator: Arc<dyn RequestGenerator>) -> Result<Vec<RunStats>> {
        let duration = self.config.run_duration;
        let sink = self.sink;
        self.search(|parallelism| {
            let generator = generator.clone();
            async move {
                WorkerSet::new(parallelism, duration)
                    .run(generator, sink)
                    .await
            }
        })
        .await
    }

    /// Drives the search loop with `execute` performing one run at the given
    /// parallelism. Returns every run in order.
    pub async fn search<F, Fut>(&self, mut execute: F) -> Result<Vec<RunStats>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<RunStats>>,
    {
        self.config.validate()?;

        let mut state = SearchState::new(self.config.start_parallelism);
        let mut history = Vec::new();

        loop {
            let stats = execute(state.parallelism()).await?.into_totals();
            self.sink.summary(&stats);
            log_latency(&stats);
            history.push(stats.clone());

            if state.observe(stats) == Step::Stop {
                break;
            }
        }

        if let Some(best) = history.iter().max_by_key(|s| s.success_count) {
            tracing::info!(
                parallelism = best.parallelism,
                successful = best.success_count,
                runs = history.len(),
                "Throughput peaked"
            );
        }
        Ok(history)
    }
}

fn log_latency(stats: &RunStats) {
    if stats.latency.len() == 0 {
        return;
    }
    tracing::debug!(
        parallelism = stats.parallelism,
        "Latency p50 {:.2}ms, p99 {:.2}ms, max {:.2}ms",
        stats.latency.value_at_quantile(0.5) as f64 / 1000.0,
        stats.latency.value_at_quantile(0.99) as f64 / 1000.0,
        stats.latency.max() as f64 / 1000.0,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::WorkerStats;
    use std::sync::Mutex;
    use std::time::Duration;

    fn run_with(parallelism: usize, success: u64) -> RunStats {
        let mut worker = WorkerStats::new().unwrap();
        worker.total_count = success;
        worker.success_count = success;
        worker.elapsed = Duration::from_secs(1);
        RunStats::aggregate(parallelism, vec![worker]).unwrap()
    }

    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    impl StatsSink for RecordingSink {
        fn progress(&self, _message: &str) {}

        fn summary(&self, stats: &RunStats) {
            self.lines
                .lock()
                .unwrap()
                .push(crate::sink::format_summary(stats));
        }
    }

    #[test]
    fn first_run_never_stops() {
        let mut state = SearchState::new(1);
        assert_eq!(state.observe(run_with(1, 0)), Step::Continue);
        assert_eq!(state.parallelism(), 2);
    }

    #[test]
    fn parallelism_doubles() {
        let mut state = SearchState::new(8);
        for expected in [8, 16, 32, 64] {
            assert_eq!(state.parallelism(), expected);
            assert_eq!(state.observe(run_with(expected, 10)), Step::Continue);
        }
    }

    #[test]
    fn equal_throughput_keeps_going() {
        let mut state = SearchState::new(1);
        assert_eq!(state.observe(run_with(1, 50)), Step::Continue);
        assert_eq!(state.observe(run_with(2, 50)), Step::Continue);
        assert_eq!(state.parallelism(), 4);
    }

    #[test]
    fn overflowing_parallelism_stops() {
        let mut state = SearchState::new(usize::MAX / 2 + 1);
        assert_eq!(state.observe(run_with(1, 1)), Step::Stop);
    }

    #[tokio::test]
    async fn stops_after_first_regression() {
        let sink = RecordingSink::default();
        let config = SearchConfig {
            run_duration: Duration::from_millis(1),
            ..SearchConfig::default()
        };
        let driver = Driver::new(config, &sink);

        let mut scripted = vec![100u64, 180, 150, 500].into_iter();
        let mut seen = Vec::new();
        let history = driver
            .search(|parallelism| {
                seen.push(parallelism);
                let success = scripted.next().unwrap();
                async move { Ok::<_, anyhow::Error>(run_with(parallelism, success)) }
            })
            .await
            .unwrap();

        assert_eq!(seen, vec![1, 2, 4]);
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].success_count, 150);
        assert!(history.iter().all(|run| run.workers.is_empty()));
        assert_eq!(sink.lines.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn run_error_aborts_search() {
        let sink = RecordingSink::default();
        let driver = Driver::new(SearchConfig::default(), &sink);
        let result = driver
            .search(|_| async { Err::<RunStats, _>(anyhow::anyhow!("cannot start workers")) })
            .await;
        assert!(result.is_err());
        assert!(sink.lines.lock().unwrap().is_empty());
    }
}
