use anyhow::Result;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::generator::{LoadRequest, RequestGenerator};
use crate::stats::WorkerStats;

pub type Connector = HttpsConnector<HttpConnector>;
type Client = HyperClient<Connector, Empty<Bytes>>;

/// Final counters of a stopped worker, sent once on the done channel.
#[derive(Debug)]
pub struct WorkerReport {
    pub id: usize,
    pub stats: WorkerStats,
}

enum Outcome {
    Success(Duration),
    Status(hyper::StatusCode),
    Transport(String),
}

pub struct Worker {
    id: usize,
    client: Client,
    stats: WorkerStats,
}

/// Built once per run. Clones share the TLS setup; pools stay per client.
pub fn https_connector() -> Connector {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    HttpsConnector::new_with_connector(http)
}

impl Worker {
    /// Every worker gets its own client, and with it its own connection pool.
    pub fn new(id: usize, connector: Connector) -> Result<Self> {
        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .build(connector);
        Ok(Worker {
            id,
            client,
            stats: WorkerStats::new()?,
        })
    }

    /// Issues requests back to back until a stop signal is observed.
    ///
    /// The stop channel is only polled between requests, an in-flight request
    /// always runs to completion. A request that cannot be constructed ends the
    /// worker early. Either way the counters are sent on `done` exactly once.
    pub async fn run(
        mut self,
        mut stop: mpsc::Receiver<()>,
        done: mpsc::Sender<WorkerReport>,
        generator: Arc<dyn RequestGenerator>,
    ) {
        let start_time = Instant::now();

        loop {
            match stop.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            let req = generator.generate();
            self.stats.record_attempt();

            let req = match req {
                Ok(req) => req,
                Err(e) => {
                    self.stats.record_failure();
                    tracing::error!(worker = self.id, "Failed to build request: {}", e);
                    break;
                }
            };

            match self.send(req).await {
                Outcome::Success(latency) => self.stats.record_success(latency),
                Outcome::Status(status) => {
                    self.stats.record_failure();
                    tracing::debug!(worker = self.id, "HTTP error: {}", status);
                }
                Outcome::Transport(e) => {
                    self.stats.record_failure();
                    tracing::debug!(worker = self.id, "Request error: {}", e);
                    // A refused connection can fail without ever suspending.
                    tokio::task::yield_now().await;
                }
            }
        }

        self.stats.elapsed = start_time.elapsed();
        let report = WorkerReport {
            id: self.id,
            stats: self.stats,
        };
        // Buffered to the cohort size, never blocks. The receiver is only gone
        // if the coordinator itself was dropped.
        if done.send(report).await.is_err() {
            tracing::warn!(worker = self.id, "Coordinator gone before stop was acknowledged");
        }
    }

    async fn send(&self, req: LoadRequest) -> Outcome {
        let start = Instant::now();
        let resp = match self.client.request(req).await {
            Ok(resp) => resp,
            Err(e) => return Outcome::Transport(e.to_string()),
        };

        let status = resp.status();
        // Drain the body so the connection goes back to the pool and the
        // timing covers the full transfer.
        if let Err(e) = resp.into_body().collect().await {
            return Outcome::Transport(e.to_string());
        }
        let latency = start.elapsed();

        if status.is_success() {
            Outcome::Success(latency)
        } else {
            Outcome::Status(status)
        }
    }
}
