pub mod config;
pub mod driver;
pub mod generator;
pub mod sink;
pub mod stats;
pub mod worker;
pub mod worker_set;

pub use config::SearchConfig;
pub use driver::{Driver, SearchState, Step};
pub use generator::{LoadRequest, RequestGenerator, StaticRequestGenerator};
pub use sink::{format_summary, ConsoleSink, StatsSink};
pub use stats::{RunStats, WorkerStats};
pub use worker_set::WorkerSet;
