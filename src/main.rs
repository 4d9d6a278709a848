use anyhow::{Context, Result};
use std::sync::Arc;

use rampwrk::{ConsoleSink, Driver, SearchConfig, StaticRequestGenerator};

fn main() -> Result<()> {
    // stdout belongs to the progress display
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = SearchConfig::default();
    config.validate()?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    tracing::info!(
        url = %config.target_url,
        duration = ?config.run_duration,
        start = config.start_parallelism,
        "Starting concurrency search"
    );

    let generator = Arc::new(StaticRequestGenerator::new(config.target_url.clone()));
    let sink = ConsoleSink;
    let driver = Driver::new(config, &sink);
    rt.block_on(driver.run(generator))?;

    Ok(())
}
