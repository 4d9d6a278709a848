use anyhow::{bail, Result};
use std::time::Duration;
use url::Url;

/// Target hit by every worker.
pub const TARGET_URL: &str = "http://localhost/sleep.php";

/// Wall-clock length of a single run.
pub const RUN_DURATION: Duration = Duration::from_secs(10);

/// Worker count of the first run; every following run doubles it.
pub const START_PARALLELISM: usize = 1;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub target_url: String,
    pub run_duration: Duration,
    pub start_parallelism: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            target_url: TARGET_URL.to_string(),
            run_duration: RUN_DURATION,
            start_parallelism: START_PARALLELISM,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.target_url)?;
        if self.run_duration.is_zero() {
            bail!("run duration must be greater than zero");
        }
        if self.start_parallelism == 0 {
            bail!("starting parallelism must be at least 1");
        }
        Ok(())
    }
}
