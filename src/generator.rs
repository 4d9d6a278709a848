use anyhow::Result;
use http_body_util::Empty;
use hyper::body::Bytes;
use hyper::{Method, Request};
use url::Url;

pub type LoadRequest = Request<Empty<Bytes>>;

pub trait RequestGenerator: Send + Sync {
    /// Builds the next request. An error here is fatal for the calling worker.
    fn generate(&self) -> Result<LoadRequest>;
}

/// Plain GET against a fixed URL, no headers, no body.
#[derive(Debug, Clone)]
pub struct StaticRequestGenerator {
    url: String,
}

impl StaticRequestGenerator {
    pub fn new(url: impl Into<String>) -> Self {
        StaticRequestGenerator { url: url.into() }
    }
}

impl RequestGenerator for StaticRequestGenerator {
    fn generate(&self) -> Result<LoadRequest> {
        let url = Url::parse(&self.url)?;
        let req = Request::builder()
            .method(Method::GET)
            .uri(url.as_str())
            .body(Empty::<Bytes>::new())?;
        Ok(req)
    }
}
