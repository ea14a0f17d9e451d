use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

pub static USER_AGENT: &str = "radar-tiles/0.1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TileResponse {
    pub status: StatusCode,
    /// Empty unless `status` is a success.
    pub body: Vec<u8>,
}

/// Anything that can GET a tile by URL.
pub trait TileSource: Send + Sync + 'static {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<TileResponse>>;
}

/// Only connecting is bounded by a timeout. A response that never finishes holds its fetch slot.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(HttpSource { client })
    }

    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<TileResponse> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        debug!(status = %status, "received tile response");
        if !status.is_success() {
            return Ok(TileResponse {
                status,
                body: Vec::new(),
            });
        }

        let body = res.bytes().await?.to_vec();
        Ok(TileResponse { status, body })
    }
}

impl TileSource for HttpSource {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<TileResponse>> {
        self.get(url).boxed()
    }
}
