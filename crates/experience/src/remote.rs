//! Remote event store of the app under test

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ExperienceResult;

/// Clears the persisted events of the app under test
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Ask the app to delete every stored event, returning the response body
    async fn clear_all(&self) -> ExperienceResult<String>;
}

/// Plain HTTP access to `GET <events>?deleteAll=true`
pub struct HttpEventStore {
    client: reqwest::Client,
    clear_url: String,
}

impl HttpEventStore {
    pub fn new(clear_url: impl Into<String>) -> ExperienceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            clear_url: clear_url.into(),
        })
    }
}

#[async_trait]
impl RemoteStore for HttpEventStore {
    async fn clear_all(&self) -> ExperienceResult<String> {
        debug!("GET {}", self.clear_url);
        let resp = self.client.get(&self.clear_url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!("Clear returned {}", status);
        Ok(body)
    }
}
