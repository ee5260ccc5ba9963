use crate::domain::model::{Coordinate, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Whatever `extract` hands to `transform` (input rows, a search query, ...).
    type Batch: Send;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Self::Batch>;
    async fn transform(&self, batch: Self::Batch) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}

/// 逆地理編碼來源，回傳原始 JSON
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, coordinate: &Coordinate) -> Result<serde_json::Value>;
}

/// Predicate over page state gating when a page counts as loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// At least one element matches the CSS selector.
    Present(String),
    /// A matching element exists and has a layout box, so it can receive clicks.
    Clickable(String),
}

impl Readiness {
    pub fn selector(&self) -> &str {
        match self {
            Readiness::Present(selector) | Readiness::Clickable(selector) => selector,
        }
    }
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Readiness::Present(selector) => write!(f, "presence of '{}'", selector),
            Readiness::Clickable(selector) => write!(f, "'{}' to be clickable", selector),
        }
    }
}

/// Blocking browser session. One instance is driven by one pipeline at a time.
pub trait PageDriver: Send + Sync {
    fn navigate(&self, url: &str) -> Result<()>;
    fn current_url(&self) -> String;
    /// Fails with `EtlError::TimeoutError` when `readiness` does not hold within `timeout`.
    fn wait_for(&self, readiness: &Readiness, timeout: Duration) -> Result<()>;
    fn type_into(&self, selector: &str, text: &str) -> Result<()>;
    fn click(&self, selector: &str) -> Result<()>;
    fn page_source(&self) -> Result<String>;
}
