use crate::domain::ports::{PageDriver, Readiness};
use crate::utils::error::{EtlError, Result};
use std::time::Duration;
use url::Url;

/// Waits for `readiness`; a timeout is logged and reported back instead of failing the fetch.
///
/// Returns `Some(err)` when the page is being used in a degraded state.
pub fn wait_degraded<D: PageDriver + ?Sized>(
    driver: &D,
    readiness: &Readiness,
    timeout: Duration,
) -> Result<Option<EtlError>> {
    match driver.wait_for(readiness, timeout) {
        Ok(()) => {
            tracing::debug!("Condition {} met", readiness);
            Ok(None)
        }
        Err(err @ EtlError::TimeoutError { .. }) => {
            tracing::warn!("⏳ {} - continuing with partially loaded page", err);
            Ok(Some(err))
        }
        Err(other) => Err(other),
    }
}

#[derive(Debug)]
pub struct FetchedPage {
    pub html: String,
    pub timeout: Option<EtlError>,
}

/// Navigates to `url`, waits up to `timeout` for `readiness` and returns the page source.
pub fn fetch_page<D: PageDriver + ?Sized>(
    driver: &D,
    url: &str,
    readiness: &Readiness,
    timeout: Duration,
) -> Result<FetchedPage> {
    tracing::info!("scraping {}...", url);
    driver.navigate(url)?;
    let timeout = wait_degraded(driver, readiness, timeout)?;

    let html = driver.page_source()?;
    if html.trim().is_empty() {
        return Err(EtlError::fetch(url, "page source has not been loaded"));
    }
    Ok(FetchedPage { html, timeout })
}

/// Resolves a (usually relative) detail link against the site base.
pub fn resolve_detail_url(base: &str, href: &str) -> Result<String> {
    let base = Url::parse(base)?;
    let joined = base
        .join(href)
        .map_err(|e| EtlError::fetch(href, format!("cannot resolve against {}: {}", base, e)))?;
    Ok(joined.to_string())
}
