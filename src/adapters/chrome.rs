// Headless Chrome implementation of the PageDriver port.

use crate::config::JobsConfig;
use crate::domain::ports::{PageDriver, Readiness};
use crate::utils::error::{EtlError, Result};
use anyhow::Context;
use headless_chrome::browser::tab::{ElementNotVisible, NoElementFound};
use headless_chrome::util::{Timeout, Wait};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

pub struct ChromeDriver {
    // Browser 必須與 tab 同生命週期，否則 Chrome 會被關閉
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeDriver {
    pub fn launch(config: &JobsConfig) -> Result<Self> {
        Self::launch_inner(config.headless, config.sandbox)
            .map_err(|e| EtlError::fetch("browser", format!("{:#}", e)))
    }

    fn launch_inner(headless: bool, sandbox: bool) -> anyhow::Result<Self> {
        tracing::info!("Launching Chrome browser (headless: {})", headless);

        let options = LaunchOptions {
            headless,
            sandbox,
            args: vec![
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--disable-dev-shm-usage"),
            ],
            ..Default::default()
        };

        let browser = Browser::new(options)
            .context("Failed to launch Chrome. Is Chrome/Chromium installed?")?;
        let tab = browser
            .new_tab()
            .context("Failed to create new browser tab")?;

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn wait_inner(&self, readiness: &Readiness, timeout: Duration) -> anyhow::Result<()> {
        let selector = readiness.selector();
        match readiness {
            Readiness::Present(_) => {
                self.tab
                    .wait_for_element_with_custom_timeout(selector, timeout)?;
            }
            Readiness::Clickable(_) => {
                // 元素出現且有版面配置才算可點擊，兩者都在 timeout 內輪詢
                Wait::with_timeout(timeout).strict_until(
                    || {
                        let element = self.tab.find_element(selector)?;
                        element
                            .get_box_model()
                            .map(|_| ())
                            .map_err(|_| ElementNotVisible {}.into())
                    },
                    |e: anyhow::Error| {
                        if e.is::<NoElementFound>() || e.is::<ElementNotVisible>() {
                            Ok(())
                        } else {
                            Err(e)
                        }
                    },
                )?;
            }
        }
        Ok(())
    }
}

/// Only an elapsed wait is a timeout; anything else means the browser itself failed.
fn classify_wait_error(
    err: anyhow::Error,
    key: String,
    readiness: &Readiness,
    timeout: Duration,
) -> EtlError {
    if err.is::<Timeout>() {
        EtlError::TimeoutError {
            key,
            condition: readiness.to_string(),
            seconds: timeout.as_secs(),
        }
    } else {
        EtlError::fetch(key, format!("waiting for {}: {:#}", readiness, err))
    }
}

impl PageDriver for ChromeDriver {
    fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| EtlError::fetch(url, format!("{:#}", e)))
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }

    fn wait_for(&self, readiness: &Readiness, timeout: Duration) -> Result<()> {
        self.wait_inner(readiness, timeout).map_err(|e| {
            tracing::debug!("Wait for {} failed: {:#}", readiness, e);
            classify_wait_error(e, self.current_url(), readiness, timeout)
        })
    }

    fn type_into(&self, selector: &str, text: &str) -> Result<()> {
        self.tab
            .find_element(selector)
            .and_then(|element| element.type_into(text).map(|_| ()))
            .map_err(|e| EtlError::fetch(self.current_url(), format!("typing into {}: {:#}", selector, e)))
    }

    fn click(&self, selector: &str) -> Result<()> {
        self.tab
            .find_element(selector)
            .and_then(|element| element.click().map(|_| ()))
            .map_err(|e| EtlError::fetch(self.current_url(), format!("clicking {}: {:#}", selector, e)))
    }

    fn page_source(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| EtlError::fetch(self.current_url(), format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_wait_is_timeout() {
        let readiness = Readiness::Clickable("button.search".to_string());
        let err = classify_wait_error(
            anyhow::Error::from(Timeout),
            "https://hk.jobsdb.com/hk/search-jobs".to_string(),
            &readiness,
            Duration::from_secs(10),
        );

        match err {
            EtlError::TimeoutError {
                key,
                condition,
                seconds,
            } => {
                assert_eq!(key, "https://hk.jobsdb.com/hk/search-jobs");
                assert_eq!(condition, "'button.search' to be clickable");
                assert_eq!(seconds, 10);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_browser_failure_is_fetch_error() {
        let readiness = Readiness::Present("article".to_string());
        let err = classify_wait_error(
            anyhow::anyhow!("Unable to make method calls because underlying connection is closed"),
            "https://hk.jobsdb.com/job/1".to_string(),
            &readiness,
            Duration::from_secs(10),
        );

        assert!(matches!(err, EtlError::FetchError { ref key, .. } if key == "https://hk.jobsdb.com/job/1"));
        assert!(err.to_string().contains("connection is closed"));
    }
}
