use crate::config::AppConfig;
use crate::core::fetch::{fetch_page, resolve_detail_url, wait_degraded};
use crate::core::listing::{CompiledDetail, CompiledListing, SearchPage};
use crate::core::load::write_outputs;
use crate::core::{PageDriver, ParsedRecord, Pipeline, Readiness, Storage, TransformResult};
use crate::domain::model::{RunReport, SearchQuery};
use crate::domain::table::ResultTable;
use crate::utils::error::{EtlError, Result};

/// Keyword search on the job site followed by one detail page per result card.
pub struct JobsPipeline<S: Storage, D: PageDriver> {
    storage: S,
    driver: D,
    config: AppConfig,
    listing: CompiledListing,
    detail: CompiledDetail,
}

impl<S: Storage, D: PageDriver> JobsPipeline<S, D> {
    /// Fails when a configured selector does not compile.
    pub fn new(storage: S, driver: D, config: AppConfig) -> Result<Self> {
        let listing = config.jobs.listing.compile()?;
        let detail = config.jobs.detail.compile()?;
        Ok(Self {
            storage,
            driver,
            config,
            listing,
            detail,
        })
    }

    /// Columns of a run that produced no rows.
    fn empty_table(&self) -> ResultTable {
        let jobs = &self.config.jobs;
        ResultTable::with_columns(
            jobs.listing
                .fields
                .iter()
                .chain(jobs.detail.fields.iter())
                .map(|field| field.name.clone()),
        )
    }

    fn search(&self, query: &SearchQuery, report: &mut RunReport) -> Result<SearchPage> {
        let jobs = &self.config.jobs;
        let timeout = jobs.wait_timeout();

        tracing::info!("Searching '{}' on {}", query.keyword, jobs.search_url);
        self.driver.navigate(&jobs.search_url)?;

        let current = self.driver.current_url();
        if current.trim_end_matches('/') == jobs.search_url.trim_end_matches('/') {
            tracing::info!("scraping {}...", current);
        } else {
            tracing::warn!("Landed on {} instead of {}", current, jobs.search_url);
        }

        if let Some(err) =
            wait_degraded(&self.driver, &Readiness::Clickable(jobs.search_submit.clone()), timeout)?
        {
            report.record_error(&err);
        }
        self.driver.type_into(&jobs.search_input, &query.keyword)?;
        self.driver.click(&jobs.search_submit)?;

        if let Some(err) =
            wait_degraded(&self.driver, &Readiness::Present(jobs.results_ready.clone()), timeout)?
        {
            report.record_error(&err);
        }

        let html = self.driver.page_source()?;
        if html.trim().is_empty() {
            return Err(EtlError::fetch(&current, "page source has not been loaded"));
        }
        self.listing.parse_pages(&html)
    }

    fn scrape_detail(&self, listing: ParsedRecord, report: &mut RunReport) -> Result<ParsedRecord> {
        let jobs = &self.config.jobs;
        let link_field = self.listing.link_field();

        let href = listing
            .get(link_field)
            .and_then(|value| value.as_str())
            .filter(|href| !href.is_empty())
            .ok_or_else(|| EtlError::parse("search results", link_field))?;
        let url = resolve_detail_url(&jobs.base_url, href)?;

        let page = fetch_page(
            &self.driver,
            &url,
            &Readiness::Present(jobs.detail_ready.clone()),
            jobs.wait_timeout(),
        )?;
        if let Some(err) = &page.timeout {
            report.record_error(err);
        }

        let detail = self.detail.parse_detail(&page.html, &url)?;
        let mut record = listing;
        record.merge(detail);
        Ok(record)
    }
}

#[async_trait::async_trait]
impl<S: Storage, D: PageDriver> Pipeline for JobsPipeline<S, D> {
    type Batch = SearchQuery;

    fn name(&self) -> &str {
        "jobs"
    }

    async fn extract(&self) -> Result<SearchQuery> {
        Ok(SearchQuery {
            keyword: self.config.jobs.keyword.clone(),
        })
    }

    async fn transform(&self, query: SearchQuery) -> Result<TransformResult> {
        let mut report = RunReport::default();

        let page = match self.search(&query, &mut report) {
            Ok(page) => page,
            Err(err) => {
                tracing::error!("❌ Search for '{}' failed: {}", query.keyword, err);
                // 搜尋本身算一筆失敗記錄
                report.attempted += 1;
                report.record_error(&err);
                return Ok(TransformResult {
                    table: self.empty_table(),
                    report,
                });
            }
        };
        tracing::info!("Found {} jobs for '{}'", page.len(), query.keyword);

        let mut table = ResultTable::new();
        for index in 0..page.len() {
            let Some(listing) = page.record_at(index) else {
                break;
            };
            report.attempted += 1;

            match self.scrape_detail(listing, &mut report) {
                Ok(record) => {
                    table.push_record(&record);
                    report.succeeded += 1;
                }
                Err(err) => {
                    tracing::error!("❌ Skipping job {} of {}: {}", index + 1, page.len(), err);
                    report.record_error(&err);
                }
            }
        }

        if table.is_empty() {
            table = self.empty_table();
        }
        Ok(TransformResult { table, report })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        write_outputs(&self.storage, &self.config.load, self.name(), &result.table).await
    }
}
