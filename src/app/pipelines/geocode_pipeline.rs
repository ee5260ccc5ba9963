use crate::config::AppConfig;
use crate::core::load::write_outputs;
use crate::core::regeo::parse_regeocode;
use crate::core::{ParsedRecord, Pipeline, ReverseGeocoder, Storage, TransformResult};
use crate::domain::model::{format_coordinate, normalize_coordinate, Coordinate, FirmLocation, RunReport};
use crate::domain::table::ResultTable;
use crate::utils::error::{EtlError, Result};

pub const CODE_COLUMN: &str = "code";
pub const LNG_COLUMN: &str = "Lng";
pub const LAT_COLUMN: &str = "Lat";

/// Input rows plus the firms that had usable coordinates.
#[derive(Debug, Clone)]
pub struct GeocodeBatch {
    /// Input table with `Lng`/`Lat` rounded to 6 decimals.
    pub source: ResultTable,
    pub firms: Vec<FirmLocation>,
    pub rejected: usize,
}

impl GeocodeBatch {
    /// 驗證必要欄位並把座標四捨五入到 6 位小數
    pub fn from_table(input: &ResultTable) -> Result<Self> {
        for column in [CODE_COLUMN, LNG_COLUMN, LAT_COLUMN] {
            if input.column_index(column).is_none() {
                return Err(EtlError::MissingColumnError {
                    column: column.to_string(),
                });
            }
        }

        let mut source = ResultTable::with_columns(input.columns().iter().cloned());
        let mut firms = Vec::with_capacity(input.len());
        let mut rejected = 0;

        for index in 0..input.len() {
            let code = input.cell(index, CODE_COLUMN).unwrap_or_default().to_string();
            let lng = input.cell(index, LNG_COLUMN).unwrap_or_default().trim().parse::<f64>();
            let lat = input.cell(index, LAT_COLUMN).unwrap_or_default().trim().parse::<f64>();

            let (Ok(lng), Ok(lat)) = (lng, lat) else {
                tracing::warn!("Skipping firm {} (row {}): invalid coordinates", code, index + 1);
                rejected += 1;
                continue;
            };

            let coordinate = Coordinate::new(lng, lat);
            let cells = input.columns().iter().map(|column| {
                let value = match column.as_str() {
                    LNG_COLUMN => format_coordinate(coordinate.lng()),
                    LAT_COLUMN => format_coordinate(coordinate.lat()),
                    _ => input.cell(index, column).unwrap_or_default().to_string(),
                };
                (column.clone(), value)
            });
            source.push_row(cells);
            firms.push(FirmLocation { code, coordinate });
        }

        Ok(Self {
            source,
            firms,
            rejected,
        })
    }
}

pub struct GeocodePipeline<S: Storage, G: ReverseGeocoder> {
    storage: S,
    geocoder: G,
    config: AppConfig,
}

impl<S: Storage, G: ReverseGeocoder> GeocodePipeline<S, G> {
    pub fn new(storage: S, geocoder: G, config: AppConfig) -> Self {
        Self {
            storage,
            geocoder,
            config,
        }
    }

    async fn process(&self, firm: &FirmLocation) -> Result<ParsedRecord> {
        tracing::info!("Getting the data of firm {}", firm.code);
        let body = self.geocoder.reverse_geocode(&firm.coordinate).await?;

        tracing::info!("Parsing the data of firm {}", firm.code);
        parse_regeocode(&body, &firm.coordinate)
    }
}

#[async_trait::async_trait]
impl<S: Storage, G: ReverseGeocoder> Pipeline for GeocodePipeline<S, G> {
    type Batch = GeocodeBatch;

    fn name(&self) -> &str {
        "geocode"
    }

    async fn extract(&self) -> Result<GeocodeBatch> {
        let input_path = &self.config.geocode.input_path;
        tracing::debug!("Reading firm locations from {}", input_path);

        let data = tokio::fs::read(input_path).await?;
        let input = ResultTable::from_csv_reader(data.as_slice())?;
        let batch = GeocodeBatch::from_table(&input)?;

        tracing::info!(
            "Extracted {} firms from {} ({} rejected)",
            batch.firms.len(),
            input_path,
            batch.rejected
        );
        Ok(batch)
    }

    async fn transform(&self, batch: GeocodeBatch) -> Result<TransformResult> {
        let mut report = RunReport {
            attempted: batch.rejected,
            parse_failures: batch.rejected,
            ..Default::default()
        };
        let mut table = ResultTable::new();

        for firm in &batch.firms {
            report.attempted += 1;
            match self.process(firm).await {
                Ok(record) => {
                    tracing::info!("Saving the data of firm {}", firm.code);
                    table.push_record(&record);
                    report.succeeded += 1;
                }
                Err(err) => {
                    tracing::error!(
                        "❌ Failed to get the data of firm {} ({}): {}",
                        firm.code,
                        firm.coordinate,
                        err
                    );
                    report.record_error(&err);
                }
            }
        }

        // 以 (Lng, Lat) 合併回原始輸入
        let merged = if table.is_empty() {
            ResultTable::with_columns(batch.source.columns().iter().cloned())
        } else {
            batch
                .source
                .inner_join(&table, &[LNG_COLUMN, LAT_COLUMN], normalize_coordinate)?
        };
        tracing::debug!(
            "Merged {} result rows onto {} input rows -> {} rows",
            table.len(),
            batch.source.len(),
            merged.len()
        );

        Ok(TransformResult {
            table: merged,
            report,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        write_outputs(&self.storage, &self.config.load, self.name(), &result.table).await
    }
}
