use crate::core::listing::{DetailSchema, ListingSchema};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "geojobs.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub geocode: GeocodeConfig,
    pub jobs: JobsConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    pub endpoint: String,
    pub key: String,
    pub input_path: String,
    pub radius: u32,
    pub extensions: String,
    pub timeout_seconds: u64,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://restapi.amap.com/v3/geocode/regeo".to_string(),
            key: String::new(),
            input_path: "firmLngLatData.csv".to_string(),
            radius: 3000,
            extensions: "all".to_string(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub search_url: String,
    pub base_url: String,
    pub keyword: String,
    pub wait_seconds: u64,
    pub headless: bool,
    pub sandbox: bool,
    pub search_input: String,
    pub search_submit: String,
    pub results_ready: String,
    pub detail_ready: String,
    pub listing: ListingSchema,
    pub detail: DetailSchema,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            search_url: "https://hk.jobsdb.com/hk/search-jobs".to_string(),
            base_url: "https://hk.jobsdb.com/".to_string(),
            keyword: "green finance research assistant".to_string(),
            wait_seconds: 10,
            headless: true,
            sandbox: false,
            search_input: r#"input[data-automation="searchKeywordsField"]"#.to_string(),
            search_submit: r#"button[data-automation="searchSubmitButton"]"#.to_string(),
            results_ready: "article".to_string(),
            detail_ready: "#contentContainer".to_string(),
            listing: ListingSchema::default(),
            detail: DetailSchema::default(),
        }
    }
}

impl JobsConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            output_formats: vec!["csv".to_string()],
            compression: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

impl LoadConfig {
    /// 啟用壓縮時回傳 zip 檔名
    pub fn archive_name(&self, pipeline: &str) -> Option<String> {
        self.compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| {
                c.filename
                    .clone()
                    .unwrap_or_else(|| format!("{}_output.zip", pipeline))
            })
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 設定檔不存在且為預設路徑時，使用內建預設值
    pub fn load_or_default(path: &str) -> Result<Self> {
        if path == DEFAULT_CONFIG_PATH && !Path::new(path).exists() {
            tracing::info!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AMAP_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_geocode(&self) -> Result<()> {
        let geocode = &self.geocode;
        validation::validate_url("geocode.endpoint", &geocode.endpoint)?;
        if geocode.key.trim().is_empty() || geocode.key.starts_with("${") {
            return Err(EtlError::MissingConfigError {
                field: "geocode.key".to_string(),
            });
        }
        validation::validate_path("geocode.input_path", &geocode.input_path)?;
        validation::validate_file_extensions(
            "geocode.input_path",
            &[geocode.input_path.as_str()],
            &["csv"],
        )?;
        // 高德 regeo 的 radius 範圍 0~3000
        validation::validate_range("geocode.radius", geocode.radius, 0, 3000)?;
        validation::validate_positive_number("geocode.timeout_seconds", geocode.timeout_seconds, 1)?;
        Ok(())
    }

    pub fn validate_jobs(&self) -> Result<()> {
        let jobs = &self.jobs;
        validation::validate_url("jobs.search_url", &jobs.search_url)?;
        validation::validate_url("jobs.base_url", &jobs.base_url)?;
        validation::validate_non_empty_string("jobs.keyword", &jobs.keyword)?;
        validation::validate_positive_number("jobs.wait_seconds", jobs.wait_seconds, 1)?;
        for (field, selector) in [
            ("jobs.search_input", &jobs.search_input),
            ("jobs.search_submit", &jobs.search_submit),
            ("jobs.results_ready", &jobs.results_ready),
            ("jobs.detail_ready", &jobs.detail_ready),
        ] {
            validation::validate_non_empty_string(field, selector)?;
        }
        jobs.listing.compile()?;
        jobs.detail.compile()?;
        Ok(())
    }

    pub fn validate_load(&self) -> Result<()> {
        validation::validate_path("load.output_path", &self.load.output_path)?;

        let valid_formats = ["csv", "tsv", "json"];
        if self.load.output_formats.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }
        for format in &self.load.output_formats {
            if !valid_formats.contains(&format.as_str()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "load.output_formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        valid_formats.join(", ")
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_geocode()?;
        self.validate_jobs()?;
        self.validate_load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert_eq!(config.geocode.endpoint, "https://restapi.amap.com/v3/geocode/regeo");
        assert_eq!(config.geocode.radius, 3000);
        assert_eq!(config.jobs.keyword, "green finance research assistant");
        assert_eq!(config.jobs.wait_seconds, 10);
        assert_eq!(config.load.output_formats, vec!["csv"]);
        assert!(config.load.archive_name("geocode").is_none());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[geocode]
key = "abc123"
input_path = "data/firms.csv"
radius = 1000

[jobs]
keyword = "quant analyst"

[load]
output_path = "./test-output"
output_formats = ["csv", "json"]

[load.compression]
enabled = true
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.geocode.key, "abc123");
        assert_eq!(config.geocode.radius, 1000);
        assert_eq!(config.geocode.extensions, "all");
        assert_eq!(config.jobs.keyword, "quant analyst");
        assert_eq!(config.jobs.base_url, "https://hk.jobsdb.com/");
        assert_eq!(config.load.archive_name("jobs"), Some("jobs_output.zip".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("GEOJOBS_TEST_AMAP_KEY", "from-env");

        let toml_content = r#"
[geocode]
key = "${GEOJOBS_TEST_AMAP_KEY}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.geocode.key, "from-env");

        std::env::remove_var("GEOJOBS_TEST_AMAP_KEY");
    }

    #[test]
    fn test_unresolved_key_fails_validation() {
        let toml_content = r#"
[geocode]
key = "${GEOJOBS_TEST_UNSET_VARIABLE}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        let err = config.validate_geocode().unwrap_err();
        assert!(matches!(err, EtlError::MissingConfigError { .. }));
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[geocode]
key = "abc"
endpoint = "invalid-url"

[load]
output_formats = ["xlsx"]
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate_geocode().is_err());
        assert!(config.validate_load().is_err());
        assert!(config.validate_jobs().is_ok());
    }

    #[test]
    fn test_invalid_selector_fails_jobs_validation() {
        let toml_content = r#"
[jobs.listing]
card = "article[["
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate_jobs().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[load]
output_path = "./file-output"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.load.output_path, "./file-output");
    }

    #[test]
    fn test_example_config_parses() {
        let config = AppConfig::from_toml_str(include_str!("../../geojobs.example.toml")).unwrap();

        assert_eq!(config.load.output_formats, vec!["csv", "json"]);
        assert!(config.load.archive_name("geocode").is_none());
        assert_eq!(config.jobs.listing.link_field, "positionUrl");
        assert!(config.validate_jobs().is_ok());
        assert!(config.validate_load().is_ok());
    }

    #[test]
    fn test_missing_explicit_config_file_is_an_error() {
        assert!(AppConfig::load_or_default("/nonexistent/geojobs.toml").is_err());
    }
}
