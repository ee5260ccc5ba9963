use crate::config::GeocodeConfig;
use crate::domain::bank::BankCategory;
use crate::domain::model::Coordinate;
use crate::domain::ports::ReverseGeocoder;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// AMap (高德) `regeo` web service client.
pub struct AmapClient {
    client: Client,
    endpoint: String,
    key: String,
    poitype: String,
    radius: String,
    extensions: String,
}

impl AmapClient {
    pub fn new(config: &GeocodeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            key: config.key.clone(),
            poitype: BankCategory::poitype_param(),
            radius: config.radius.to_string(),
            extensions: config.extensions.clone(),
        })
    }

    fn query_params(&self, location: &str) -> [(&'static str, String); 5] {
        [
            ("key", self.key.clone()),
            ("location", location.to_string()),
            ("poitype", self.poitype.clone()),
            ("radius", self.radius.clone()),
            ("extensions", self.extensions.clone()),
        ]
    }
}

#[async_trait]
impl ReverseGeocoder for AmapClient {
    async fn reverse_geocode(&self, coordinate: &Coordinate) -> Result<Value> {
        let location = coordinate.to_param();
        tracing::debug!("Making regeo request for location {}", location);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&self.query_params(&location))
            .send()
            .await
            .map_err(|e| EtlError::fetch(&location, e))?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);
        if !status.is_success() {
            return Err(EtlError::fetch(
                &location,
                format!(
                    "status_code:{} reason:{}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("unknown")
                ),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EtlError::fetch(&location, format!("invalid JSON body: {}", e)))?;

        // 高德以 status = "0" 表示請求失敗 (例如 key 無效)
        if body.get("status").and_then(Value::as_str) == Some("0") {
            let info = body.get("info").and_then(Value::as_str).unwrap_or("unknown");
            let infocode = body.get("infocode").and_then(Value::as_str).unwrap_or("-");
            return Err(EtlError::fetch(
                &location,
                format!("service error: {} (infocode {})", info, infocode),
            ));
        }

        Ok(body)
    }
}
