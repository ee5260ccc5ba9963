use crate::config::LoadConfig;
use crate::domain::ports::Storage;
use crate::domain::table::ResultTable;
use crate::utils::error::Result;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

fn render(table: &ResultTable, format: &str) -> Result<Vec<u8>> {
    let content = match format {
        "tsv" => table.to_tsv()?,
        "json" => serde_json::to_string_pretty(&table.to_json_rows())?,
        _ => table.to_csv()?,
    };
    Ok(content.into_bytes())
}

/// 依設定輸出 `<pipeline>_output.<format>`，或打包成單一 zip
///
/// Returns the path of the written file (the archive, or the first format).
pub async fn write_outputs<S: Storage>(
    storage: &S,
    config: &LoadConfig,
    pipeline: &str,
    table: &ResultTable,
) -> Result<String> {
    let files: Vec<(String, Vec<u8>)> = config
        .output_formats
        .iter()
        .map(|format| Ok((format!("{}_output.{}", pipeline, format), render(table, format)?)))
        .collect::<Result<_>>()?;

    if let Some(archive_name) = config.archive_name(pipeline) {
        tracing::debug!("Creating ZIP file with {} files", files.len());

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for (name, data) in &files {
                zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                zip.write_all(data)?;
            }
            // 完成並取回底層 Vec<u8>
            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        storage.write_file(&archive_name, &zip_data).await?;
        return Ok(format!("{}/{}", config.output_path, archive_name));
    }

    for (name, data) in &files {
        tracing::debug!("Writing {} ({} bytes) to storage", name, data.len());
        storage.write_file(name, data).await?;
    }

    let first = files
        .first()
        .map(|(name, _)| name.as_str())
        .unwrap_or_default();
    Ok(format!("{}/{}", config.output_path, first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::CompressionConfig;
    use crate::utils::error::EtlError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn sample_table() -> ResultTable {
        let mut table = ResultTable::new();
        table.push_row([("code", "A1"), ("bc_num", "1")]);
        table
    }

    fn load_config(formats: &[&str], compression: Option<CompressionConfig>) -> LoadConfig {
        LoadConfig {
            output_path: "test_output".to_string(),
            output_formats: formats.iter().map(|f| f.to_string()).collect(),
            compression,
        }
    }

    #[tokio::test]
    async fn test_write_each_format() {
        let storage = MockStorage::new();
        let config = load_config(&["csv", "tsv", "json"], None);

        let output_path = write_outputs(&storage, &config, "geocode", &sample_table())
            .await
            .unwrap();

        assert_eq!(output_path, "test_output/geocode_output.csv");
        let csv = storage.get_file("geocode_output.csv").await.unwrap();
        assert_eq!(String::from_utf8(csv).unwrap(), "code,bc_num\nA1,1\n");
        let tsv = storage.get_file("geocode_output.tsv").await.unwrap();
        assert_eq!(String::from_utf8(tsv).unwrap(), "code\tbc_num\nA1\t1\n");

        let json = storage.get_file("geocode_output.json").await.unwrap();
        let rows: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(rows, serde_json::json!([{"code": "A1", "bc_num": "1"}]));
    }

    #[tokio::test]
    async fn test_write_zip_archive() {
        let storage = MockStorage::new();
        let config = load_config(
            &["csv", "json"],
            Some(CompressionConfig {
                enabled: true,
                filename: None,
            }),
        );

        let output_path = write_outputs(&storage, &config, "jobs", &sample_table())
            .await
            .unwrap();

        assert_eq!(output_path, "test_output/jobs_output.zip");
        assert!(storage.get_file("jobs_output.csv").await.is_none());

        let zip_bytes = storage.get_file("jobs_output.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes)).unwrap();
        let mut file_names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        file_names.sort();
        assert_eq!(file_names, vec!["jobs_output.csv", "jobs_output.json"]);

        let mut csv_file = archive.by_name("jobs_output.csv").unwrap();
        let mut content = String::new();
        std::io::Read::read_to_string(&mut csv_file, &mut content).unwrap();
        assert_eq!(content, "code,bc_num\nA1,1\n");
    }
}
