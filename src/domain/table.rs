use crate::domain::model::ParsedRecord;
use crate::utils::error::{EtlError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Read;

/// Value of a cell a row never set.
pub const EMPTY: &str = "";

/// Row-oriented table whose column set grows as new keys show up.
///
/// A row stores cells only up to the last column it knows about; reading past that
/// yields [`EMPTY`], so appending a column never rewrites earlier rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

/// 字串化規則：字串原樣、null 為空、其餘用 JSON 表示
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => EMPTY.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Scalar fields become one column; object fields become one `outer_inner` column per inner key.
pub fn flatten_record(record: &ParsedRecord) -> Vec<(String, String)> {
    let mut cells = Vec::with_capacity(record.data.len());
    for (key, value) in &record.data {
        match value {
            Value::Object(inner) => {
                for (inner_key, inner_value) in inner {
                    cells.push((format!("{}_{}", key, inner_key), stringify_value(inner_value)));
                }
            }
            other => cells.push((key.clone(), stringify_value(other))),
        }
    }
    cells
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for column in columns {
            table.ensure_column(column.into());
        }
        table
    }

    /// 讀取有標頭的 CSV，欄位順序依標頭
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut table = Self::with_columns(headers.iter());
        for record in csv_reader.records() {
            let record = record?;
            table.push_row(headers.iter().zip(record.iter()));
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `None` when the row or column does not exist; [`EMPTY`] when the row never set it.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let position = self.column_index(column)?;
        let cells = self.rows.get(row)?;
        Some(cells.get(position).map(String::as_str).unwrap_or(EMPTY))
    }

    pub fn row(&self, row: usize) -> Option<Vec<&str>> {
        self.rows.get(row).map(|cells| self.pad(cells))
    }

    /// Rows padded to the full column set.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.rows.iter().map(move |cells| self.pad(cells))
    }

    fn pad<'a>(&'a self, cells: &'a [String]) -> Vec<&'a str> {
        (0..self.columns.len())
            .map(|i| cells.get(i).map(String::as_str).unwrap_or(EMPTY))
            .collect()
    }

    fn ensure_column(&mut self, name: String) -> usize {
        if let Some(&position) = self.index.get(&name) {
            return position;
        }
        let position = self.columns.len();
        tracing::trace!("New column '{}' at position {}", name, position);
        self.index.insert(name.clone(), position);
        self.columns.push(name);
        position
    }

    /// Appends one row from `(column, value)` pairs; unseen columns are added at the end.
    pub fn push_row<I, K, V>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut row: Vec<String> = Vec::new();
        for (column, value) in cells {
            let position = self.ensure_column(column.into());
            if row.len() <= position {
                row.resize(position + 1, EMPTY.to_string());
            }
            row[position] = value.into();
        }
        self.rows.push(row);
    }

    pub fn push_record(&mut self, record: &ParsedRecord) {
        self.push_row(flatten_record(record));
    }

    pub fn with_record(mut self, record: &ParsedRecord) -> Self {
        self.push_record(record);
        self
    }

    pub fn to_delimited(&self, delimiter: u8) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());

        writer.write_record(&self.columns)?;
        for row in self.rows() {
            writer.write_record(&row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| EtlError::IoError(std::io::Error::new(e.error().kind(), e.to_string())))?;
        String::from_utf8(bytes).map_err(|e| {
            EtlError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    pub fn to_csv(&self) -> Result<String> {
        self.to_delimited(b',')
    }

    pub fn to_tsv(&self) -> Result<String> {
        self.to_delimited(b'\t')
    }

    pub fn to_json_rows(&self) -> Vec<Map<String, Value>> {
        self.rows()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.clone(), Value::String(value.to_string())))
                    .collect()
            })
            .collect()
    }

    /// Inner join on `keys`, comparing key cells after `normalize`.
    ///
    /// Each left row appears at most once: when several right rows share a key the first
    /// one is used. Output columns are the left columns followed by the right non-key
    /// columns; a right column whose name is already taken gets a `_y` suffix.
    pub fn inner_join<F>(&self, right: &ResultTable, keys: &[&str], normalize: F) -> Result<ResultTable>
    where
        F: Fn(&str) -> String,
    {
        let left_keys = key_positions(self, keys)?;
        let right_keys = key_positions(right, keys)?;

        let mut lookup: HashMap<Vec<String>, usize> = HashMap::new();
        for (i, row) in right.rows().enumerate() {
            let key: Vec<String> = right_keys.iter().map(|&c| normalize(row[c])).collect();
            if lookup.contains_key(&key) {
                tracing::warn!("Duplicate join key {:?} in right table, keeping first row", key);
                continue;
            }
            lookup.insert(key, i);
        }

        let right_columns: Vec<(usize, String)> = right
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| !right_keys.contains(i))
            .map(|(i, name)| {
                let output_name = if self.index.contains_key(name) {
                    format!("{}_y", name)
                } else {
                    name.clone()
                };
                (i, output_name)
            })
            .collect();

        let mut joined = ResultTable::with_columns(
            self.columns
                .iter()
                .cloned()
                .chain(right_columns.iter().map(|(_, name)| name.clone())),
        );

        for row in self.rows() {
            let key: Vec<String> = left_keys.iter().map(|&c| normalize(row[c])).collect();
            let Some(right_row) = lookup.get(&key).and_then(|&r| right.row(r)) else {
                continue;
            };

            let cells: Vec<String> = row
                .iter()
                .map(|s| s.to_string())
                .chain(right_columns.iter().map(|(i, _)| right_row[*i].to_string()))
                .collect();
            joined.rows.push(cells);
        }

        Ok(joined)
    }
}

fn key_positions(table: &ResultTable, keys: &[&str]) -> Result<Vec<usize>> {
    keys.iter()
        .map(|key| {
            table
                .column_index(key)
                .ok_or_else(|| EtlError::MissingColumnError {
                    column: key.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ParsedRecord {
        match value {
            Value::Object(map) => ParsedRecord::from(map),
            _ => panic!("test records must be objects"),
        }
    }

    #[test]
    fn test_nested_field_flattens_to_outer_inner() {
        let cells = flatten_record(&record(json!({"pbc": {"num": 3}})));
        assert_eq!(cells, vec![("pbc_num".to_string(), "3".to_string())]);
    }

    #[test]
    fn test_stringify_rules() {
        let cells = flatten_record(&record(json!({
            "name": "Bank",
            "count": 2,
            "open": true,
            "missing": null,
            "tags": ["a", "b"],
            "bc": {"extra": [{"type": "x"}]}
        })));

        assert_eq!(
            cells,
            vec![
                ("name".to_string(), "Bank".to_string()),
                ("count".to_string(), "2".to_string()),
                ("open".to_string(), "true".to_string()),
                ("missing".to_string(), "".to_string()),
                ("tags".to_string(), r#"["a","b"]"#.to_string()),
                ("bc_extra".to_string(), r#"[{"type":"x"}]"#.to_string()),
            ]
        );
    }

    #[test]
    fn test_push_record_adds_exactly_one_row() {
        let table = ResultTable::new()
            .with_record(&record(json!({"province": "广东省", "bc": {"num": 1}})));

        assert_eq!(table.len(), 1);
        assert_eq!(table.columns(), &["province".to_string(), "bc_num".to_string()]);
        assert_eq!(table.cell(0, "province"), Some("广东省"));
        assert_eq!(table.cell(0, "bc_num"), Some("1"));
    }

    #[test]
    fn test_new_column_reads_empty_for_earlier_rows() {
        let mut table = ResultTable::new();
        table.push_record(&record(json!({"a": "1"})));
        table.push_record(&record(json!({"a": "2", "b": "x"})));
        table.push_record(&record(json!({"b": "y"})));

        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.cell(0, "b"), Some(EMPTY));
        assert_eq!(table.cell(2, "a"), Some(EMPTY));
        assert_eq!(table.row(0), Some(vec!["1", ""]));
        assert_eq!(table.cell(0, "nope"), None);
        assert_eq!(table.cell(9, "a"), None);
    }

    #[test]
    fn test_to_csv_pads_rows() {
        let mut table = ResultTable::new();
        table.push_row([("code", "A1")]);
        table.push_row([("code", "A2"), ("city", "广州市")]);

        assert_eq!(table.to_csv().unwrap(), "code,city\nA1,\nA2,广州市\n");
        assert_eq!(table.to_tsv().unwrap(), "code\tcity\nA1\t\nA2\t广州市\n");
    }

    #[test]
    fn test_from_csv_reader() {
        let data = "code, Lng ,Lat\nA1,113.1,23.1\nB2,114.2,22.5\n";
        let table = ResultTable::from_csv_reader(data.as_bytes()).unwrap();

        assert_eq!(table.columns(), &["code".to_string(), "Lng".to_string(), "Lat".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "Lat"), Some("22.5"));
    }

    #[test]
    fn test_inner_join_matches_each_left_row_once() {
        let mut left = ResultTable::new();
        left.push_row([("code", "A1"), ("Lng", "113.123456"), ("Lat", "23.123456")]);
        left.push_row([("code", "B2"), ("Lng", "114.000000"), ("Lat", "22.000000")]);
        left.push_row([("code", "C3"), ("Lng", "115.5"), ("Lat", "21.5")]);

        let mut right = ResultTable::new();
        right.push_row([("city", "广州市"), ("Lng", "113.123456"), ("Lat", "23.123456")]);
        right.push_row([("city", "深圳市"), ("Lng", "115.500000"), ("Lat", "21.500000")]);
        right.push_row([("city", "重复"), ("Lng", "115.500000"), ("Lat", "21.500000")]);

        let normalize = |s: &str| {
            s.parse::<f64>()
                .map(|v| format!("{:.6}", v))
                .unwrap_or_else(|_| s.to_string())
        };
        let joined = left.inner_join(&right, &["Lng", "Lat"], normalize).unwrap();

        assert_eq!(
            joined.columns(),
            &["code".to_string(), "Lng".to_string(), "Lat".to_string(), "city".to_string()]
        );
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.row(0), Some(vec!["A1", "113.123456", "23.123456", "广州市"]));
        assert_eq!(joined.row(1), Some(vec!["C3", "115.5", "21.5", "深圳市"]));
    }

    #[test]
    fn test_inner_join_suffixes_colliding_columns() {
        let mut left = ResultTable::new();
        left.push_row([("id", "1"), ("name", "left")]);
        let mut right = ResultTable::new();
        right.push_row([("id", "1"), ("name", "right")]);

        let joined = left.inner_join(&right, &["id"], |s| s.to_string()).unwrap();
        assert_eq!(
            joined.columns(),
            &["id".to_string(), "name".to_string(), "name_y".to_string()]
        );
        assert_eq!(joined.row(0), Some(vec!["1", "left", "right"]));
    }

    #[test]
    fn test_inner_join_missing_key_column() {
        let left = ResultTable::with_columns(["code"]);
        let right = ResultTable::with_columns(["Lng"]);
        let err = left.inner_join(&right, &["Lng"], |s| s.to_string()).unwrap_err();
        assert!(matches!(err, EtlError::MissingColumnError { .. }));
    }
}
