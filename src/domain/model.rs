use crate::domain::table::ResultTable;
use crate::utils::error::{EtlError, RecordErrorKind};
use serde_json::{Map, Value};

const COORDINATE_SCALE: f64 = 1_000_000.0;

/// 四捨五入到小數點後 6 位 (高德 API 要求的精度)
pub fn round_coordinate(value: f64) -> f64 {
    (value * COORDINATE_SCALE).round() / COORDINATE_SCALE
}

/// 以 6 位小數格式化座標分量
pub fn format_coordinate(value: f64) -> String {
    format!("{:.6}", round_coordinate(value))
}

/// Join-key normalization for coordinate cells; non-numeric cells are only trimmed.
pub fn normalize_coordinate(cell: &str) -> String {
    let cell = cell.trim();
    cell.parse::<f64>()
        .map(format_coordinate)
        .unwrap_or_else(|_| cell.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lng: f64,
    lat: f64,
}

impl Coordinate {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            lng: round_coordinate(lng),
            lat: round_coordinate(lat),
        }
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// `location` query value: `"lng,lat"`
    pub fn to_param(&self) -> String {
        format!("{},{}", format_coordinate(self.lng), format_coordinate(self.lat))
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_param())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FirmLocation {
    pub code: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
}

/// One parsed record. Object values are nested mappings and flatten to `outer_inner` columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRecord {
    pub data: Map<String, Value>,
}

impl ParsedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Appends `other`'s fields after this record's own.
    pub fn merge(&mut self, other: ParsedRecord) {
        for (key, value) in other.data {
            self.data.insert(key, value);
        }
    }
}

impl From<Map<String, Value>> for ParsedRecord {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub fetch_failures: usize,
    pub timeouts: usize,
    pub parse_failures: usize,
}

impl RunReport {
    pub fn record_error(&mut self, err: &EtlError) {
        match err.record_kind() {
            Some(RecordErrorKind::Fetch) | None => self.fetch_failures += 1,
            Some(RecordErrorKind::Timeout) => self.timeouts += 1,
            Some(RecordErrorKind::Parse) => self.parse_failures += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.attempted.saturating_sub(self.succeeded)
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub table: ResultTable,
    pub report: RunReport,
}
