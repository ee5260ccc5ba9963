use crate::domain::bank::classify_pois;
use crate::domain::model::{format_coordinate, Coordinate, ParsedRecord};
use crate::utils::error::{EtlError, Result};
use serde_json::Value;

/// Address fields and their JSON pointers in a `regeo` response.
pub const ADDRESS_FIELDS: [(&str, &str); 4] = [
    ("province", "/regeocode/addressComponent/province"),
    ("city", "/regeocode/addressComponent/city"),
    ("district", "/regeocode/addressComponent/district"),
    ("formatted_address", "/regeocode/formatted_address"),
];

pub const POIS_POINTER: &str = "/regeocode/pois";

fn require<'a>(json: &'a Value, pointer: &str, key: &str) -> Result<&'a Value> {
    json.pointer(pointer)
        .ok_or_else(|| EtlError::parse(key, pointer))
}

/// Builds the record for one firm from a `regeo` response.
///
/// `Lng`/`Lat` come from the requested `coordinate`, never from the response.
pub fn parse_regeocode(json: &Value, coordinate: &Coordinate) -> Result<ParsedRecord> {
    let key = coordinate.to_param();
    let mut record = ParsedRecord::new();

    for (name, pointer) in ADDRESS_FIELDS {
        record.insert(name, require(json, pointer, &key)?.clone());
    }

    let pois = require(json, POIS_POINTER, &key)?
        .as_array()
        .ok_or_else(|| EtlError::parse(&key, POIS_POINTER))?;

    record.insert("Lng", format_coordinate(coordinate.lng()));
    record.insert("Lat", format_coordinate(coordinate.lat()));
    record.insert("bank_num", pois.len());

    let summary = classify_pois(pois);
    if summary.unclassified() > 0 {
        tracing::debug!("{} POIs near {} matched no bank category", summary.unclassified(), key);
    }
    for (category, tally) in summary.into_fields() {
        record.insert(category, tally);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::ResultTable;
    use serde_json::json;

    fn sample_response() -> Value {
        json!({
            "status": "1",
            "info": "OK",
            "regeocode": {
                "formatted_address": "广东省广州市天河区天河路123号",
                "addressComponent": {
                    "province": "广东省",
                    "city": "广州市",
                    "district": "天河区"
                },
                "pois": [
                    {"id": "B00140", "name": "中国银行(天河支行)", "type": "金融保险服务;银行;中国银行", "distance": "120"}
                ]
            }
        })
    }

    #[test]
    fn test_parse_regeocode_fields_in_order() {
        let coordinate = Coordinate::new(113.123456, 23.123456);
        let record = parse_regeocode(&sample_response(), &coordinate).unwrap();

        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(
            keys,
            vec![
                "province", "city", "district", "formatted_address", "Lng", "Lat", "bank_num",
                "pbc", "cdb", "eib", "bc", "icbc", "ccb", "abc", "bcomu"
            ]
        );
        assert_eq!(record.get("Lng").unwrap(), "113.123456");
        assert_eq!(record.get("Lat").unwrap(), "23.123456");
        assert_eq!(record.get("bank_num").unwrap(), &json!(1));
        assert_eq!(record.get("bc").unwrap()["num"], json!(1));
    }

    #[test]
    fn test_flattened_row_has_bank_columns() {
        let coordinate = Coordinate::new(113.123456, 23.123456);
        let record = parse_regeocode(&sample_response(), &coordinate).unwrap();
        let table = ResultTable::new().with_record(&record);

        assert_eq!(table.cell(0, "bc_num"), Some("1"));
        assert_eq!(table.cell(0, "icbc_num"), Some("0"));
        assert_eq!(table.cell(0, "icbc_extra"), Some("[]"));
        assert_eq!(table.cell(0, "formatted_address"), Some("广东省广州市天河区天河路123号"));
        assert!(table.cell(0, "bc_extra").unwrap().contains("天河支行"));
    }

    #[test]
    fn test_location_comes_from_argument() {
        let coordinate = Coordinate::new(114.0, 22.5);
        let record = parse_regeocode(&sample_response(), &coordinate).unwrap();

        assert_eq!(record.get("Lng").unwrap(), "114.000000");
        assert_eq!(record.get("Lat").unwrap(), "22.500000");
    }

    #[test]
    fn test_municipality_city_array_is_kept() {
        let mut response = sample_response();
        response["regeocode"]["addressComponent"]["city"] = json!([]);
        let record = parse_regeocode(&response, &Coordinate::new(116.4, 39.9)).unwrap();
        assert_eq!(record.get("city").unwrap(), &json!([]));
    }

    #[test]
    fn test_missing_key_is_parse_error_with_location() {
        let mut response = sample_response();
        response["regeocode"]
            .as_object_mut()
            .unwrap()
            .remove("pois");

        let err = parse_regeocode(&response, &Coordinate::new(113.123456, 23.123456)).unwrap_err();
        match err {
            EtlError::ParseError { key, field } => {
                assert_eq!(key, "113.123456,23.123456");
                assert_eq!(field, POIS_POINTER);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_regeocode_is_parse_error() {
        let err = parse_regeocode(&json!({"status": "1"}), &Coordinate::new(1.0, 2.0)).unwrap_err();
        assert!(matches!(err, EtlError::ParseError { .. }));
    }
}
