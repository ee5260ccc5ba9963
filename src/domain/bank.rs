//! 八大銀行 POI 分類
//!
//! POI codes (AMap `poitype`):
//! 160101 中国人民银行 | 160102 国家开发银行 | 160103 中国进出口银行 | 160104 中国银行
//! 160105 中国工商银行 | 160106 中国建设银行 | 160107 中国农业银行 | 160108 交通银行

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BankCategory {
    PeoplesBank,
    DevelopmentBank,
    ExportImportBank,
    BankOfChina,
    Icbc,
    ConstructionBank,
    AgriculturalBank,
    Communications,
}

impl BankCategory {
    pub const ALL: [BankCategory; 8] = [
        BankCategory::PeoplesBank,
        BankCategory::DevelopmentBank,
        BankCategory::ExportImportBank,
        BankCategory::BankOfChina,
        BankCategory::Icbc,
        BankCategory::ConstructionBank,
        BankCategory::AgriculturalBank,
        BankCategory::Communications,
    ];

    /// Column prefix in the result table.
    pub fn key(&self) -> &'static str {
        match self {
            BankCategory::PeoplesBank => "pbc",
            BankCategory::DevelopmentBank => "cdb",
            BankCategory::ExportImportBank => "eib",
            BankCategory::BankOfChina => "bc",
            BankCategory::Icbc => "icbc",
            BankCategory::ConstructionBank => "ccb",
            BankCategory::AgriculturalBank => "abc",
            BankCategory::Communications => "bcomu",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BankCategory::PeoplesBank => "中国人民银行",
            BankCategory::DevelopmentBank => "国家开发银行",
            BankCategory::ExportImportBank => "中国进出口银行",
            BankCategory::BankOfChina => "中国银行",
            BankCategory::Icbc => "中国工商银行",
            BankCategory::ConstructionBank => "中国建设银行",
            BankCategory::AgriculturalBank => "中国农业银行",
            BankCategory::Communications => "交通银行",
        }
    }

    pub fn poi_code(&self) -> &'static str {
        match self {
            BankCategory::PeoplesBank => "160101",
            BankCategory::DevelopmentBank => "160102",
            BankCategory::ExportImportBank => "160103",
            BankCategory::BankOfChina => "160104",
            BankCategory::Icbc => "160105",
            BankCategory::ConstructionBank => "160106",
            BankCategory::AgriculturalBank => "160107",
            BankCategory::Communications => "160108",
        }
    }

    /// Exact match on the type label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.label() == label)
    }

    /// POI `type` looks like `金融保险服务;银行;中国银行`; the third segment is the label.
    pub fn from_poi_type(poi_type: &str) -> Option<Self> {
        poi_type.split(';').nth(2).and_then(Self::from_label)
    }

    /// `poitype` request parameter for all eight categories.
    pub fn poitype_param() -> String {
        Self::ALL
            .iter()
            .map(BankCategory::poi_code)
            .collect::<Vec<_>>()
            .join("|")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTally {
    pub num: usize,
    pub extra: Vec<Value>,
}

/// Per-category counts plus the full POI sub-records.
#[derive(Debug, Clone, PartialEq)]
pub struct BankSummary {
    // 依 BankCategory::ALL 的順序
    tallies: Vec<CategoryTally>,
    unclassified: usize,
}

impl BankSummary {
    pub fn tally(&self, category: BankCategory) -> &CategoryTally {
        &self.tallies[category as usize]
    }

    pub fn unclassified(&self) -> usize {
        self.unclassified
    }

    /// `{ "pbc": {"num": .., "extra": [..]}, ... }` in fixed category order.
    pub fn into_fields(self) -> Map<String, Value> {
        BankCategory::ALL
            .into_iter()
            .zip(self.tallies)
            .map(|(category, tally)| {
                (
                    category.key().to_string(),
                    json!({ "num": tally.num, "extra": tally.extra }),
                )
            })
            .collect()
    }
}

pub fn classify_pois(pois: &[Value]) -> BankSummary {
    let mut tallies = vec![CategoryTally::default(); BankCategory::ALL.len()];
    let mut unclassified = 0;

    for poi in pois {
        let category = poi
            .get("type")
            .and_then(Value::as_str)
            .and_then(BankCategory::from_poi_type);

        match category {
            Some(category) => {
                let tally = &mut tallies[category as usize];
                tally.num += 1;
                tally.extra.push(poi.clone());
            }
            None => {
                tracing::debug!("Unclassified POI type: {:?}", poi.get("type"));
                unclassified += 1;
            }
        }
    }

    BankSummary {
        tallies,
        unclassified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_label_maps_to_exactly_one_category() {
        for category in BankCategory::ALL {
            let matches: Vec<_> = BankCategory::ALL
                .into_iter()
                .filter(|c| BankCategory::from_label(category.label()) == Some(*c))
                .collect();
            assert_eq!(matches, vec![category]);
        }
    }

    #[test]
    fn test_label_is_third_segment() {
        assert_eq!(
            BankCategory::from_poi_type("金融保险服务;银行;中国银行"),
            Some(BankCategory::BankOfChina)
        );
        assert_eq!(
            BankCategory::from_poi_type("a;b;交通银行;营业厅"),
            Some(BankCategory::Communications)
        );
        assert_eq!(BankCategory::from_poi_type("金融保险服务;银行"), None);
        // 不可部分比對
        assert_eq!(BankCategory::from_poi_type("a;b;中国银行股份"), None);
    }

    #[test]
    fn test_poitype_param() {
        assert_eq!(
            BankCategory::poitype_param(),
            "160101|160102|160103|160104|160105|160106|160107|160108"
        );
    }

    #[test]
    fn test_classify_counts_and_keeps_records() {
        let pois = vec![
            json!({"name": "中国银行广州分行", "type": "金融保险服务;银行;中国银行"}),
            json!({"name": "工行", "type": "金融保险服务;银行;中国工商银行"}),
            json!({"name": "中行支行", "type": "金融保险服务;银行;中国银行"}),
            json!({"name": "招商银行", "type": "金融保险服务;银行;招商银行"}),
            json!({"name": "no type"}),
        ];

        let summary = classify_pois(&pois);

        assert_eq!(summary.tally(BankCategory::BankOfChina).num, 2);
        assert_eq!(summary.tally(BankCategory::BankOfChina).extra[1]["name"], "中行支行");
        assert_eq!(summary.tally(BankCategory::Icbc).num, 1);
        assert_eq!(summary.tally(BankCategory::PeoplesBank).num, 0);
        assert_eq!(summary.unclassified(), 2);

        let total: usize = BankCategory::ALL.iter().map(|c| summary.tally(*c).num).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_into_fields_order() {
        let fields = classify_pois(&[]).into_fields();
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["pbc", "cdb", "eib", "bc", "icbc", "ccb", "abc", "bcomu"]);
        assert_eq!(fields["bc"], json!({"num": 0, "extra": []}));
    }
}
