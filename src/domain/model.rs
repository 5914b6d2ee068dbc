use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(obj) => Self {
                data: obj.into_iter().collect(),
            },
            other => {
                let mut data = HashMap::new();
                data.insert("value".to_string(), other);
                Self { data }
            }
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Which payload shape the input file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Food-identification results with a matched food.
    Analysis,
    /// Meal submissions to be normalized before persistence.
    Meal,
    /// Barcode registry responses.
    Qr,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Analysis => "analysis",
            RecordKind::Meal => "meal",
            RecordKind::Qr => "qr",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "analysis" => Ok(RecordKind::Analysis),
            "meal" => Ok(RecordKind::Meal),
            "qr" => Ok(RecordKind::Qr),
            other => Err(format!(
                "unknown record kind '{}', expected one of: analysis, meal, qr",
                other
            )),
        }
    }
}

/// One CSV/TSV summary line per processed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub food_name: String,
    pub portion_factor: Option<f64>,
    pub energy_kcal: Option<f64>,
    pub carbohydrate_g: Option<f64>,
    pub sugars_g: Option<f64>,
    pub protein_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub risk_level: Option<String>,
    pub risk_score: Option<f64>,
    /// 낮음 / 보통 / 높음
    pub risk_label: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub processed_records: Vec<Record>,
    pub summary_rows: Vec<SummaryRow>,
    pub csv_output: String,
    pub tsv_output: String,
    /// Processed, but no glucose risk could be assessed.
    pub unassessed_records: Vec<Record>,
    /// Failed payload contract checks; carry an `error` field.
    pub rejected_records: Vec<Record>,
}
