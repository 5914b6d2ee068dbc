use crate::core::{
    ConfigProvider, Pipeline, Record, RecordKind, Storage, SummaryRow, TransformResult,
};
use crate::nutrition::meal::{MealRecord, MealRecordInput};
use crate::nutrition::qr::{extract_code, QrLookup};
use crate::nutrition::risk::RiskLabel;
use crate::nutrition::{FoodAnalysis, NutrientKey, NutrientProfile, Normalizer, RiskLevel};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use serde_json::Value;

const SUMMARY_HEADERS: [&str; 10] = [
    "food_name",
    "portion_factor",
    "energy_kcal",
    "carbohydrate_g",
    "sugars_g",
    "protein_g",
    "fat_g",
    "risk_level",
    "risk_score",
    "risk_label",
];

/// Reads raw food payloads, normalizes them and writes the results.
pub struct NormalizationPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    normalizer: Normalizer,
    today: NaiveDate,
}

/// Outcome of a single record.
enum Processed {
    Done {
        output: Value,
        summary: SummaryRow,
        assessed: bool,
    },
    Rejected(EtlError),
}

impl<S: Storage, C: ConfigProvider> NormalizationPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let normalizer = Normalizer::new(config.min_factor());
        Self {
            storage,
            config,
            normalizer,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Fixes the date used for meals submitted without `recorded_at`.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn output_file(&self, name: &str) -> String {
        format!("{}/{}", self.config.output_path().trim_end_matches('/'), name)
    }

    fn process(&self, payload: Value) -> Result<Processed> {
        match self.config.record_kind() {
            RecordKind::Analysis => {
                let analysis = FoodAnalysis::from_payload(&payload).enrich(&self.normalizer);
                let nutrients = analysis
                    .scaled_nutrients
                    .as_ref()
                    .unwrap_or(&analysis.nutrients);
                let risk = analysis.glucose_risk.as_ref();

                let summary = summary_row(
                    &analysis.food_name,
                    analysis.portion_factor,
                    nutrients,
                    risk.map(|r| r.assessment.level),
                    risk.map(|r| r.assessment.score),
                );

                Ok(Processed::Done {
                    assessed: risk.is_some(),
                    output: serde_json::to_value(&analysis)?,
                    summary,
                })
            }
            RecordKind::Meal => {
                let input = match MealRecordInput::from_payload(&payload) {
                    Ok(input) => input,
                    Err(e) => return Ok(Processed::Rejected(e)),
                };
                let record = MealRecord::build(input, self.today, &self.normalizer);

                let summary = SummaryRow {
                    food_name: record.food_name.clone().unwrap_or_default(),
                    portion_factor: record.portion_factor,
                    energy_kcal: record.nutrients.energy_kcal,
                    carbohydrate_g: record.nutrients.carbohydrate_g,
                    sugars_g: record.nutrients.sugars_g,
                    protein_g: record.nutrients.protein_g,
                    fat_g: record.nutrients.fat_g,
                    risk_level: record.glucose_risk_level.as_ref().map(|l| l.as_str().to_string()),
                    risk_score: record.glucose_risk_score,
                    risk_label: match &record.glucose_risk_level {
                        Some(RiskLabel::Level(level)) => Some(level.display_label().to_string()),
                        _ => None,
                    },
                };

                Ok(Processed::Done {
                    assessed: record.glucose_risk_level.is_some(),
                    output: serde_json::to_value(&record)?,
                    summary,
                })
            }
            RecordKind::Qr => {
                let lookup = match QrLookup::from_response(&payload) {
                    Ok(lookup) => lookup,
                    Err(e) => return Ok(Processed::Rejected(e)),
                };
                let risk = lookup.glucose_risk.as_ref();

                let summary = summary_row(
                    lookup.product.name.as_deref().unwrap_or_default(),
                    risk.map(|r| r.portion_factor),
                    &lookup.nutrients,
                    risk.map(|r| r.assessment.level),
                    risk.map(|r| r.assessment.score),
                );

                let mut output = serde_json::to_value(&lookup)?;
                // 存餐點時 raw_payload 需要 matchedFood 才能換算份量
                if let Value::Object(obj) = &mut output {
                    let matched = serde_json::to_value(lookup.matched_food())?;
                    obj.insert("matchedFood".to_string(), matched);
                }
                // 掃描內容中的條碼 (barcode 或 qrData)
                let scanned = payload
                    .get("barcode")
                    .or_else(|| payload.get("qrData"))
                    .and_then(Value::as_str)
                    .map(extract_code)
                    .filter(|code| !code.is_empty());
                if let (Some(code), Value::Object(obj)) = (scanned, &mut output) {
                    obj.insert("lookupCode".to_string(), Value::String(code));
                }

                Ok(Processed::Done {
                    assessed: risk.is_some(),
                    output,
                    summary,
                })
            }
        }
    }
}

fn summary_row(
    food_name: &str,
    portion_factor: Option<f64>,
    nutrients: &NutrientProfile,
    risk_level: Option<RiskLevel>,
    risk_score: Option<f64>,
) -> SummaryRow {
    SummaryRow {
        food_name: food_name.to_string(),
        portion_factor,
        energy_kcal: nutrients.amount_of(NutrientKey::EnergyKcal),
        carbohydrate_g: nutrients.amount_of(NutrientKey::CarbohydrateG),
        sugars_g: nutrients.amount_of(NutrientKey::SugarsG),
        protein_g: nutrients.amount_of(NutrientKey::ProteinG),
        fat_g: nutrients.amount_of(NutrientKey::FatG),
        risk_level: risk_level.map(|level| level.as_str().to_string()),
        risk_score,
        risk_label: risk_level.map(|level| level.display_label().to_string()),
    }
}

fn render_summary(rows: &[SummaryRow], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(SUMMARY_HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("summary is not valid UTF-8: {}", e),
    })
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for NormalizationPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        tracing::debug!("Reading payloads from: {}", self.config.input_path());
        let raw = self.storage.read_file(self.config.input_path()).await?;
        let json_data: Value = serde_json::from_slice(&raw)?;

        // 單一物件視為只有一筆
        let records = match json_data {
            Value::Array(items) => {
                let stray = items.iter().enumerate().find(|(_, v)| !v.is_object());
                if let Some((index, item)) = stray {
                    return Err(EtlError::ProcessingError {
                        message: format!(
                            "payload #{} in {} is {}, expected an object",
                            index,
                            self.config.input_path(),
                            json_kind(item)
                        ),
                    });
                }
                items.into_iter().map(Record::from_value).collect()
            }
            Value::Object(_) => vec![Record::from_value(json_data)],
            other => {
                return Err(EtlError::ProcessingError {
                    message: format!(
                        "expected a JSON array or object in {}, found {}",
                        self.config.input_path(),
                        json_kind(&other)
                    ),
                })
            }
        };

        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let mut result = TransformResult::default();

        for (index, record) in data.into_iter().enumerate() {
            match self.process(record.to_value())? {
                Processed::Done {
                    output,
                    summary,
                    assessed,
                } => {
                    let processed = Record::from_value(output);
                    if !assessed {
                        tracing::debug!("Record #{} has no glucose risk assessment", index);
                        result.unassessed_records.push(processed.clone());
                    }
                    result.summary_rows.push(summary);
                    result.processed_records.push(processed);
                }
                Processed::Rejected(e) => {
                    tracing::warn!("Rejected record #{}: {}", index, e);
                    let mut rejected = record;
                    rejected
                        .data
                        .insert("error".to_string(), Value::String(e.to_string()));
                    result.rejected_records.push(rejected);
                }
            }
        }

        result.csv_output = render_summary(&result.summary_rows, b',')?;
        result.tsv_output = render_summary(&result.summary_rows, b'\t')?;

        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        for format in self.config.output_formats() {
            let (name, data) = match format.as_str() {
                "json" => (
                    "results.json",
                    serde_json::to_vec_pretty(&result.processed_records)?,
                ),
                "csv" => ("results.csv", result.csv_output.as_bytes().to_vec()),
                "tsv" => ("results.tsv", result.tsv_output.as_bytes().to_vec()),
                other => {
                    tracing::warn!("Skipping unsupported output format: {}", other);
                    continue;
                }
            };

            let path = self.output_file(name);
            tracing::debug!("Writing {} ({} bytes)", path, data.len());
            self.storage.write_file(&path, &data).await?;
        }

        if !result.unassessed_records.is_empty() {
            let data = serde_json::to_vec_pretty(&result.unassessed_records)?;
            self.storage
                .write_file(&self.output_file("unassessed.json"), &data)
                .await?;
        }

        if !result.rejected_records.is_empty() {
            let data = serde_json::to_vec_pretty(&result.rejected_records)?;
            self.storage
                .write_file(&self.output_file("rejected.json"), &data)
                .await?;
        }

        Ok(self.config.output_path().to_string())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
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

        async fn put_json(&self, path: &str, value: &Value) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), serde_json::to_vec(value).unwrap());
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

    struct MockConfig {
        kind: RecordKind,
        formats: Vec<String>,
        min_factor: Option<f64>,
    }

    impl MockConfig {
        fn new(kind: RecordKind) -> Self {
            Self {
                kind,
                formats: vec!["json".to_string(), "csv".to_string(), "tsv".to_string()],
                min_factor: Some(0.1),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            "input.json"
        }

        fn output_path(&self) -> &str {
            "out"
        }

        fn record_kind(&self) -> RecordKind {
            self.kind
        }

        fn output_formats(&self) -> &[String] {
            &self.formats
        }

        fn min_factor(&self) -> Option<f64> {
            self.min_factor
        }
    }

    fn analysis_payloads() -> Value {
        json!([
            {
                "foodName": "김밥",
                "matchedFood": {"serving_size": "100g", "product_weight": "250g"},
                "nutrients": {
                    "carbohydrate_g": 20,
                    "sugars_g": 10,
                    "protein_g": 5,
                    "fat_g": 2,
                    "dietary_fiber_g": 2
                }
            },
            {
                "foodName": "물",
                "nutrients": {"sodium_mg": 3}
            }
        ])
    }

    #[tokio::test]
    async fn test_extract_array_and_single_object() {
        let storage = MockStorage::new();
        storage.put_json("input.json", &analysis_payloads()).await;
        let pipeline =
            NormalizationPipeline::new(storage.clone(), MockConfig::new(RecordKind::Analysis));
        assert_eq!(pipeline.extract().await.unwrap().len(), 2);

        storage.put_json("input.json", &json!({"foodName": "김밥"})).await;
        let records = pipeline.extract().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data["foodName"], "김밥");
    }

    #[tokio::test]
    async fn test_extract_rejects_scalar_documents() {
        let storage = MockStorage::new();
        storage.put_json("input.json", &json!("not a payload")).await;
        let pipeline = NormalizationPipeline::new(storage, MockConfig::new(RecordKind::Analysis));

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::ProcessingError { .. }));
    }

    #[tokio::test]
    async fn test_extract_rejects_non_object_elements() {
        let storage = MockStorage::new();
        storage
            .put_json("input.json", &json!([{"source": "photo"}, "photo", 3]))
            .await;
        let pipeline = NormalizationPipeline::new(storage, MockConfig::new(RecordKind::Meal));

        match pipeline.extract().await {
            Err(EtlError::ProcessingError { message }) => {
                assert!(message.contains("#1"), "{message}");
                assert!(message.contains("a string"), "{message}");
            }
            other => panic!("unexpected extract result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_missing_file() {
        let pipeline =
            NormalizationPipeline::new(MockStorage::new(), MockConfig::new(RecordKind::Analysis));
        assert!(matches!(pipeline.extract().await, Err(EtlError::IoError(_))));
    }

    #[tokio::test]
    async fn test_transform_analysis_records() {
        let records = match analysis_payloads() {
            Value::Array(items) => items.into_iter().map(Record::from_value).collect(),
            _ => unreachable!(),
        };
        let pipeline =
            NormalizationPipeline::new(MockStorage::new(), MockConfig::new(RecordKind::Analysis));

        let result = pipeline.transform(records).await.unwrap();

        assert_eq!(result.processed_records.len(), 2);
        assert_eq!(result.unassessed_records.len(), 1);
        assert!(result.rejected_records.is_empty());

        let first = &result.processed_records[0].data;
        assert_eq!(first["glucoseRisk"]["portion_factor"], 2.5);
        assert_eq!(first["glucoseRisk"]["level"], "medium");
        assert_eq!(first["scaledNutrients"]["carbohydrate_g"], 50.0);

        let csv_lines: Vec<&str> = result.csv_output.lines().collect();
        assert_eq!(csv_lines.len(), 3);
        assert_eq!(
            csv_lines[0],
            concat!(
                "food_name,portion_factor,energy_kcal,carbohydrate_g,sugars_g,",
                "protein_g,fat_g,risk_level,risk_score,risk_label"
            )
        );
        assert_eq!(csv_lines[1], "김밥,2.5,,50.0,25.0,12.5,5.0,medium,57.1,보통");
        assert_eq!(csv_lines[2], "물,1.0,,,,,,,,");

        let tsv_lines: Vec<&str> = result.tsv_output.lines().collect();
        assert_eq!(tsv_lines[1], "김밥\t2.5\t\t50.0\t25.0\t12.5\t5.0\tmedium\t57.1\t보통");
    }

    #[tokio::test]
    async fn test_transform_reports_factor_for_unassessed_records() {
        let records = vec![Record::from_value(json!({
            "foodName": "에너지바",
            "matchedFood": {"serving_size": "100g", "product_weight": "250g"},
            "nutrients": {"energy_kcal": 100}
        }))];
        let pipeline =
            NormalizationPipeline::new(MockStorage::new(), MockConfig::new(RecordKind::Analysis));

        let result = pipeline.transform(records).await.unwrap();

        assert_eq!(result.unassessed_records.len(), 1);
        let output = &result.processed_records[0].data;
        assert!(output.get("glucoseRisk").is_none());
        assert_eq!(output["scaledNutrients"]["energy_kcal"], 250.0);
        assert_eq!(output["portionFactor"], 2.5);
        assert_eq!(output["factorSource"], "measured");

        let csv_lines: Vec<&str> = result.csv_output.lines().collect();
        assert_eq!(csv_lines[1], "에너지바,2.5,250.0,,,,,,,");
    }

    #[tokio::test]
    async fn test_transform_meal_records_rejects_bad_rows() {
        let records = vec![
            Record::from_value(json!({
                "source": "photo",
                "food_name": "김밥",
                "raw_payload": analysis_payloads()[0].clone()
            })),
            Record::from_value(json!({"source": "fax"})),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 11, 26).unwrap();
        let pipeline =
            NormalizationPipeline::new(MockStorage::new(), MockConfig::new(RecordKind::Meal))
                .with_today(today);

        let result = pipeline.transform(records).await.unwrap();

        assert_eq!(result.processed_records.len(), 1);
        assert_eq!(result.rejected_records.len(), 1);
        assert!(result.rejected_records[0].data["error"]
            .as_str()
            .unwrap()
            .contains("source"));

        let meal = &result.processed_records[0].data;
        assert_eq!(meal["recorded_at"], "2025-11-26");
        assert_eq!(meal["carbohydrate_g"], 50.0);
        assert_eq!(meal["portion_factor"], 2.5);
        assert_eq!(meal["factor_source"], "measured");
        assert_eq!(meal["glucose_risk_level"], "medium");
    }

    #[tokio::test]
    async fn test_transform_qr_records() {
        let records = vec![
            Record::from_value(json!({
                "barcode": "https://foodqr.kr/p/8801234567890",
                "response": {"body": {"items": {"item": [
                    {"prdctNm": "초코바", "nirwmtNm": "탄수화물", "cta": "45"},
                    {"nirwmtNm": "당류", "cta": "30"}
                ]}}}
            })),
            Record::from_value(json!({"response": {"header": {}}})),
        ];
        let pipeline =
            NormalizationPipeline::new(MockStorage::new(), MockConfig::new(RecordKind::Qr));

        let result = pipeline.transform(records).await.unwrap();

        assert_eq!(result.processed_records.len(), 1);
        assert_eq!(result.rejected_records.len(), 1);

        let lookup = &result.processed_records[0].data;
        assert_eq!(lookup["lookupCode"], "8801234567890");
        assert_eq!(lookup["glucoseRisk"]["portion_factor"], 1.0);
        assert_eq!(lookup["glucoseRisk"]["level"], "high");
        assert_eq!(lookup["matchedFood"]["food_name"], "초코바");
    }

    #[tokio::test]
    async fn test_load_writes_configured_formats() {
        let storage = MockStorage::new();
        storage.put_json("input.json", &analysis_payloads()).await;
        let pipeline =
            NormalizationPipeline::new(storage.clone(), MockConfig::new(RecordKind::Analysis));

        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();
        let output_path = pipeline.load(result).await.unwrap();

        assert_eq!(output_path, "out");
        for name in ["results.json", "results.csv", "results.tsv", "unassessed.json"] {
            assert!(
                storage.get_file(&format!("out/{}", name)).await.is_some(),
                "{name} missing"
            );
        }
        assert!(storage.get_file("out/rejected.json").await.is_none());

        let written = storage.get_file("out/results.json").await.unwrap();
        let json: Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_load_only_json() {
        let storage = MockStorage::new();
        let mut config = MockConfig::new(RecordKind::Analysis);
        config.formats = vec!["json".to_string()];
        let pipeline = NormalizationPipeline::new(storage.clone(), config);

        pipeline.load(TransformResult::default()).await.unwrap();

        assert!(storage.get_file("out/results.json").await.is_some());
        assert!(storage.get_file("out/results.csv").await.is_none());
        assert!(storage.get_file("out/unassessed.json").await.is_none());
    }
}
