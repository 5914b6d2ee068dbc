use anyhow::Result;
use nutrition_etl::{EtlEngine, LocalStorage, NormalizationPipeline, TomlConfig};
use serde_json::{json, Value};
use tempfile::TempDir;

fn write_config(dir: &str, kind: &str, formats: &str) -> Result<TomlConfig> {
    let content = format!(
        r#"
[pipeline]
name = "integration"
description = "End-to-end normalization"
version = "1.0.0"

[source]
input_path = "{dir}/input.json"
kind = "{kind}"

[load]
output_path = "{dir}/output"
output_formats = {formats}
"#
    );
    let path = format!("{}/normalize.toml", dir);
    std::fs::write(&path, content)?;
    Ok(TomlConfig::from_file(&path)?)
}

fn read_json(path: &std::path::Path) -> Result<Value> {
    Ok(serde_json::from_slice(&std::fs::read(path)?)?)
}

/// 食物辨識結果：依份量換算後評估血糖風險
#[tokio::test]
async fn test_end_to_end_analysis_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path().to_str().unwrap().replace('\\', "/");

    let payloads = json!([
        {
            "foodName": "김밥",
            "confidence": 0.91,
            "matchedFood": {
                "id": 7,
                "food_code": "D101",
                "food_name": "김밥",
                "serving_size_value": 100,
                "serving_size_unit": "g",
                "product_weight": "250g",
                "score": 0.8
            },
            "nutrients": {
                "carbohydrate_g": 20,
                "sugars_g": 10,
                "protein_g": 5,
                "fat_g": 2,
                "dietary_fiber_g": 2
            }
        },
        {
            "foodName": "콜라",
            "matchedFood": {"serving_size": "100g", "product_weight": "355ml"},
            "nutrients": {"carbohydrate_g": 11, "sugars_g": 11}
        },
        {"foodName": "테스트 샘플", "nutrients": {}}
    ]);
    std::fs::write(format!("{}/input.json", dir), serde_json::to_vec(&payloads)?)?;

    let config = write_config(&dir, "analysis", r#"["json", "csv"]"#)?;
    let pipeline = NormalizationPipeline::new(LocalStorage::new(".".to_string()), config);
    let summary = EtlEngine::new(pipeline).run().await?;

    assert_eq!(summary.extracted, 3);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.unassessed, 1);
    assert_eq!(summary.rejected, 0);

    let output = temp_dir.path().join("output");
    let results = read_json(&output.join("results.json"))?;
    let results = results.as_array().unwrap();

    assert_eq!(results[0]["glucoseRisk"]["portion_factor"], 2.5);
    assert_eq!(results[0]["portionFactor"], 2.5);
    assert_eq!(results[0]["factorSource"], "measured");
    assert_eq!(results[0]["glucoseRisk"]["score"], 57.1);
    assert_eq!(results[0]["glucoseRisk"]["level"], "medium");
    assert_eq!(results[0]["nutrients"]["carbohydrate_g"], 20);

    // g 與 ml 不換算，維持標示值
    assert_eq!(results[1]["glucoseRisk"]["portion_factor"], 1.0);
    assert_eq!(results[1]["scaledNutrients"]["carbohydrate_g"], 11);

    assert!(results[2].get("glucoseRisk").is_none());

    let csv = std::fs::read_to_string(output.join("results.csv"))?;
    assert!(csv.starts_with("food_name,portion_factor"));
    assert!(csv.contains("김밥,2.5,,50.0,25.0,12.5,5.0,medium,57.1,보통"));
    assert!(!output.join("results.tsv").exists());

    let unassessed = read_json(&output.join("unassessed.json"))?;
    assert_eq!(unassessed[0]["foodName"], "테스트 샘플");

    Ok(())
}

#[tokio::test]
async fn test_end_to_end_meal_run_keeps_going_on_bad_records() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path().to_str().unwrap().replace('\\', "/");

    let payloads = json!([
        {
            "source": "photo",
            "recorded_at": "2025-11-26",
            "food_name": "비빔밥",
            "glucose_risk_level": "HIGH",
            "raw_payload": {
                "matchedFood": {"serving_size": "200g", "product_weight": "400g"},
                "nutrients": {"energy_kcal": 300, "carbohydrate_g": 45, "protein_g": 9, "fat_g": 6}
            }
        },
        {"source": "upload", "food_name": "?"},
        {"source": "qr", "recorded_at": "2025-11-26", "energy_kcal": 120}
    ]);
    std::fs::write(format!("{}/input.json", dir), serde_json::to_vec(&payloads)?)?;

    let config = write_config(&dir, "meal", r#"["json", "tsv"]"#)?;
    let pipeline = NormalizationPipeline::new(LocalStorage::new(".".to_string()), config);
    let summary = EtlEngine::new(pipeline).run().await?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.rejected, 1);

    let output = temp_dir.path().join("output");
    let results = read_json(&output.join("results.json"))?;

    assert_eq!(results[0]["portion_factor"], 2.0);
    assert_eq!(results[0]["energy_kcal"], 600.0);
    assert_eq!(results[0]["carbohydrate_g"], 90.0);
    assert_eq!(results[0]["glucose_risk_level"], "high");
    assert_eq!(results[1]["energy_kcal"], 120.0);
    assert!(results[1]["portion_factor"].is_null());

    let rejected = read_json(&output.join("rejected.json"))?;
    assert_eq!(rejected[0]["source"], "upload");
    assert!(rejected[0]["error"].as_str().unwrap().contains("source"));

    let tsv = std::fs::read_to_string(output.join("results.tsv"))?;
    assert_eq!(tsv.lines().count(), 3);

    Ok(())
}

#[tokio::test]
async fn test_missing_input_file_fails_the_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path().to_str().unwrap().replace('\\', "/");

    let config = write_config(&dir, "qr", r#"["json"]"#)?;
    let pipeline = NormalizationPipeline::new(LocalStorage::new(".".to_string()), config);
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();

    assert!(matches!(err, nutrition_etl::EtlError::IoError(_)));
    assert!(!temp_dir.path().join("output").exists());

    Ok(())
}
