use super::measurement::Measurement;
use super::normalizer::{FactorSource, Normalizer};
use super::profile::{numeric, NutrientProfile};
use super::risk::GlucoseRisk;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNKNOWN_FOOD_NAME: &str = "알수없음";

/// Best match returned by the food matcher, or a descriptor built from a
/// barcode lookup. Every field is optional and read leniently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchedFood {
    pub id: Option<Value>,
    pub food_code: Option<String>,
    pub food_name: Option<String>,
    pub serving_size: Option<String>,
    pub serving_size_unit: Option<String>,
    pub serving_size_value: Option<f64>,
    pub product_weight: Option<String>,
    pub product_weight_unit: Option<String>,
    pub product_weight_value: Option<f64>,
    pub score: Option<f64>,
}

impl MatchedFood {
    /// Reads a descriptor object. Wrongly typed fields are treated as absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let field = |key: &str| obj.get(key).filter(|v| !v.is_null());

        Some(Self {
            id: field("id").cloned(),
            food_code: field("food_code").and_then(text),
            food_name: field("food_name").and_then(text),
            serving_size: field("serving_size").and_then(text),
            serving_size_unit: field("serving_size_unit").and_then(text),
            serving_size_value: field("serving_size_value").and_then(numeric),
            product_weight: field("product_weight").and_then(text),
            product_weight_unit: field("product_weight_unit").and_then(text),
            product_weight_value: field("product_weight_value").and_then(numeric),
            // 匹配分數保留四位小數
            score: field("score")
                .and_then(numeric)
                .map(|s| (s * 10_000.0).round() / 10_000.0),
        })
    }

    pub fn serving_measurement(&self) -> Option<Measurement> {
        Measurement::parse(
            self.serving_size_value,
            self.serving_size_unit.as_deref(),
            self.serving_size.as_deref(),
        )
    }

    pub fn product_measurement(&self) -> Option<Measurement> {
        Measurement::parse(
            self.product_weight_value,
            self.product_weight_unit.as_deref(),
            self.product_weight.as_deref(),
        )
    }
}

/// Strings as-is, numbers stringified (raw sizes like `100` come through as numbers).
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Factor from an earlier pass: `glucoseRisk.portion_factor`, else
/// `portionFactor`, when numeric.
pub fn explicit_factor(payload: &Value) -> Option<f64> {
    payload
        .get("glucoseRisk")
        .and_then(|risk| risk.get("portion_factor"))
        .and_then(numeric)
        .or_else(|| payload.get("portionFactor").and_then(numeric))
}

/// A food-identification result, before and after enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodAnalysis {
    pub food_name: String,
    pub confidence: Option<f64>,
    pub matched_food: Option<MatchedFood>,
    /// Label values exactly as matched.
    pub nutrients: NutrientProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaled_nutrients: Option<NutrientProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portion_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor_source: Option<FactorSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glucose_risk: Option<GlucoseRisk>,
    #[serde(skip)]
    previous_factor: Option<f64>,
}

impl FoodAnalysis {
    pub fn from_payload(payload: &Value) -> Self {
        let food_name = payload
            .get("foodName")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNKNOWN_FOOD_NAME)
            .to_string();

        Self {
            food_name,
            confidence: payload.get("confidence").and_then(numeric),
            matched_food: payload.get("matchedFood").and_then(MatchedFood::from_value),
            nutrients: payload
                .get("nutrients")
                .map(NutrientProfile::from_value)
                .unwrap_or_default(),
            scaled_nutrients: None,
            portion_factor: None,
            factor_source: None,
            glucose_risk: None,
            previous_factor: explicit_factor(payload),
        }
    }

    /// Attaches scaled nutrients with the factor that produced them and,
    /// when assessable, `glucoseRisk`.
    /// Results without nutrients are returned untouched.
    pub fn enrich(mut self, normalizer: &Normalizer) -> Self {
        if self.nutrients.is_empty() {
            return self;
        }

        let serving = self.matched_food.as_ref().and_then(MatchedFood::serving_measurement);
        let product = self.matched_food.as_ref().and_then(MatchedFood::product_measurement);

        let normalized = normalizer.normalize(
            &self.nutrients,
            self.previous_factor,
            serving.as_ref(),
            product.as_ref(),
        );

        self.glucose_risk = normalized.glucose_risk();
        self.portion_factor = Some(normalized.factor_used);
        self.factor_source = Some(normalized.factor_source);
        self.scaled_nutrients = Some(normalized.nutrients);
        self
    }
}
