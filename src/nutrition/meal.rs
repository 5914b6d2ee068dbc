use super::food::{explicit_factor, MatchedFood};
use super::normalizer::{FactorSource, Normalizer};
use super::profile::{numeric, NutrientProfile};
use super::risk::RiskLabel;
use super::vocabulary::NutrientKey;
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const MAX_FOOD_NAME_CHARS: usize = 255;
const MAX_RISK_LEVEL_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSource {
    Photo,
    Qr,
}

/// The five nutrient columns stored per meal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealNutrients {
    pub energy_kcal: Option<f64>,
    pub carbohydrate_g: Option<f64>,
    pub sugars_g: Option<f64>,
    pub protein_g: Option<f64>,
    pub fat_g: Option<f64>,
}

impl MealNutrients {
    fn from_profile(profile: &NutrientProfile) -> Self {
        Self {
            energy_kcal: profile.amount_of(NutrientKey::EnergyKcal),
            carbohydrate_g: profile.amount_of(NutrientKey::CarbohydrateG),
            sugars_g: profile.amount_of(NutrientKey::SugarsG),
            protein_g: profile.amount_of(NutrientKey::ProteinG),
            fat_g: profile.amount_of(NutrientKey::FatG),
        }
    }

    /// Field-wise `self.or(fallback)`.
    fn or(self, fallback: MealNutrients) -> Self {
        Self {
            energy_kcal: self.energy_kcal.or(fallback.energy_kcal),
            carbohydrate_g: self.carbohydrate_g.or(fallback.carbohydrate_g),
            sugars_g: self.sugars_g.or(fallback.sugars_g),
            protein_g: self.protein_g.or(fallback.protein_g),
            fat_g: self.fat_g.or(fallback.fat_g),
        }
    }
}

/// A meal submitted by the client, after contract checks.
#[derive(Debug, Clone, PartialEq)]
pub struct MealRecordInput {
    pub recorded_at: Option<NaiveDate>,
    pub source: MealSource,
    pub food_name: Option<String>,
    pub matched_food_id: Option<i64>,
    pub nutrients: MealNutrients,
    pub glucose_risk_level: Option<String>,
    pub glucose_risk_score: Option<f64>,
    pub raw_payload: Option<Map<String, Value>>,
}

impl MealRecordInput {
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let obj = payload
            .as_object()
            .ok_or_else(|| invalid("payload", "meal record must be a JSON object"))?;
        let field = |key: &str| obj.get(key).filter(|v| !v.is_null());

        let recorded_at = field("recorded_at").map(parse_date).transpose()?;

        let source = match field("source").map(|v| v.as_str()) {
            Some(Some("photo")) => MealSource::Photo,
            Some(Some("qr")) => MealSource::Qr,
            Some(_) => return Err(invalid("source", "must be one of: photo, qr")),
            None => return Err(invalid("source", "is required")),
        };

        let food_name = field("food_name")
            .map(|v| bounded_string("food_name", v, MAX_FOOD_NAME_CHARS))
            .transpose()?;

        let matched_food_id = field("matched_food_id")
            .map(|v| {
                v.as_i64()
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
                    .ok_or_else(|| invalid("matched_food_id", "must be an integer"))
            })
            .transpose()?;

        let number = |key: &str| -> Result<Option<f64>> {
            field(key)
                .map(|v| numeric(v).ok_or_else(|| invalid(key, "must be numeric")))
                .transpose()
        };

        let nutrients = MealNutrients {
            energy_kcal: number("energy_kcal")?,
            carbohydrate_g: number("carbohydrate_g")?,
            sugars_g: number("sugars_g")?,
            protein_g: number("protein_g")?,
            fat_g: number("fat_g")?,
        };

        let glucose_risk_level = field("glucose_risk_level")
            .map(|v| bounded_string("glucose_risk_level", v, MAX_RISK_LEVEL_CHARS))
            .transpose()?;
        let glucose_risk_score = number("glucose_risk_score")?;

        let raw_payload = field("raw_payload")
            .map(|v| {
                v.as_object()
                    .cloned()
                    .ok_or_else(|| invalid("raw_payload", "must be an object"))
            })
            .transpose()?;

        Ok(Self {
            recorded_at,
            source,
            food_name,
            matched_food_id,
            nutrients,
            glucose_risk_level,
            glucose_risk_score,
            raw_payload,
        })
    }
}

/// A meal ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub recorded_at: NaiveDate,
    pub source: MealSource,
    pub food_name: Option<String>,
    pub matched_food_id: Option<i64>,
    #[serde(flatten)]
    pub nutrients: MealNutrients,
    pub glucose_risk_level: Option<RiskLabel>,
    pub glucose_risk_score: Option<f64>,
    /// Factor applied to `raw_payload` nutrients, for auditing.
    pub portion_factor: Option<f64>,
    pub factor_source: Option<FactorSource>,
    pub raw_payload: Option<Map<String, Value>>,
}

impl MealRecord {
    /// Nutrients re-derived from `raw_payload` win over submitted values,
    /// column by column. Submitted risk fields win over the derived ones.
    pub fn build(input: MealRecordInput, today: NaiveDate, normalizer: &Normalizer) -> Self {
        let normalized = input.raw_payload.as_ref().and_then(|raw| {
            let nutrients = raw.get("nutrients").filter(|n| n.is_object())?;
            let payload = Value::Object(raw.clone());
            let matched = raw.get("matchedFood").and_then(MatchedFood::from_value);
            let serving = matched.as_ref().and_then(MatchedFood::serving_measurement);
            let product = matched.as_ref().and_then(MatchedFood::product_measurement);

            Some(normalizer.normalize(
                &NutrientProfile::from_value(nutrients),
                explicit_factor(&payload),
                serving.as_ref(),
                product.as_ref(),
            ))
        });

        let (nutrients, portion_factor, factor_source, derived_risk) = match normalized {
            Some(n) => (
                MealNutrients::from_profile(&n.nutrients).or(input.nutrients),
                Some(n.factor_used),
                Some(n.factor_source),
                n.risk,
            ),
            None => (input.nutrients, None, None, None),
        };

        let glucose_risk_level = input
            .glucose_risk_level
            .as_deref()
            .and_then(RiskLabel::normalize)
            .or_else(|| derived_risk.as_ref().map(|r| RiskLabel::Level(r.level)));
        let glucose_risk_score = input
            .glucose_risk_score
            .or_else(|| derived_risk.as_ref().map(|r| r.score));

        Self {
            recorded_at: input.recorded_at.unwrap_or(today),
            source: input.source,
            food_name: input.food_name,
            matched_food_id: input.matched_food_id,
            nutrients,
            glucose_risk_level,
            glucose_risk_score,
            portion_factor,
            factor_source,
            raw_payload: input.raw_payload,
        }
    }
}

fn parse_date(value: &Value) -> Result<NaiveDate> {
    let text = value
        .as_str()
        .ok_or_else(|| invalid("recorded_at", "must be a date string"))?
        .trim();

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.date_naive()))
        .map_err(|_| invalid("recorded_at", &format!("invalid date '{}'", text)))
}

fn bounded_string(field: &str, value: &Value, max_chars: usize) -> Result<String> {
    let text = value
        .as_str()
        .ok_or_else(|| invalid(field, "must be a string"))?;
    if text.chars().count() > max_chars {
        return Err(invalid(
            field,
            &format!("must not exceed {} characters", max_chars),
        ));
    }
    Ok(text.to_string())
}

fn invalid(field: &str, message: &str) -> EtlError {
    EtlError::ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    }
}
