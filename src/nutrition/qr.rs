use super::food::MatchedFood;
use super::profile::{numeric, NutrientProfile};
use super::risk::{assess, GlucoseRisk};
use super::vocabulary::NutrientKey;
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Product header of a barcode registry lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QrProduct {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub manufacturer: Option<String>,
    pub serving_total: Option<String>,
    pub serving_total_unit: Option<String>,
    pub serving_unit_value: Option<String>,
    pub serving_unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrLookup {
    pub product: QrProduct,
    pub nutrients: NutrientProfile,
    pub glucose_risk: Option<GlucoseRisk>,
}

impl QrLookup {
    /// Maps a registry response (`response.body.items.item`).
    ///
    /// Label values are per package, so the risk is assessed unscaled.
    pub fn from_response(response: &Value) -> Result<Self> {
        let body = response
            .get("response")
            .and_then(|r| r.get("body"))
            .filter(|b| b.is_object())
            .ok_or_else(|| EtlError::ProcessingError {
                message: "FoodQR response is missing response.body".to_string(),
            })?;

        // 單筆結果時 item 是物件而不是陣列
        let items: Vec<&Value> = match body.get("items").and_then(|i| i.get("item")) {
            Some(Value::Array(rows)) => rows.iter().collect(),
            Some(row @ Value::Object(_)) => vec![row],
            _ => Vec::new(),
        };

        let product = items.first().map(|row| product_from(row)).unwrap_or_default();
        let nutrients = nutrients_from(&items);
        let glucose_risk = assess(&nutrients).map(|assessment| GlucoseRisk {
            assessment,
            portion_factor: 1.0,
        });

        tracing::debug!(
            "FoodQR lookup mapped {} rows into {} nutrients",
            items.len(),
            nutrients.len()
        );

        Ok(Self {
            product,
            nutrients,
            glucose_risk,
        })
    }

    /// Descriptor where serving size and product weight are both the
    /// declared package total.
    pub fn matched_food(&self) -> MatchedFood {
        let total = match (&self.product.serving_total, &self.product.serving_total_unit) {
            (Some(total), Some(unit)) => Some(format!("{}{}", total, unit)),
            (total, _) => total.clone(),
        };

        MatchedFood {
            food_code: self.product.barcode.clone(),
            food_name: self.product.name.clone(),
            serving_size: total.clone(),
            product_weight: total,
            ..Default::default()
        }
    }
}

fn product_from(row: &Value) -> QrProduct {
    let field = |key: &str| match row.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    QrProduct {
        name: field("prdctNm"),
        barcode: field("brcdNo"),
        manufacturer: field("buesNm"),
        serving_total: field("ntrtnIndctTct"),
        serving_total_unit: field("ntrtnIndctTcd"),
        serving_unit_value: field("ntrtnIcutCtv"),
        serving_unit: field("ntrtnIcutCvucd"),
    }
}

fn nutrients_from(items: &[&Value]) -> NutrientProfile {
    let mut nutrients = NutrientProfile::new();

    for row in items {
        let Some(label) = row.get("nirwmtNm").and_then(Value::as_str) else {
            continue;
        };
        let Some(value) = row.get("cta").filter(|v| !v.is_null()) else {
            continue;
        };
        let Some(key) = NutrientKey::from_label(label) else {
            tracing::trace!("Skipping unmapped nutrient label '{}'", label);
            continue;
        };

        let value = match numeric(value) {
            Some(amount) => Value::from(amount),
            None => value.clone(),
        };
        nutrients.insert(key.as_str(), value);
    }

    nutrients
}

/// Digits of a scanned barcode or QR payload.
///
/// URLs contribute only the digits of their last path segment.
pub fn extract_code(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let source = match Url::parse(raw) {
        Ok(url) if url.has_host() => url
            .path_segments()
            .and_then(|segments| segments.last())
            .unwrap_or("")
            .to_string(),
        _ => raw.to_string(),
    };

    source.chars().filter(|c| c.is_ascii_digit()).collect()
}
