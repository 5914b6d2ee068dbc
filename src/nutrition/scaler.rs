use super::profile::{numeric, NutrientProfile};
use serde_json::Value;

/// Factors this close to 1.0 are treated as "no scaling".
pub const SCALE_EPSILON: f64 = 0.01;

/// True when `factor` would actually change a profile.
pub fn is_effective(factor: Option<f64>) -> bool {
    match factor {
        Some(f) => f.is_finite() && f > 0.0 && (f - 1.0).abs() >= SCALE_EPSILON,
        None => false,
    }
}

/// Multiplies every numeric entry by `factor`, returning a new profile.
///
/// Missing, non-positive and near-1.0 factors return an equal copy of the
/// input. Non-numeric entries and keys outside the vocabulary pass through;
/// numeric strings come back as JSON numbers.
pub fn scale(nutrients: &NutrientProfile, factor: Option<f64>) -> NutrientProfile {
    let factor = match factor {
        Some(f) if is_effective(Some(f)) => f,
        _ => return nutrients.clone(),
    };

    nutrients
        .iter()
        .map(|(key, value)| (key.clone(), scale_value(value, factor)))
        .collect()
}

fn scale_value(value: &Value, factor: f64) -> Value {
    match numeric(value) {
        Some(amount) => {
            let scaled = amount * factor;
            serde_json::Number::from_f64(scaled)
                .map(Value::Number)
                .unwrap_or_else(|| value.clone())
        }
        None => value.clone(),
    }
}
