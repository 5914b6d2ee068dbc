use super::vocabulary::NutrientKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Nutrient key -> value mapping as carried by food payloads.
///
/// Values stay raw JSON so that unknown keys and non-numeric entries
/// ("trace", null, ...) survive every transformation untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NutrientProfile(BTreeMap<String, Value>);

impl NutrientProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a profile from a JSON object. Anything else yields an empty profile.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            _ => Self::default(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Numeric value of `key`, or `None` when absent or non-numeric.
    pub fn amount(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(numeric)
    }

    pub fn amount_of(&self, key: NutrientKey) -> Option<f64> {
        self.amount(key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for NutrientProfile {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// JSON numbers and numeric strings (decimal columns often arrive as text).
pub fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let s = s.trim();
            // f64::from_str 接受 "inf"/"nan"，需排除
            if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
                return None;
            }
            s.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}
