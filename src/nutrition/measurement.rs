use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static MEASUREMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]+)?)([a-zA-Z]*)$").expect("measurement pattern is valid")
});

/// A quantity with an optional, normalized unit (`"g"`, `"ml"`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: Option<String>,
}

impl Measurement {
    pub fn new(value: f64, unit: Option<&str>) -> Self {
        Self {
            value,
            unit: normalize_unit(unit),
        }
    }

    /// Parses a label measurement.
    ///
    /// A finite `value` wins outright (with `unit` normalized). Otherwise
    /// `raw` must look like `"120g"`, `"250.5 ml"` or `"3"` once whitespace is
    /// stripped; trailing letters become the unit, falling back to `unit`.
    /// Returns `None` when nothing usable is found. Non-positive values are
    /// returned as-is, callers decide whether they are usable.
    pub fn parse(value: Option<f64>, unit: Option<&str>, raw: Option<&str>) -> Option<Self> {
        if let Some(value) = value.filter(|v| v.is_finite()) {
            return Some(Self::new(value, unit));
        }

        let compact: String = raw?.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return None;
        }

        let caps = MEASUREMENT_PATTERN.captures(&compact)?;
        // 位數過長會解析成 inf
        let value = caps[1].parse::<f64>().ok().filter(|v| v.is_finite())?;
        let suffix = &caps[2];
        let unit = if suffix.is_empty() { unit } else { Some(suffix) };

        Some(Self::new(value, unit))
    }

    /// Compatible when either side has no unit or both units are equal.
    pub fn is_compatible_with(&self, other: &Measurement) -> bool {
        match (&self.unit, &other.unit) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

/// Trim + lowercase; blank units become `None`.
pub fn normalize_unit(unit: Option<&str>) -> Option<String> {
    let unit = unit?.trim();
    if unit.is_empty() {
        None
    } else {
        Some(unit.to_lowercase())
    }
}
