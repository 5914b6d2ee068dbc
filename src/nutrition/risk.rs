//! Heuristic post-meal glycemic risk.
//!
//! This is not a clinical glycemic-index or glycemic-load model and is not
//! medically validated. Its only contract is determinism plus the formula and
//! thresholds below:
//!
//! ```text
//! net_carbs  = max(0, carbs - fiber)
//! sugar_load = min(30, sugars * 0.7)
//! buffer     = min(net_carbs * 0.5, protein * 0.35 + fat * 0.2)
//! score      = max(0, net_carbs + sugar_load - buffer)
//! ```
//!
//! `score >= 60` is high, `score >= 30` is medium, anything else is low.

use super::profile::NutrientProfile;
use super::vocabulary::NutrientKey;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HIGH_THRESHOLD: f64 = 60.0;
pub const MEDIUM_THRESHOLD: f64 = 30.0;

const SUGAR_WEIGHT: f64 = 0.7;
const SUGAR_LOAD_CAP: f64 = 30.0;
const PROTEIN_BUFFER: f64 = 0.35;
const FAT_BUFFER: f64 = 0.2;
const MAX_BUFFER_SHARE: f64 = 0.5;

const HIGH_MESSAGE: &str =
    "탄수화물 대비 완충영양이 부족해 식후 급격한 혈당 상승 가능성이 높습니다.";
const MEDIUM_MESSAGE: &str =
    "보통 수준의 위험입니다. 단백질·식이섬유를 조금 더 추가하면 안전합니다.";
const LOW_MESSAGE: &str =
    "식이섬유·단백질 비율이 좋아 비교적 안정적인 식후 혈당이 예상됩니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Lower bounds are inclusive: exactly 30.0 is medium, exactly 60.0 is high.
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_THRESHOLD {
            RiskLevel::High
        } else if score >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RiskLevel::High => HIGH_MESSAGE,
            RiskLevel::Medium => MEDIUM_MESSAGE,
            RiskLevel::Low => LOW_MESSAGE,
        }
    }

    /// Short Korean label shown next to the level.
    pub fn display_label(self) -> &'static str {
        match self {
            RiskLevel::Low => "낮음",
            RiskLevel::Medium => "보통",
            RiskLevel::High => "높음",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client-submitted risk label after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RiskLabel {
    Level(RiskLevel),
    /// Free text that matched no known level, kept trimmed and lowercased.
    Other(String),
}

impl RiskLabel {
    /// `"HIGH risk"` -> high, `"mid"` -> medium, `"Low"` -> low, blank -> `None`.
    pub fn normalize(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase();

        if normalized.contains("high") {
            Some(RiskLabel::Level(RiskLevel::High))
        } else if normalized.contains("medium") || normalized.contains("mid") {
            Some(RiskLabel::Level(RiskLevel::Medium))
        } else if normalized.contains("low") {
            Some(RiskLabel::Level(RiskLevel::Low))
        } else if normalized.is_empty() {
            None
        } else {
            Some(RiskLabel::Other(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RiskLabel::Level(level) => level.as_str(),
            RiskLabel::Other(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDetails {
    pub carbs_g: f64,
    pub fiber_g: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub sugars_g: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: f64,
    pub net_carbs: f64,
    pub details: RiskDetails,
    pub message: String,
}

/// Assessment plus the portion factor it was computed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseRisk {
    #[serde(flatten)]
    pub assessment: RiskAssessment,
    pub portion_factor: f64,
}

/// Scores a nutrient profile. Returns `None` only when carbohydrate,
/// protein and fat are all missing.
pub fn assess(nutrients: &NutrientProfile) -> Option<RiskAssessment> {
    let carbs = nutrients.amount_of(NutrientKey::CarbohydrateG);
    let protein = nutrients.amount_of(NutrientKey::ProteinG);
    let fat = nutrients.amount_of(NutrientKey::FatG);

    if carbs.is_none() && protein.is_none() && fat.is_none() {
        return None;
    }

    let carbs = carbs.unwrap_or(0.0);
    let protein = protein.unwrap_or(0.0);
    let fat = fat.unwrap_or(0.0);
    let fiber = nutrients.amount_of(NutrientKey::DietaryFiberG).unwrap_or(0.0);
    let sugars = nutrients.amount_of(NutrientKey::SugarsG).unwrap_or(0.0);

    let net_carbs = (carbs - fiber).max(0.0);
    let sugar_load = (sugars * SUGAR_WEIGHT).min(SUGAR_LOAD_CAP);
    let buffer = (net_carbs * MAX_BUFFER_SHARE).min(protein * PROTEIN_BUFFER + fat * FAT_BUFFER);
    let score = (net_carbs + sugar_load - buffer).max(0.0);

    let level = RiskLevel::from_score(score);

    Some(RiskAssessment {
        level,
        score: round1(score),
        net_carbs: round1(net_carbs),
        details: RiskDetails {
            carbs_g: round1(carbs),
            fiber_g: round1(fiber),
            protein_g: round1(protein),
            fat_g: round1(fat),
            sugars_g: round1(sugars),
        },
        message: level.message().to_string(),
    })
}

/// Half away from zero, one decimal.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
