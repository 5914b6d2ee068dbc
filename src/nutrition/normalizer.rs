use super::measurement::Measurement;
use super::portion::{resolve, FactorOptions, FactorResolution};
use super::profile::NutrientProfile;
use super::risk::{assess, GlucoseRisk, RiskAssessment};
use super::scaler::{is_effective, scale};
use serde::{Deserialize, Serialize};

/// Minimum measured ratio used for food-analysis results.
pub const DEFAULT_MIN_FACTOR: f64 = 0.1;

/// Factor used when no factor can be resolved: keep the label values as-is.
pub const UNRESOLVED_FACTOR: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorSource {
    Explicit,
    Measured,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedNutrition {
    pub nutrients: NutrientProfile,
    pub factor_used: f64,
    pub factor_source: FactorSource,
    pub risk: Option<RiskAssessment>,
}

impl NormalizedNutrition {
    /// Whether `nutrients` differ from the input because of scaling.
    pub fn scaling_applied(&self) -> bool {
        is_effective(Some(self.factor_used))
    }

    pub fn glucose_risk(&self) -> Option<GlucoseRisk> {
        self.risk.clone().map(|assessment| GlucoseRisk {
            assessment,
            portion_factor: self.factor_used,
        })
    }
}

/// Resolve factor -> scale -> assess, with one shared unresolved policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    min_factor: Option<f64>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            min_factor: Some(DEFAULT_MIN_FACTOR),
        }
    }
}

impl Normalizer {
    pub fn new(min_factor: Option<f64>) -> Self {
        Self { min_factor }
    }

    pub fn options(&self) -> FactorOptions {
        FactorOptions {
            min_factor: self.min_factor,
            fallback: Some(UNRESOLVED_FACTOR),
        }
    }

    pub fn normalize(
        &self,
        nutrients: &NutrientProfile,
        explicit_factor: Option<f64>,
        serving: Option<&Measurement>,
        product: Option<&Measurement>,
    ) -> NormalizedNutrition {
        let options = self.options();
        let (factor_used, factor_source) =
            match resolve(explicit_factor, serving, product, options.min_factor) {
                FactorResolution::Explicit(f) => (f, FactorSource::Explicit),
                FactorResolution::Measured(f) => (f, FactorSource::Measured),
                FactorResolution::Unresolved(reason) => {
                    tracing::debug!("Portion factor unresolved ({}), keeping label values", reason);
                    let fallback = options.fallback.unwrap_or(UNRESOLVED_FACTOR);
                    (fallback, FactorSource::Unresolved)
                }
            };

        let scaled = scale(nutrients, Some(factor_used));
        let risk = assess(&scaled);

        NormalizedNutrition {
            nutrients: scaled,
            factor_used,
            factor_source,
            risk,
        }
    }
}
