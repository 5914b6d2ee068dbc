use super::measurement::Measurement;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Knobs for [`resolve_factor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorOptions {
    /// Lower clamp applied to measured ratios. Never clamps from above.
    pub min_factor: Option<f64>,
    /// Returned when no factor can be resolved.
    pub fallback: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnresolvedReason {
    MissingServing,
    MissingProduct,
    NonPositiveServing(f64),
    /// `product / serving` overflowed or underflowed to a non-finite value.
    NonFiniteRatio { serving: f64, product: f64 },
    UnitMismatch { serving: String, product: String },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingServing => write!(f, "serving size missing or unparseable"),
            Self::MissingProduct => write!(f, "product weight missing or unparseable"),
            Self::NonPositiveServing(v) => {
                write!(f, "serving size must be positive, got {}", v)
            }
            Self::NonFiniteRatio { serving, product } => {
                write!(f, "ratio {} / {} is not a finite number", product, serving)
            }
            Self::UnitMismatch { serving, product } => {
                write!(f, "unit mismatch: serving '{}' vs product '{}'", serving, product)
            }
        }
    }
}

/// How a portion factor was (or was not) obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum FactorResolution {
    /// Trusted factor supplied by an earlier pass.
    Explicit(f64),
    /// `product / serving`, already clamped.
    Measured(f64),
    Unresolved(UnresolvedReason),
}

impl FactorResolution {
    pub fn factor(&self) -> Option<f64> {
        match self {
            Self::Explicit(f) | Self::Measured(f) => Some(*f),
            Self::Unresolved(_) => None,
        }
    }
}

pub fn resolve(
    explicit: Option<f64>,
    serving: Option<&Measurement>,
    product: Option<&Measurement>,
    min_factor: Option<f64>,
) -> FactorResolution {
    if let Some(f) = explicit.filter(|f| f.is_finite() && *f > 0.0) {
        return FactorResolution::Explicit(f);
    }

    let Some(serving) = serving else {
        return FactorResolution::Unresolved(UnresolvedReason::MissingServing);
    };
    let Some(product) = product else {
        return FactorResolution::Unresolved(UnresolvedReason::MissingProduct);
    };
    if serving.value.is_nan() || serving.value <= 0.0 {
        return FactorResolution::Unresolved(UnresolvedReason::NonPositiveServing(serving.value));
    }

    // g↔ml、g↔mg 一律不換算
    if !serving.is_compatible_with(product) {
        return FactorResolution::Unresolved(UnresolvedReason::UnitMismatch {
            serving: serving.unit.clone().unwrap_or_default(),
            product: product.unit.clone().unwrap_or_default(),
        });
    }

    let ratio = product.value / serving.value;
    if !ratio.is_finite() {
        return FactorResolution::Unresolved(UnresolvedReason::NonFiniteRatio {
            serving: serving.value,
            product: product.value,
        });
    }
    let factor = match min_factor {
        Some(min) if ratio < min => min,
        _ => ratio,
    };

    FactorResolution::Measured(factor)
}

/// `actual portion / reference serving`, or `options.fallback` when the two
/// measurements cannot be reconciled.
pub fn resolve_factor(
    explicit: Option<f64>,
    serving: Option<&Measurement>,
    product: Option<&Measurement>,
    options: &FactorOptions,
) -> Option<f64> {
    resolve(explicit, serving, product, options.min_factor)
        .factor()
        .or(options.fallback)
}
