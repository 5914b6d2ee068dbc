// Nutrition core: measurement parsing, portion factors, scaling and glycemic
// risk. Pure functions only; no I/O and no shared mutable state.

pub mod food;
pub mod meal;
pub mod measurement;
pub mod normalizer;
pub mod portion;
pub mod profile;
pub mod qr;
pub mod risk;
pub mod scaler;
pub mod vocabulary;

pub use food::{FoodAnalysis, MatchedFood};
pub use meal::{MealRecord, MealRecordInput, MealSource};
pub use measurement::Measurement;
pub use normalizer::{FactorSource, NormalizedNutrition, Normalizer};
pub use portion::{resolve_factor, FactorOptions, FactorResolution};
pub use profile::NutrientProfile;
pub use qr::QrLookup;
pub use risk::{assess, GlucoseRisk, RiskAssessment, RiskLevel};
pub use scaler::scale;
pub use vocabulary::NutrientKey;
