use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical nutrient keys used by the food table and every nutrient payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientKey {
    EnergyKcal,
    MoistureG,
    ProteinG,
    FatG,
    CarbohydrateG,
    SugarsG,
    DietaryFiberG,
    SodiumMg,
    BetaCaroteneMcg,
    CholesterolMg,
    SaturatedFattyAcidsG,
    TransFattyAcidsG,
    FructoseG,
    LactoseG,
    SucroseG,
    GlucoseG,
}

impl NutrientKey {
    pub const ALL: [NutrientKey; 16] = [
        NutrientKey::EnergyKcal,
        NutrientKey::MoistureG,
        NutrientKey::ProteinG,
        NutrientKey::FatG,
        NutrientKey::CarbohydrateG,
        NutrientKey::SugarsG,
        NutrientKey::DietaryFiberG,
        NutrientKey::SodiumMg,
        NutrientKey::BetaCaroteneMcg,
        NutrientKey::CholesterolMg,
        NutrientKey::SaturatedFattyAcidsG,
        NutrientKey::TransFattyAcidsG,
        NutrientKey::FructoseG,
        NutrientKey::LactoseG,
        NutrientKey::SucroseG,
        NutrientKey::GlucoseG,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            NutrientKey::EnergyKcal => "energy_kcal",
            NutrientKey::MoistureG => "moisture_g",
            NutrientKey::ProteinG => "protein_g",
            NutrientKey::FatG => "fat_g",
            NutrientKey::CarbohydrateG => "carbohydrate_g",
            NutrientKey::SugarsG => "sugars_g",
            NutrientKey::DietaryFiberG => "dietary_fiber_g",
            NutrientKey::SodiumMg => "sodium_mg",
            NutrientKey::BetaCaroteneMcg => "beta_carotene_mcg",
            NutrientKey::CholesterolMg => "cholesterol_mg",
            NutrientKey::SaturatedFattyAcidsG => "saturated_fatty_acids_g",
            NutrientKey::TransFattyAcidsG => "trans_fatty_acids_g",
            NutrientKey::FructoseG => "fructose_g",
            NutrientKey::LactoseG => "lactose_g",
            NutrientKey::SucroseG => "sucrose_g",
            NutrientKey::GlucoseG => "glucose_g",
        }
    }

    /// Maps a nutrient label as printed by the barcode/QR registry
    /// (e.g. `"탄수화물"`) to its canonical key. Unknown labels return `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        LABELS
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, key)| *key)
    }
}

impl fmt::Display for NutrientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 條碼/QR 營養標示名稱 -> 標準欄位
const LABELS: &[(&str, NutrientKey)] = &[
    ("열량", NutrientKey::EnergyKcal),
    ("에너지", NutrientKey::EnergyKcal),
    ("탄수화물", NutrientKey::CarbohydrateG),
    ("단백질", NutrientKey::ProteinG),
    ("지방", NutrientKey::FatG),
    ("당류", NutrientKey::SugarsG),
    ("나트륨", NutrientKey::SodiumMg),
    ("포화지방", NutrientKey::SaturatedFattyAcidsG),
    ("트랜스지방", NutrientKey::TransFattyAcidsG),
    ("식이섬유", NutrientKey::DietaryFiberG),
    ("콜레스테롤", NutrientKey::CholesterolMg),
];
