use serde::Serialize;

/// Gravity points per 1% ABV
pub const ABV_TO_GRAVITY_POINTS: f64 = 131.25;
/// Sucrose-equivalent gravity points per kg per litre
pub const SUGAR_POINTS_PER_KG_PER_LITRE: f64 = 384.0;
pub const HONEY_SUGAR_FRACTION: f64 = 0.796;
pub const DEFAULT_HONEY_CONTRIBUTION: f64 = HONEY_SUGAR_FRACTION * SUGAR_POINTS_PER_KG_PER_LITRE;

/// Shown for outputs that can't be computed from the inputs
pub const OUTPUT_PLACEHOLDER: &str = "—";

/// Calculator inputs; any may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecipeInput {
    pub batch_volume_litres: Option<f64>,
    pub target_abv: Option<f64>,
    pub target_fg: Option<f64>,
    /// Gravity points per kg per litre; defaults to `DEFAULT_HONEY_CONTRIBUTION`
    pub honey_contribution: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecipeOutput {
    pub target_og: Option<f64>,
    pub honey_mass_kg: Option<f64>,
}

/// Formatted outputs keyed as the calculator page shows them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecipeDisplay {
    pub target_og: String,
    pub honey_mass: String,
    pub residual_sugar: String,
    pub yeast_mass: String,
    pub go_ferm: String,
    pub fermaid_at: String,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Target OG = FG + ABV / 131.25, never below 1.000
pub fn target_og(target_abv: f64, target_fg: f64) -> f64 {
    (target_fg + target_abv / ABV_TO_GRAVITY_POINTS).max(1.0)
}

/// Honey needed to reach `og` in `volume_litres`; None unless every input is usable
pub fn honey_mass_kg(og: f64, volume_litres: f64, contribution: f64) -> Option<f64> {
    if !(volume_litres > 0.0 && og > 1.0 && contribution > 0.0) {
        return None;
    }
    let gravity_points = (og - 1.0) * 1000.0;
    Some(gravity_points * volume_litres / contribution)
}

pub fn calculate(input: &RecipeInput) -> RecipeOutput {
    let og = match (finite(input.target_abv), finite(input.target_fg)) {
        (Some(abv), Some(fg)) => Some(target_og(abv, fg)),
        _ => None,
    };
    let contribution = finite(input.honey_contribution).unwrap_or(DEFAULT_HONEY_CONTRIBUTION);
    let honey = match (og, finite(input.batch_volume_litres)) {
        (Some(og), Some(volume)) => honey_mass_kg(og, volume, contribution),
        _ => None,
    };
    RecipeOutput {
        target_og: og,
        honey_mass_kg: honey,
    }
}

impl RecipeOutput {
    /// Gravity to 3 decimals, mass to 2; outputs not yet modelled keep the placeholder
    pub fn display(&self) -> RecipeDisplay {
        let placeholder = || OUTPUT_PLACEHOLDER.to_string();
        RecipeDisplay {
            target_og: self.target_og.map(|og| format!("{:.3}", og)).unwrap_or_else(placeholder),
            honey_mass: self.honey_mass_kg.map(|kg| format!("{:.2}", kg)).unwrap_or_else(placeholder),
            residual_sugar: placeholder(),
            yeast_mass: placeholder(),
            go_ferm: placeholder(),
            fermaid_at: placeholder(),
        }
    }
}
