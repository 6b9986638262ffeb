//! Brew recipes and proportional rescaling.
//!
//! Stages carry cumulative water targets that were written for a specific
//! dose. Changing coffee, water or ratio scales every target by the same
//! factor so the shape of the pour stays intact; timing never changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, RecipeError, ScheduleError};
use crate::timer::{expand, Stage, Timeline, WaterAmount};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub coffee_grams: f64,
    pub water_grams: f64,
    pub stages: Vec<Stage>,
}

/// A user edit to the dose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "lowercase")]
pub enum RecipeEdit {
    /// New coffee mass; the ratio is kept and water follows.
    Coffee(f64),
    /// New water mass; coffee is kept and the ratio follows.
    Water(f64),
    /// New water-to-coffee ratio; coffee is kept and water follows.
    Ratio(f64),
}

impl Recipe {
    /// A four-pour V60-style recipe for 20g of coffee.
    pub fn default_v60() -> Self {
        Self {
            name: "Four pour V60".into(),
            coffee_grams: 20.0,
            water_grams: 300.0,
            stages: vec![
                Stage::new("Bloom", 45, "60g")
                    .with_pour_time(10)
                    .with_detail("Wet all the grounds, then let it degas"),
                Stage::new("First pour", 90, "150g").with_detail("Slow spiral from the center"),
                Stage::new("Second pour", 135, "240g").with_detail("Keep the bed level"),
                Stage::new("Final pour", 165, "300g").with_detail("Gentle swirl when done"),
                Stage::new("Drawdown", 210, "300g")
                    .with_pour_time(0)
                    .with_detail("Let it drain through"),
            ],
        }
    }

    /// Parse a recipe from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a recipe file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Water-to-coffee ratio (15.0 means 1:15).
    pub fn ratio(&self) -> f64 {
        if self.coffee_grams > 0.0 {
            self.water_grams / self.coffee_grams
        } else {
            0.0
        }
    }

    /// Expand the stages into a timeline.
    pub fn timeline(&self) -> Result<Timeline, ScheduleError> {
        expand(&self.stages)
    }

    pub fn set_coffee(&mut self, grams: f64) -> Result<(), RecipeError> {
        check_positive("coffee_grams", grams)?;
        let water = grams * self.ratio();
        self.rescale(grams, water)
    }

    pub fn set_water(&mut self, grams: f64) -> Result<(), RecipeError> {
        check_positive("water_grams", grams)?;
        self.rescale(self.coffee_grams, grams)
    }

    pub fn set_ratio(&mut self, ratio: f64) -> Result<(), RecipeError> {
        check_positive("ratio", ratio)?;
        let water = self.coffee_grams * ratio;
        self.rescale(self.coffee_grams, water)
    }

    pub fn apply(&mut self, edit: RecipeEdit) -> Result<(), RecipeError> {
        match edit {
            RecipeEdit::Coffee(grams) => self.set_coffee(grams),
            RecipeEdit::Water(grams) => self.set_water(grams),
            RecipeEdit::Ratio(ratio) => self.set_ratio(ratio),
        }
    }

    /// Commit a new dose, scaling every stage's water target. Leaves the
    /// recipe untouched on error.
    fn rescale(&mut self, coffee: f64, water: f64) -> Result<(), RecipeError> {
        check_positive("coffee_grams", self.coffee_grams)?;
        check_positive("water_grams", self.water_grams)?;
        check_positive("water_grams", water)?;

        let factor = water / self.water_grams;
        let stages = self
            .stages
            .iter()
            .enumerate()
            .map(|(index, stage)| {
                let amount = WaterAmount::parse(&stage.target_water).ok_or_else(|| {
                    ScheduleError::InvalidWater {
                        index,
                        value: stage.target_water.clone(),
                    }
                })?;
                Ok(Stage {
                    target_water: amount.scaled(factor).to_string(),
                    ..stage.clone()
                })
            })
            .collect::<Result<Vec<_>, ScheduleError>>()?;

        self.coffee_grams = coffee;
        self.water_grams = water;
        self.stages = stages;
        Ok(())
    }
}

impl Default for Recipe {
    fn default() -> Self {
        Self::default_v60()
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), RecipeError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RecipeError::InvalidRecipeParameter { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(timeline: &Timeline) -> Vec<(u32, u32)> {
        timeline
            .stages()
            .iter()
            .map(|s| (s.start_time, s.end_time))
            .collect()
    }

    #[test]
    fn default_recipe_expands() {
        let recipe = Recipe::default();
        assert_eq!(recipe.ratio(), 15.0);

        let timeline = recipe.timeline().unwrap();
        assert_eq!(timeline.total_duration(), 210);
        assert_eq!(timeline.final_water(), 300.0);
        // Drawdown has no pour sub-stage.
        let last = timeline.stages().last().unwrap();
        assert_eq!((last.start_time, last.end_time), (165, 210));
        assert!(!last.is_pour());
    }

    #[test]
    fn coffee_edit_keeps_ratio_and_timing() {
        let mut recipe = Recipe::default();
        let before = recipe.timeline().unwrap();

        recipe.set_coffee(30.0).unwrap();
        assert_eq!(recipe.water_grams, 450.0);
        assert_eq!(recipe.ratio(), 15.0);
        assert_eq!(recipe.stages[0].target_water, "90g");
        assert_eq!(recipe.stages[3].target_water, "450g");

        let after = recipe.timeline().unwrap();
        assert_eq!(spans(&before), spans(&after));
    }

    #[test]
    fn repeated_edits_do_not_drift() {
        let mut recipe = Recipe::default();
        recipe.stages[0].target_water = "60.25g".into();

        recipe.set_water(301.0).unwrap();
        recipe.set_water(300.0).unwrap();
        assert_eq!(recipe.stages[0].target_water, "60.25g");
        assert_eq!(recipe.stages[1].target_water, "150g");

        recipe.set_water(330.0).unwrap();
        assert_eq!(recipe.stages[0].target_water, "66.275g");
    }

    #[test]
    fn water_and_ratio_edits() {
        let mut recipe = Recipe::default();
        recipe.set_water(240.0).unwrap();
        assert_eq!(recipe.coffee_grams, 20.0);
        assert_eq!(recipe.ratio(), 12.0);
        assert_eq!(recipe.stages[0].target_water, "48g");

        recipe.apply(RecipeEdit::Ratio(16.0)).unwrap();
        assert_eq!(recipe.water_grams, 320.0);
        assert_eq!(recipe.stages[1].target_water, "160g");
    }

    #[test]
    fn invalid_parameters_leave_recipe_untouched() {
        let mut recipe = Recipe::default();
        let original = recipe.clone();

        assert_eq!(
            recipe.set_coffee(0.0),
            Err(RecipeError::InvalidRecipeParameter {
                field: "coffee_grams",
                value: 0.0
            })
        );
        assert!(recipe.set_ratio(f64::NAN).is_err());
        assert!(recipe.set_water(-5.0).is_err());
        assert_eq!(recipe, original);
    }

    #[test]
    fn unparseable_stage_water_fails_rescale() {
        let mut recipe = Recipe::default();
        recipe.stages[2].target_water = "a splash".into();
        assert!(matches!(
            recipe.set_coffee(25.0),
            Err(RecipeError::Schedule(ScheduleError::InvalidWater { index: 2, .. }))
        ));
        assert_eq!(recipe.coffee_grams, 20.0);
    }

    #[test]
    fn parses_toml() {
        let recipe = Recipe::from_toml_str(
            r#"
            name = "Quick"
            coffee_grams = 15
            water_grams = 250

            [[stages]]
            label = "Bloom"
            target_time = 30
            target_water = "50g"

            [[stages]]
            label = "Rest"
            target_time = 120
            target_water = "250g"
            pour_time = 40
            detail = "Pour slowly"
            "#,
        )
        .unwrap();

        assert_eq!(recipe.stages.len(), 2);
        assert_eq!(recipe.stages[1].pour_time, Some(40));
        assert_eq!(recipe.stages[0].detail, "");
        assert_eq!(recipe.timeline().unwrap().total_duration(), 120);
    }
}
