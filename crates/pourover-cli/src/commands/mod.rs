pub mod brew;
pub mod config;
pub mod plan;
pub mod water;

use std::path::PathBuf;

use clap::Args;
use pourover_core::{Config, Recipe};

/// Recipe selection shared by the brew-related commands.
#[derive(Args, Debug, Clone, Default)]
pub struct RecipeArgs {
    /// Recipe TOML file (defaults to the configured or built-in recipe)
    #[arg(long)]
    pub recipe: Option<PathBuf>,
    /// Coffee mass in grams; keeps the ratio
    #[arg(long)]
    pub coffee: Option<f64>,
    /// Water mass in grams; keeps the coffee mass
    #[arg(long)]
    pub water: Option<f64>,
    /// Water-to-coffee ratio, e.g. 16 for 1:16
    #[arg(long)]
    pub ratio: Option<f64>,
}

impl RecipeArgs {
    /// Load the recipe and apply any dose overrides, coffee first.
    pub fn resolve(&self, config: &Config) -> Result<Recipe, Box<dyn std::error::Error>> {
        let mut recipe = match &self.recipe {
            Some(path) => Recipe::load(path)?,
            None => config.recipe(),
        };
        if let Some(coffee) = self.coffee {
            recipe.set_coffee(coffee)?;
        }
        if let Some(water) = self.water {
            recipe.set_water(water)?;
        }
        if let Some(ratio) = self.ratio {
            recipe.set_ratio(ratio)?;
        }
        Ok(recipe)
    }
}

/// `m:ss`
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Grams with at most one decimal.
pub fn format_grams(grams: f64) -> String {
    if grams.fract() == 0.0 {
        format!("{grams:.0}g")
    } else {
        format!("{grams:.1}g")
    }
}
