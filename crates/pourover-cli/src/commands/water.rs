use clap::Args;
use pourover_core::{water_at, Config};

use super::{format_grams, RecipeArgs};

#[derive(Args)]
pub struct WaterArgs {
    /// Seconds since the main timer started
    #[arg(long)]
    pub at: u32,
    #[command(flatten)]
    pub recipe: RecipeArgs,
    /// Print `{"elapsed", "water"}` as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: WaterArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let timeline = args.recipe.resolve(&config)?.timeline()?;
    let water = water_at(&timeline, args.at);

    if args.json {
        let json = serde_json::json!({ "elapsed": args.at, "water": water });
        println!("{json}");
    } else {
        println!("{}", format_grams(water));
    }
    Ok(())
}
