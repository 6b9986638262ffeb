use clap::Args;
use pourover_core::{Config, StageKind};

use super::{format_clock, RecipeArgs};

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,
    /// Print the timeline as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let recipe = args.recipe.resolve(&config)?;
    let timeline = recipe.timeline()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
        return Ok(());
    }

    println!(
        "{}: {}g coffee, {}g water (1:{:.1})",
        recipe.name,
        recipe.coffee_grams,
        recipe.water_grams,
        recipe.ratio()
    );
    for stage in timeline.stages() {
        let kind = match stage.kind {
            StageKind::Pour => "pour",
            StageKind::Wait => "wait",
        };
        println!(
            "  {:>5} - {:>5}  {kind}  {:>7}  {}",
            format_clock(stage.start_time),
            format_clock(stage.end_time),
            stage.target_water.to_string(),
            stage.label
        );
    }
    println!("total {}", format_clock(timeline.total_duration()));
    Ok(())
}
