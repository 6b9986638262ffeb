use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pourover", version, about = "Pour-over brew timer")]
struct Cli {
    /// Log engine transitions and tick scheduling to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the expanded pour/wait timeline
    Plan(commands::plan::PlanArgs),
    /// Print the water poured at a point in the brew
    Water(commands::water::WaterArgs),
    /// Run a live brew session
    Brew(commands::brew::BrewArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("pourover_core={level},pourover_cli={level}"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Water(args) => commands::water::run(args),
        Commands::Brew(args) => commands::brew::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
