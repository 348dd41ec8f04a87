use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "iku-brain", version, about = "Iku Brain CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record an event (e.g. `task:completed`, `mood:set`)
    Record(commands::record::RecordArgs),
    /// Patterns derived from recent events
    Patterns,
    /// Cheap snapshot of the current moment
    Quick,
    /// Predictions for the rest of the day
    Predict {
        /// List the individual predictions with confidence
        #[arg(long)]
        detailed: bool,
    },
    /// Today's wellbeing score
    Wellbeing {
        /// Print a one-line summary instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// Contextual suggestions for right now
    Suggestions,
    /// Greeting for the current time of day
    Welcome,
    /// End-of-day summary
    Evening,
    /// Run a full analysis and store today's score
    Analyze,
    /// Hide a suggestion permanently
    Dismiss {
        /// Suggestion id (e.g. "journal-evening")
        id: String,
    },
    /// Stored memory document
    Memory {
        /// Print event counts per type instead of the full document
        #[arg(long)]
        summary: bool,
    },
    /// Forget all recorded events, patterns and scores
    Reset,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("IKU_BRAIN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Record(args) => commands::record::run(args),
        Commands::Patterns => commands::insights::patterns(),
        Commands::Quick => commands::insights::quick(),
        Commands::Predict { detailed } => commands::insights::predict(detailed),
        Commands::Wellbeing { summary } => commands::insights::wellbeing(summary),
        Commands::Suggestions => commands::insights::suggestions(),
        Commands::Welcome => commands::insights::welcome(),
        Commands::Evening => commands::insights::evening(),
        Commands::Analyze => commands::memory::analyze(),
        Commands::Dismiss { id } => commands::memory::dismiss(&id),
        Commands::Memory { summary } => commands::memory::show(summary),
        Commands::Reset => commands::memory::reset(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
