use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use focusloop_core::{Config, CoreError, Database, Engine};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusloop", version, about = "Focus interval timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Interval statistics
    Stats(commands::stats::StatsArgs),
    /// Timer settings stored with the session data
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_env("FOCUSLOOP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file and installs logging from it.
fn load_config() -> Result<Config, CoreError> {
    let config = Config::load()?;
    init_logging(&config.log_filter);
    Ok(config)
}

fn open_engine() -> Result<Engine<Database>, CoreError> {
    commands::open_engine(&load_config()?)
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Timer { action } => commands::timer::run(action, &open_engine()?),
        Commands::Task { action } => commands::task::run(action, &open_engine()?),
        Commands::Stats(args) => commands::stats::run(args, &open_engine()?),
        Commands::Settings { action } => commands::settings::run(action, &open_engine()?),
        Commands::Config { action } => commands::config::run(action, load_config()?),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "focusloop", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Stable failure category printed as `error[<kind>]`.
fn error_kind(e: &(dyn std::error::Error + 'static)) -> &'static str {
    match e.downcast_ref::<CoreError>() {
        Some(core) => core.kind(),
        None => "io",
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("error[{}]: {e}", error_kind(e.as_ref()));
        std::process::exit(1);
    }
}
