use std::path::PathBuf;

use clap::{Parser, Subcommand};
use garmin_relay::cli::commands;
use garmin_relay::config::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "garmin-relay")]
#[command(author, version, long_about = None)]
#[command(about = "Relay Garmin Connect health data through InfluxDB to a local LLM")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Garmin credential profile to use
    #[arg(short, long, global = true, env = "GARMIN_PROFILE")]
    profile: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch daily health metrics from Garmin Connect and write them to InfluxDB
    Collect {
        /// Last date to collect (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
        /// Number of days to collect, counting the last date
        #[arg(long)]
        days: Option<u32>,
        /// Extract and print records without writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Build evaluation prompts from stored data and send them to the LLM
    Report {
        /// Number of days to report on, counting today
        #[arg(long)]
        days: Option<u32>,
        /// Print the prompts without sending them
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "garmin_relay=debug"
    } else {
        "garmin_relay=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> garmin_relay::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(profile) = &cli.profile {
        config.garmin.profile = profile.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> garmin_relay::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match load_config(&cli) {
        Ok(config) => match cli.command {
            Commands::Collect {
                date,
                days,
                dry_run,
            } => commands::collect(&config, date, days, dry_run).await,
            Commands::Report { days, dry_run } => commands::report(&config, days, dry_run).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", garmin_relay::error::format_user_error(&e));
        std::process::exit(1);
    }

    Ok(())
}
