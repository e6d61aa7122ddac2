//! loo-boost: leave-one-out evaluation and hyperparameter search for boosted trees

use clap::Parser;
use loo_boost::cli::{cmd_evaluate, cmd_tune, Cli, Commands, TuneArgs};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loo_boost=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Tune(args)) => cmd_tune(&args)?,
        Some(Commands::Evaluate(args)) => cmd_evaluate(&args)?,
        None => cmd_tune(&TuneArgs::default())?,
    }

    Ok(())
}
