//! QMS query assistant CLI
//!
//! Ask quality-management questions locally and validate rule files.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "qms",
    version,
    about = "QMS query assistant",
    long_about = "Answer natural-language questions about inventory, lab tests and \n\
                  production-line tracking, and validate intent rule files."
)]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config/qms")]
    config: String,

    /// Output format (text, json, yaml)
    #[arg(
        short,
        long,
        default_value = "text",
        value_parser = ["text", "json", "yaml"]
    )]
    format: String,

    /// Enable verbose output (pipeline logs on stderr)
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The question to answer
        question: String,

        /// Rule file (JSON or YAML) to use instead of the configured rules
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Session identifier passed through to the pipeline
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Inspect and validate intent rules
    #[command(subcommand)]
    Rules(RulesCommands),
}

#[derive(Subcommand)]
enum RulesCommands {
    /// Validate a rule file and report accepted and rejected rules
    Check {
        /// Rule file (JSON or YAML)
        file: PathBuf,
    },
    /// List the active rules
    List {
        /// Rule file (JSON or YAML) to use instead of the configured rules
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
    /// Score every rule against a question
    Match {
        /// The question to score
        question: String,

        /// Rule file (JSON or YAML) to use instead of the configured rules
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn execute(cli: &Cli) -> anyhow::Result<()> {
    let format: OutputFormat = cli.format.parse().map_err(anyhow::Error::msg)?;

    match &cli.command {
        Commands::Ask {
            question,
            rules,
            session,
        } => {
            let config = commands::load_config(&cli.config, rules.as_deref())?;
            commands::ask::run(&config, question, session.as_deref(), format).await
        }
        Commands::Rules(RulesCommands::Check { file }) => commands::rules::check(file, format).await,
        Commands::Rules(RulesCommands::List { rules }) => {
            let config = commands::load_config(&cli.config, rules.as_deref())?;
            commands::rules::list(&config, format).await
        }
        Commands::Rules(RulesCommands::Match { question, rules }) => {
            let config = commands::load_config(&cli.config, rules.as_deref())?;
            commands::rules::explain(&config, question, format).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_logging(cli.verbose);

    match execute(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            if cli.verbose {
                for cause in e.chain().skip(1) {
                    eprintln!("{}: {}", "Caused by".yellow(), cause);
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }
}
