mod app;
mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};

use teamops_config::AppConfig;
use teamops_cron::JobRun;
use teamops_jobs::next_report_title;
use teamops_storage::{load_app_config, open_store, save_app_config};
use teamops_types::{JobKind, JobOutcome, JobTrigger};

#[derive(Parser)]
#[command(name = "teamops", about = "Weekly report and on-call rotation automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and the job scheduler
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not start the scheduler; jobs run only via HTTP
        #[arg(long)]
        no_scheduler: bool,
    },
    /// Run one job now
    Run {
        /// confluence-weekly-report (weekly-report) or on-call-notification (on-call)
        job: JobKind,
    },
    /// Print the title of the report that follows the given one
    NextTitle {
        /// Current report title, e.g. "2025 W23 Team Report (0602-0606)"
        title: String,

        /// Year the job runs in (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Inspect or replace the job configuration document
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Check configuration health
    Health,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the stored configuration
    Show,
    /// Check a configuration document without saving it
    Validate { file: PathBuf },
    /// Validate a configuration document and save it to the store
    ///
    /// A running `serve` picks up changed schedules on its next scheduler tick.
    Apply { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, no_scheduler } => {
            let config = teamops_config::load_config()?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve::run_serve(config, port, !no_scheduler))?;
        }
        Commands::Run { job } => {
            let config = teamops_config::load_config()?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_job(config, job))?;
        }
        Commands::NextTitle { title, year } => {
            let year = year.unwrap_or_else(|| Utc::now().year());
            let next = next_report_title(&title, year)?;
            println!("{}", next.title);
            println!(
                "  week {} of {}, {} to {}",
                next.week, next.year, next.range.start, next.range.end
            );
            if next.crosses_year {
                println!("  filed under the {} folder", next.year);
            }
        }
        Commands::Config { command } => {
            let config = teamops_config::load_config()?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_config(config, command))?;
        }
        Commands::Health => {
            let config = teamops_config::load_config()?;
            println!("teamops is healthy");
            println!("  timezone: {}", config.timezone);
            println!("  gateway: {}:{}", config.gateway.host, config.gateway.port);
            match open_store(&config.storage) {
                Ok(store) => println!("  config store: {}", store.describe()),
                Err(e) => println!("  config store: unavailable ({e})"),
            }
            println!(
                "  confluence: {}",
                if config.confluence.domain.is_empty() {
                    "not configured"
                } else {
                    config.confluence.domain.as_str()
                }
            );
            println!(
                "  slack: {}",
                if config.slack.api_token.is_empty() {
                    "not configured"
                } else {
                    "token set"
                }
            );
        }
    }

    Ok(())
}

async fn run_job(config: teamops_config::ServiceConfig, job: JobKind) -> anyhow::Result<()> {
    let tz = config.tz()?;
    let store = open_store(&config.storage)?;
    let runner = app::build_runner(&config, store, tz);

    let started_at = Utc::now();
    let outcome = runner.run(job).await;
    if let Some(history) = app::open_history() {
        let run = JobRun::new(job, JobTrigger::Cli, outcome.clone(), started_at, Utc::now());
        if let Err(e) = history.record(&run) {
            tracing::warn!("Failed to record job run: {e:#}");
        }
    }

    match outcome {
        JobOutcome::Failed { error } => bail!(error),
        other => {
            println!("{}", other.message());
            Ok(())
        }
    }
}

async fn run_config(
    config: teamops_config::ServiceConfig,
    command: ConfigCommand,
) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show => {
            let store = open_store(&config.storage)?;
            let app_config = load_app_config(store.as_ref()).await;
            println!("{}", serde_json::to_string_pretty(&app_config)?);
        }
        ConfigCommand::Validate { file } => {
            read_document(&file)?;
            println!("{} is valid", file.display());
        }
        ConfigCommand::Apply { file } => {
            let app_config = read_document(&file)?;
            let store = open_store(&config.storage)?;
            save_app_config(store.as_ref(), &app_config).await?;
            println!("Saved {} to {}", file.display(), store.describe());
        }
    }
    Ok(())
}

fn read_document(path: &Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let app_config = AppConfig::from_value(value)?;
    app_config.validate()?;
    Ok(app_config)
}
