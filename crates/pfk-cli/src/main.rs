use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "pfk")]
#[command(about = "Personal finance kit: monthly-rebalancing backtests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Run the configured backtest, print stats and write exports/<run_id>/
    Backtest {
        /// Layered config paths in merge order (default: $PFK_CONFIG or config/default.yaml)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Root directory for run artifacts
        #[arg(long = "exports-dir", default_value = "exports")]
        exports_dir: PathBuf,

        /// Print results only; write nothing
        #[arg(long, default_value_t = false)]
        no_artifacts: bool,
    },

    /// Market data commands
    Md {
        #[command(subcommand)]
        cmd: MdCmd,
    },
}

#[derive(Subcommand)]
enum MdCmd {
    /// Fetch daily closes from the brokerage API into one wide CSV
    Fetch {
        /// Layered config paths in merge order (default: $PFK_CONFIG or config/default.yaml)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Stock / ETF code; repeatable
        #[arg(long = "stock")]
        stocks: Vec<String>,

        /// Index code, optionally `CODE=LABEL` (e.g. 0001=KOSPI); repeatable
        #[arg(long = "index")]
        indices: Vec<String>,

        /// First date, YYYY-MM-DD
        #[arg(long)]
        start: String,

        /// Last date, YYYY-MM-DD
        #[arg(long)]
        end: String,

        /// Output CSV path
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = pfk_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Backtest {
            config_paths,
            exports_dir,
            no_artifacts,
        } => {
            let exports = if no_artifacts {
                None
            } else {
                Some(exports_dir.as_path())
            };
            commands::backtest::run(&config_paths, exports)?;
        }

        Commands::Md { cmd } => match cmd {
            MdCmd::Fetch {
                config_paths,
                stocks,
                indices,
                start,
                end,
                out,
            } => {
                let start = parse_date(&start).context("invalid --start")?;
                let end = parse_date(&end).context("invalid --end")?;
                if end < start {
                    anyhow::bail!("--end {} precedes --start {}", end, start);
                }
                commands::md::fetch(&config_paths, &stocks, &indices, start, end, &out).await?;
            }
        },
    }

    Ok(())
}

/// Logs go to stderr; stdout carries `key=value` results.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").with_context(|| format!("bad date: {s}"))
}
