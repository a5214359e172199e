//! cefscreen CLI: discover groups, run screens and inspect queries.
//!
//! Commands:
//! - `groups` list the main-group values currently carried by any fund
//! - `screen` run the screen and print or export the result table
//! - `query` print the query text and fingerprint without executing

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cefscreen_core::client::QueryClient;
use cefscreen_runner::export;
use cefscreen_runner::screen::ScreenParams;
use cefscreen_runner::{Screener, ScreenerConfig};

#[derive(Parser)]
#[command(name = "cefscreen", about = "Closed-end fund relative-value screen")]
struct Cli {
    /// Configuration file (defaults to ./cefscreen.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the local engine over the built-in synthetic universe.
    #[arg(long, global = true, default_value_t = false)]
    demo: bool,

    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
struct ScreenArgs {
    /// Main group to screen. Defaults to `[screen] default_main_group`.
    #[arg(long)]
    group: Option<String>,

    /// Minimum market cap in $ millions. Defaults to `[screen] min_market_cap_mm`.
    #[arg(long)]
    min_cap: Option<u64>,

    /// Evaluate as of this date (YYYY-MM-DD) instead of today.
    #[arg(long)]
    as_of: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the main groups currently offered.
    Groups,
    /// Run the screen and print (or export) the result table.
    Screen {
        #[command(flatten)]
        args: ScreenArgs,

        /// Format printed to stdout.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Write to a file instead (.csv, .json or .parquet).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the query text and fingerprint without executing it.
    Query {
        #[command(flatten)]
        args: ScreenArgs,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ScreenerConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::Groups => cmd_groups(&config, cli.demo),
        Commands::Screen {
            args,
            format,
            output,
        } => cmd_screen(&config, cli.demo, &args, format, output),
        Commands::Query { args } => cmd_query(&config, &args),
    }
}

fn screener(config: &ScreenerConfig, demo: bool) -> Result<Screener<Box<dyn QueryClient>>> {
    let client = config.client(demo)?;
    Ok(Screener::new(client, config.query_builder()))
}

/// Command-line values layered over the configured defaults.
fn screen_params(config: &ScreenerConfig, args: &ScreenArgs) -> Result<ScreenParams> {
    let mut params = config.initial_params();
    if let Some(group) = &args.group {
        params.main_group = group.clone();
    }
    if let Some(mm) = args.min_cap {
        params.min_market_cap_mm = mm;
    }
    if params.main_group.is_empty() {
        bail!("no main group given (use --group or set [screen] default_main_group)");
    }
    if let Some(text) = &args.as_of {
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .with_context(|| format!("invalid --as-of date '{text}'"))?;
        params = params.with_as_of(date);
    }
    Ok(params)
}

fn cmd_groups(config: &ScreenerConfig, demo: bool) -> Result<()> {
    let groups = screener(config, demo)?
        .reload_groups()
        .context("group discovery failed")?;
    for group in groups {
        println!("{group}");
    }
    Ok(())
}

fn cmd_screen(
    config: &ScreenerConfig,
    demo: bool,
    args: &ScreenArgs,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let params = screen_params(config, args)?;
    let outcome = screener(config, demo)?
        .refresh(&params)
        .with_context(|| format!("screen of '{}' failed", params.main_group))?;
    tracing::info!(
        rows = outcome.table().row_count(),
        fingerprint = %outcome.request.fingerprint(),
        "screen finished"
    );

    if let Some(path) = output {
        export::write_file(&path, outcome.table())?;
        println!(
            "Wrote {} securities to {}",
            outcome.table().row_count(),
            path.display()
        );
        return Ok(());
    }

    let text = match format {
        OutputFormat::Table => export::table_text(&outcome.grid),
        OutputFormat::Csv => export::export_csv(outcome.table())?,
        OutputFormat::Json => export::export_json(outcome.table())?,
    };
    print!("{text}");
    if format == OutputFormat::Json {
        println!();
    }
    Ok(())
}

fn cmd_query(config: &ScreenerConfig, args: &ScreenArgs) -> Result<()> {
    let params = screen_params(config, args)?;
    let request = config.query_builder().request(&params);
    println!("{}", request.to_query_string());
    println!("fingerprint: {}", request.fingerprint());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_flags_parse() {
        let cli = Cli::try_parse_from([
            "cefscreen", "--demo", "screen", "--group", "Equity", "--min-cap", "250", "--format",
            "csv",
        ])
        .unwrap();
        assert!(cli.demo);
        match cli.command {
            Commands::Screen { args, format, output } => {
                assert_eq!(args.group.as_deref(), Some("Equity"));
                assert_eq!(args.min_cap, Some(250));
                assert_eq!(format, OutputFormat::Csv);
                assert!(output.is_none());
            }
            _ => panic!("expected screen command"),
        }
    }

    #[test]
    fn flags_override_config_defaults() {
        let config = ScreenerConfig::from_toml(
            "[screen]\ndefault_main_group = \"Municipal\"\nmin_market_cap_mm = 100",
        )
        .unwrap();
        let args = ScreenArgs {
            group: None,
            min_cap: Some(5),
            as_of: Some("2024-03-28".into()),
        };
        let params = screen_params(&config, &args).unwrap();
        assert_eq!(params.main_group, "Municipal");
        assert_eq!(params.min_market_cap_mm, 5);
        assert_eq!(params.as_of, NaiveDate::from_ymd_opt(2024, 3, 28));
    }

    #[test]
    fn group_is_required_somewhere() {
        let args = ScreenArgs {
            group: None,
            min_cap: None,
            as_of: None,
        };
        assert!(screen_params(&ScreenerConfig::default(), &args).is_err());
    }

    #[test]
    fn bad_as_of_is_rejected() {
        let args = ScreenArgs {
            group: Some("Equity".into()),
            min_cap: None,
            as_of: Some("28/03/2024".into()),
        };
        assert!(screen_params(&ScreenerConfig::default(), &args).is_err());
    }
}
