// Offense rankings entry point.
//
// Run sequence:
// 1. Parse arguments and initialize tracing (stderr, so stdout holds the table)
// 2. Load config and apply command-line overrides
// 3. Load the season from the configured source
// 4. Run the engine
// 5. Print the park summary and ranking table
// 6. Save the results CSV

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use offrank_core::config::{self, Config, SourceKind};
use offrank_core::pipeline;
use offrank_core::report::{render_legend, render_park_summary, render_table, save_results};
use offrank_core::source::{CsvSource, GameSource};
use offrank_statsapi::StatsApiSource;

/// Number of parks listed at each end of the park summary.
const PARK_SUMMARY_TOP: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "offrank")]
#[command(about = "Opponent- and park-adjusted team offense rankings", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (defaults to config/offrank.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Season to rank (defaults to the configured or current season)
    #[arg(short, long)]
    season: Option<i32>,

    /// Regression toward league average, between 0 and 1
    #[arg(long)]
    smoothing: Option<f64>,

    /// Where game data comes from
    #[arg(long, value_enum)]
    source: Option<SourceArg>,

    /// Games CSV for the csv source
    #[arg(long)]
    games: Option<PathBuf>,

    /// Teams CSV for the csv source
    #[arg(long)]
    teams: Option<PathBuf>,

    /// Directory for the results CSV
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Do not write the results CSV
    #[arg(long)]
    no_save: bool,

    /// Do not print the tables
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Statsapi,
    Csv,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Statsapi => SourceKind::StatsApi,
            SourceArg::Csv => SourceKind::Csv,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = build_config(&cli)?;
    let season = config.engine.season;
    info!(
        "Ranking season {} (smoothing {:.2}, source {:?})",
        season, config.engine.smoothing, config.source.kind
    );

    let source = make_source(&config);
    let data = source
        .load_season(season)
        .await
        .with_context(|| format!("failed to load season {season}"))?;

    let output = pipeline::run(data.games, &config.engine).context("ranking run failed")?;
    info!("{}", output.ingest);
    let table = output.table(&data.teams);

    if config.output.display {
        println!("{}", render_park_summary(&output.parks, PARK_SUMMARY_TOP));
        println!("{}", render_table(&table));
        println!("{}", render_legend(config.engine.smoothing));
    }

    if config.output.save {
        let dir = Path::new(&config.output.results_dir);
        let timestamp = chrono::Local::now().naive_local();
        let path = save_results(&table, dir, season, timestamp).context("failed to save results")?;
        info!("Results saved to {}", path.display());
    }

    Ok(())
}

/// Load the config file and layer command-line overrides on top.
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = config::load_config(cli.config.as_deref()).context("failed to load configuration")?;

    if let Some(season) = cli.season {
        config.engine.season = season;
    }
    if let Some(smoothing) = cli.smoothing {
        config.engine = config.engine.with_smoothing(smoothing);
    }
    if let Some(source) = cli.source {
        config.source.kind = source.into();
    }
    if let Some(games) = &cli.games {
        config.source.games_csv = games.display().to_string();
    }
    if let Some(teams) = &cli.teams {
        config.source.teams_csv = Some(teams.display().to_string());
    }
    if let Some(dir) = &cli.results_dir {
        config.output.results_dir = dir.display().to_string();
    }
    if cli.no_save {
        config.output.save = false;
    }
    if cli.quiet {
        config.output.display = false;
    }

    config::validate(&config).context("invalid configuration")?;
    Ok(config)
}

fn make_source(config: &Config) -> Box<dyn GameSource> {
    match config.source.kind {
        SourceKind::StatsApi => Box::new(StatsApiSource::from_config(&config.source)),
        SourceKind::Csv => {
            if config.source.teams_csv.is_none() {
                warn!("no teams file configured; teams will be labelled by id");
            }
            Box::new(CsvSource::new(
                &config.source.games_csv,
                config.source.teams_csv.as_ref().map(PathBuf::from),
            ))
        }
    }
}

/// Initialize tracing to stderr; stdout is reserved for the rendered tables.
fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose { "offrank=debug,warn" } else { "offrank=info,warn" };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let cli = Cli::parse_from([
            "offrank",
            "--config",
            concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/offrank.toml"),
            "--season",
            "2023",
            "--smoothing",
            "0.5",
            "--source",
            "csv",
            "--games",
            "g.csv",
            "--no-save",
            "--quiet",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.engine.season, 2023);
        assert_eq!(config.engine.smoothing, 0.5);
        assert_eq!(config.source.kind, SourceKind::Csv);
        assert_eq!(config.source.games_csv, "g.csv");
        assert!(!config.output.save);
        assert!(!config.output.display);
    }

    #[test]
    fn out_of_range_smoothing_rejected() {
        let cli = Cli::parse_from([
            "offrank",
            "--config",
            concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/offrank.toml"),
            "--smoothing",
            "1.5",
        ]);
        assert!(build_config(&cli).is_err());
    }
}
