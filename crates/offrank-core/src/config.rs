// Configuration loading and parsing (offrank.toml).
//
// Every key is optional; a missing file section falls back to the defaults
// below. The engine only ever sees the validated `EngineConfig`, which is
// passed explicitly into each pipeline stage.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_SMOOTHING: f64 = 0.3;
pub const DEFAULT_MIN_VENUE_GAMES: u32 = 10;
pub const DEFAULT_ADJUSTMENT_CLAMP: [f64; 2] = [0.5, 1.5];
pub const DEFAULT_TIE_PRECISION: u32 = 2;
pub const DEFAULT_STATSAPI_URL: &str = "https://statsapi.mlb.com/api/v1";

/// Largest accepted number of decimals for tie comparison.
const MAX_TIE_PRECISION: u32 = 6;

/// Relative location of the config file, resolved against the working directory.
pub const CONFIG_FILE: &str = "config/offrank.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub engine: EngineConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Engine settings
// ---------------------------------------------------------------------------

/// Linear weights applied to a team's batting line to produce a game score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub runs: f64,
    pub hits: f64,
    pub walks: f64,
    pub strikeouts: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            runs: 1.0,
            hits: 0.5,
            walks: 0.7,
            strikeouts: -0.25,
        }
    }
}

/// Hard floor and ceiling applied to the opponent adjustment factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampBounds {
    pub lo: f64,
    pub hi: f64,
}

impl ClampBounds {
    pub fn apply(&self, value: f64) -> f64 {
        value.clamp(self.lo, self.hi)
    }
}

impl Default for ClampBounds {
    fn default() -> Self {
        ClampBounds {
            lo: DEFAULT_ADJUSTMENT_CLAMP[0],
            hi: DEFAULT_ADJUSTMENT_CLAMP[1],
        }
    }
}

/// Immutable run settings shared by every engine stage.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub season: i32,
    /// Smoothing factor α in [0, 1]. 0 keeps the full RA9- deviation,
    /// 1 removes the opponent adjustment entirely.
    pub smoothing: f64,
    pub min_venue_games: u32,
    pub adjustment_clamp: ClampBounds,
    /// Decimal places used when comparing mean scores for ties.
    pub tie_precision: u32,
    pub weights: ScoreWeights,
}

impl EngineConfig {
    /// Engine settings with all defaults for the given season.
    pub fn for_season(season: i32) -> Self {
        EngineConfig {
            season,
            smoothing: DEFAULT_SMOOTHING,
            min_venue_games: DEFAULT_MIN_VENUE_GAMES,
            adjustment_clamp: ClampBounds::default(),
            tie_precision: DEFAULT_TIE_PRECISION,
            weights: ScoreWeights::default(),
        }
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Reject out-of-range settings before any computation starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(ConfigError::invalid(
                "engine.smoothing",
                format!("must be between 0.0 and 1.0 inclusive, got {}", self.smoothing),
            ));
        }

        if self.min_venue_games == 0 {
            return Err(ConfigError::invalid("engine.min_venue_games", "must be > 0"));
        }

        let ClampBounds { lo, hi } = self.adjustment_clamp;
        if !lo.is_finite() || !hi.is_finite() {
            return Err(ConfigError::invalid(
                "engine.adjustment_clamp",
                format!("bounds must be finite, got [{lo}, {hi}]"),
            ));
        }
        // 1.0 must stay reachable so a league-average opponent is neutral.
        if lo <= 0.0 || lo > 1.0 || hi < 1.0 {
            return Err(ConfigError::invalid(
                "engine.adjustment_clamp",
                format!("expected 0 < lo <= 1 <= hi, got [{lo}, {hi}]"),
            ));
        }

        if self.tie_precision > MAX_TIE_PRECISION {
            return Err(ConfigError::invalid(
                "engine.tie_precision",
                format!("must be at most {MAX_TIE_PRECISION}, got {}", self.tie_precision),
            ));
        }

        let w = &self.weights;
        let weight_fields: &[(&str, f64)] = &[
            ("weights.runs", w.runs),
            ("weights.hits", w.hits),
            ("weights.walks", w.walks),
            ("weights.strikeouts", w.strikeouts),
        ];
        for (name, val) in weight_fields {
            if !val.is_finite() {
                return Err(ConfigError::invalid(name, format!("must be finite, got {val}")));
            }
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::for_season(current_season())
    }
}

// ---------------------------------------------------------------------------
// Source and output settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    StatsApi,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub base_url: String,
    /// Maximum in-flight requests against the stats API.
    pub concurrency: usize,
    pub games_csv: String,
    pub teams_csv: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            kind: SourceKind::StatsApi,
            base_url: DEFAULT_STATSAPI_URL.into(),
            concurrency: 8,
            games_csv: "data/games.csv".into(),
            teams_csv: Some("data/teams.csv".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: String,
    pub save: bool,
    pub display: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            results_dir: "results".into(),
            save: true,
            display: true,
        }
    }
}

// ---------------------------------------------------------------------------
// offrank.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire offrank.toml file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    engine: EngineSection,
    weights: ScoreWeights,
    source: SourceConfig,
    output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct EngineSection {
    season: Option<i32>,
    smoothing: f64,
    min_venue_games: u32,
    adjustment_clamp: [f64; 2],
    tie_precision: u32,
}

impl Default for EngineSection {
    fn default() -> Self {
        EngineSection {
            season: None,
            smoothing: DEFAULT_SMOOTHING,
            min_venue_games: DEFAULT_MIN_VENUE_GAMES,
            adjustment_clamp: DEFAULT_ADJUSTMENT_CLAMP,
            tie_precision: DEFAULT_TIE_PRECISION,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate configuration from TOML text. `path` is only used for
/// error messages.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let engine = EngineConfig {
        season: file.engine.season.unwrap_or_else(current_season),
        smoothing: file.engine.smoothing,
        min_venue_games: file.engine.min_venue_games,
        adjustment_clamp: ClampBounds {
            lo: file.engine.adjustment_clamp[0],
            hi: file.engine.adjustment_clamp[1],
        },
        tie_precision: file.engine.tie_precision,
        weights: file.weights,
    };

    let config = Config {
        engine,
        source: file.source,
        output: file.output,
    };

    validate(&config)?;

    Ok(config)
}

/// Load and validate configuration from an explicit file path.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let text = read_file(path)?;
    parse_config(&text, path)
}

/// Load configuration for a run.
///
/// An explicit path must exist. Without one, `config/offrank.toml` under the
/// working directory is used when present, and built-in defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = path {
        return load_config_from(path);
    }

    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    let candidate = cwd.join(CONFIG_FILE);
    if candidate.exists() {
        load_config_from(&candidate)
    } else {
        Ok(Config::default())
    }
}

/// The current calendar year, used when no season is configured.
pub fn current_season() -> i32 {
    use chrono::Datelike;
    chrono::Local::now().year()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    config.engine.validate()?;

    if config.source.concurrency == 0 {
        return Err(ConfigError::invalid("source.concurrency", "must be > 0"));
    }

    if config.source.base_url.trim().is_empty() {
        return Err(ConfigError::invalid("source.base_url", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
