//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::game::MatchSettings;

/// Runner configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding `0.txt` .. `6.txt`
    pub levels_dir: PathBuf,
    /// Optional JSON input script; without it both combatants stand idle
    pub transcript_path: Option<PathBuf>,
    /// Base RNG seed for the campaign
    pub match_seed: u64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Pace ticks against the wall clock instead of running flat out
    pub realtime: bool,
    /// Hard stop for a run
    pub max_ticks: u64,
    /// Viewport width in pixels, used by the camera
    pub viewport_width: f32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = MatchSettings::default();

        Ok(Self {
            levels_dir: env::var("LEVELS_DIR")
                .map(PathBuf::from)
                .map_err(|_| ConfigError::Missing("LEVELS_DIR"))?,
            transcript_path: env::var("TRANSCRIPT_PATH").ok().map(PathBuf::from),
            match_seed: parse_or("MATCH_SEED", defaults.seed)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            realtime: parse_or("REALTIME", false)?,
            max_ticks: parse_or("MAX_TICKS", 36_000)?,
            viewport_width: parse_or("VIEWPORT_WIDTH", defaults.viewport_width)?,
        })
    }

    /// Campaign settings derived from this configuration
    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            seed: self.match_seed,
            viewport_width: self.viewport_width,
            ..MatchSettings::default()
        }
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
