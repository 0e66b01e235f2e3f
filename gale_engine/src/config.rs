//! Engine configuration from `gale.toml`.
//!
//! Every field has a default, and a missing or broken file falls back to the
//! defaults with a warning rather than stopping the game.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "gale.toml";

/// Runtime settings for the engine and its driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaleConfig {
    /// Overrides data directory detection.
    pub data_dir: Option<PathBuf>,
    /// Root under which each save slot gets its own directory.
    pub save_dir: PathBuf,
    pub slot: String,
    /// Fixed RNG seed; random when absent.
    pub seed: Option<u64>,
    pub wrap_width: usize,
    /// String id of the room a new game starts in.
    pub start_room: String,
    pub player_name: String,
}

impl Default for GaleConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            save_dir: PathBuf::from("saved_games"),
            slot: "default".to_string(),
            seed: None,
            wrap_width: 80,
            start_room: "village_green".to_string(),
            player_name: "Wanderer".to_string(),
        }
    }
}

/// Load configuration, falling back to defaults if the file cannot be read or parsed.
pub fn load_config(toml_path: &Path) -> GaleConfig {
    match try_load_config(toml_path) {
        Ok(config) => {
            info!("configuration loaded from '{}'", toml_path.display());
            config
        },
        Err(e) => {
            warn!(
                "Could not load configuration from '{}': {e:#}. Using defaults.",
                toml_path.display()
            );
            GaleConfig::default()
        },
    }
}

/// # Errors
/// Returns an error if the file cannot be read or parsed.
fn try_load_config(toml_path: &Path) -> Result<GaleConfig> {
    let raw = fs::read_to_string(toml_path)
        .with_context(|| format!("reading configuration from '{}'", toml_path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing configuration from '{}'", toml_path.display()))
}
