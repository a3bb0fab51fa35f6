//! Configuration handling for the genofind CLI
//!
//! Supports loading configuration from genofind.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use genofind_core::IndexParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    /// Build parameters used when the command line does not override them
    pub index: IndexParams,
    pub query: QueryConfig,
    pub pcr: PcrConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Worker threads for queries, 0 for one per core
    pub threads: usize,

    /// Copy index tables into memory instead of mapping the file
    pub no_mmap: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Skip query tiles touching lower-case bases
    pub mask_lower: bool,

    /// Clumps printed per query and strand
    pub max_clumps: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            mask_lower: false,
            max_clumps: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PcrConfig {
    pub min_distance: u64,
    pub max_distance: u64,
}

impl Default for PcrConfig {
    fn default() -> Self {
        Self {
            min_distance: 0,
            max_distance: 4000,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from("genofind.toml");
                if default_path.exists() {
                    log::info!("Loading configuration from: genofind.toml");
                    Self::load_from_file(&default_path)?
                } else {
                    log::debug!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }
}
