//! Config for uac-topology binary
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind, Result};

const CONF_DIR: &str = "uac-topology";
const CONF_NAME: &str = "config.json";

/// Defaults for the binary; command line flags take precedence
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Config {
    /// AudioControl interface to decode when none is passed
    pub control_interface: Option<u8>,
    /// Candidate sample rates merged into every UAC2 alternate setting
    pub sample_rates: Vec<u32>,
    /// Output json rather than a text dump
    pub json: bool,
    /// Input files are hex text rather than raw bytes
    pub hex: bool,
}

impl Config {
    /// Default new
    pub fn new() -> Config {
        Config {
            ..Default::default()
        }
    }

    /// Get example [`Config`]
    pub fn example() -> Config {
        Config {
            control_interface: Some(0),
            sample_rates: vec![44100, 48000, 88200, 96000, 176400, 192000],
            ..Default::default()
        }
    }

    /// Attempt to read from .json format config at `file_path`
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Config> {
        let f = File::open(file_path.as_ref()).map_err(|e| {
            Error::new(
                ErrorKind::Io,
                &format!("Failed to open config {:?}: {}", file_path.as_ref(), e),
            )
        })?;
        let mut br = BufReader::new(f);
        let mut data = String::new();

        br.read_to_string(&mut data)?;
        serde_json::from_str::<Config>(&data).map_err(|e| {
            Error::new(
                ErrorKind::Config,
                &format!("Failed to parse config {:?}: {}", file_path.as_ref(), e),
            )
        })
    }

    /// Default config location in the user config dir; `None` if the platform has none
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONF_DIR).join(CONF_NAME))
    }

    /// Load from [`Config::default_path`], falling back to default if missing
    pub fn sys() -> Result<Config> {
        match Self::default_path() {
            Some(p) if p.exists() => {
                log::info!("Loading config from {:?}", p);
                Self::from_file(p)
            }
            _ => {
                log::debug!("No system config, using default");
                Ok(Config::new())
            }
        }
    }
}
