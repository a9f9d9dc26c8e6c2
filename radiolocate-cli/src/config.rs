//! INI configuration file for the demo host.
//!
//! Example:
//!
//! ```ini
//! [fusion]
//! shrink_factor = 0.5
//! accuracy_floor_m = 10.0
//! entry_ttl_days = 30
//!
//! [provider]
//! protocol = v2
//!
//! [logging]
//! directory = logs
//! file = radiolocate.log
//! ```
//!
//! Every key is optional; missing keys fall back to the engine
//! defaults. Unknown values are rejected rather than silently ignored.

use std::path::Path;
use std::time::Duration;

use ini::Ini;
use radiolocate::{EngineConfig, FusionConfig, ProtocolVariant, DEFAULT_ENTRY_TTL};

use crate::error::CliError;

/// Default log directory.
const DEFAULT_LOG_DIR: &str = "logs";

/// Default log filename.
const DEFAULT_LOG_FILE: &str = "radiolocate.log";

/// Parsed configuration file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Engine configuration assembled from the `[fusion]` and
    /// `[provider]` sections.
    pub engine: EngineConfig,
    /// Log directory from `[logging] directory`.
    pub log_dir: String,
    /// Log filename from `[logging] file`.
    pub log_file: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            log_dir: DEFAULT_LOG_DIR.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl ConfigFile {
    /// Load a configuration file, falling back to defaults for any
    /// missing section or key.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if the file cannot be read or a
    /// present value does not parse.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| CliError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, CliError> {
        let mut config = Self::default();

        if let Some(fusion) = ini.section(Some("fusion")) {
            let mut fc = FusionConfig::default();
            if let Some(value) = fusion.get("shrink_factor") {
                fc.shrink_factor = parse_f64("fusion.shrink_factor", value)?;
            }
            if let Some(value) = fusion.get("accuracy_floor_m") {
                fc.accuracy_floor_m = parse_f64("fusion.accuracy_floor_m", value)?;
            }
            config.engine = config.engine.with_fusion(fc);
            if let Some(value) = fusion.get("entry_ttl_days") {
                let days = parse_f64("fusion.entry_ttl_days", value)?;
                if !days.is_finite() || days < 0.0 {
                    return Err(CliError::Config(format!(
                        "fusion.entry_ttl_days must be non-negative, got '{value}'"
                    )));
                }
                let ttl = Duration::from_secs_f64(days * 86_400.0);
                config.engine = config.engine.with_entry_ttl(ttl);
            } else {
                config.engine = config.engine.with_entry_ttl(DEFAULT_ENTRY_TTL);
            }
        }

        if let Some(provider) = ini.section(Some("provider")) {
            if let Some(value) = provider.get("protocol") {
                let protocol = ProtocolVariant::from_name(value).ok_or_else(|| {
                    CliError::Config(format!("unknown provider.protocol '{value}'"))
                })?;
                config.engine = config.engine.with_protocol(protocol);
            }
        }

        if let Some(logging) = ini.section(Some("logging")) {
            if let Some(value) = logging.get("directory") {
                config.log_dir = value.to_string();
            }
            if let Some(value) = logging.get("file") {
                config.log_file = value.to_string();
            }
        }

        Ok(config)
    }
}

fn parse_f64(key: &str, value: &str) -> Result<f64, CliError> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("{key} must be a number, got '{value}'")))
}
