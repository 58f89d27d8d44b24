use crate::domain::tuning::{TuningError, VipFiestaConfig};
use std::{env, fmt, fs, io, path::PathBuf, time::Duration};

// Runtime/server constants. Gameplay rules come from the TOML file.

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

/// Path of the rules file; defaults apply when unset.
pub fn game_config_path() -> Option<PathBuf> {
    env::var_os("VIP_FIESTA_CONFIG")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 30);
pub const MATCH_START_DELAY: Duration = Duration::from_secs(5);
// Ended matches stay reachable so clients can read the result.
pub const MATCH_END_LINGER: Duration = Duration::from_secs(10);
pub const DEFAULT_MATCH_ID: &str = "default";

#[derive(Debug)]
pub enum ConfigError {
    Read(io::Error),
    Parse(toml::de::Error),
    Invalid(TuningError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(e) => write!(f, "failed to read game config: {e}"),
            ConfigError::Parse(e) => write!(f, "failed to parse game config: {e}"),
            ConfigError::Invalid(e) => write!(f, "invalid game config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

pub fn parse_game_config(text: &str) -> Result<VipFiestaConfig, ConfigError> {
    let config: VipFiestaConfig = toml::from_str(text).map_err(ConfigError::Parse)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

pub fn load_game_config() -> Result<VipFiestaConfig, ConfigError> {
    let Some(path) = game_config_path() else {
        tracing::debug!("VIP_FIESTA_CONFIG not set; using default rules");
        return Ok(VipFiestaConfig::default());
    };
    let text = fs::read_to_string(&path).map_err(ConfigError::Read)?;
    let config = parse_game_config(&text)?;
    tracing::info!(path = %path.display(), "game config loaded");
    Ok(config)
}
