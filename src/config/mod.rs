use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Runtime bot configuration. Secrets (`DISCORD_TOKEN`, `DATABASE_URL`) stay
/// in the environment; this file carries the guild-specific knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Role names whose holders may run admin commands.
    pub authorized_roles: Vec<String>,
    /// Channel that receives the welcome embed when a member joins.
    #[serde(default)]
    pub welcome_channel_id: Option<u64>,
}

impl BotConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }
}

pub fn init_config() -> Result<BotConfig, Box<dyn std::error::Error>> {
    BotConfig::load_from_file("config/scrims.toml")
}
