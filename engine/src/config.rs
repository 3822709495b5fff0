use serde::{Deserialize, Serialize};
use std::io::ErrorKind;

pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Tick-speed presets for the driver's difficulty menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn tick_interval_ms(self) -> u32 {
        match self {
            Difficulty::Easy => 350,
            Difficulty::Medium => 200,
            Difficulty::Hard => 50,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct GameConfig {
    pub rows: u32,
    pub columns: u32,
    pub difficulty: Difficulty,
    pub food_expiry_enabled: bool,
    pub food_expiry_ms: u32,
    pub win_occupancy_threshold: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: 15,
            columns: 15,
            difficulty: Difficulty::Easy,
            food_expiry_enabled: true,
            food_expiry_ms: 5000,
            win_occupancy_threshold: 0.05,
        }
    }
}

impl Validate for GameConfig {
    fn validate(&self) -> Result<(), String> {
        if self.rows < 1 || self.columns < 1 {
            return Err("rows and columns must be at least 1".to_string());
        }
        if self.rows > 100 || self.columns > 100 {
            return Err("rows and columns must not exceed 100".to_string());
        }
        if self.food_expiry_enabled && self.food_expiry_ms < 500 {
            return Err("food_expiry_ms must be at least 500".to_string());
        }
        if !(self.win_occupancy_threshold > 0.0 && self.win_occupancy_threshold <= 1.0) {
            return Err(
                "win_occupancy_threshold must be greater than 0 and at most 1".to_string(),
            );
        }
        Ok(())
    }
}

/// Reads a YAML config from `path`. A missing file yields the default
/// config; unreadable, unparsable or invalid content is an error.
pub fn load_config(path: &str) -> Result<GameConfig, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(GameConfig::default()),
        Err(err) => return Err(format!("Failed to read config file: {}", err)),
    };

    let config: GameConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("Failed to deserialize config: {}", e))?;
    config
        .validate()
        .map_err(|e| format!("Config validation error: {}", e))?;
    Ok(config)
}

pub fn save_config(path: &str, config: &GameConfig) -> Result<(), String> {
    config
        .validate()
        .map_err(|e| format!("Config validation error: {}", e))?;
    let content = serde_yaml_ng::to_string(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {}", e))
}
