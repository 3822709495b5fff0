use std::time::Duration;

use crate::config::GameConfig;

/// Engine-facing session parameters, produced from a validated `GameConfig`
/// or built directly by a driver.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub rows: usize,
    pub columns: usize,
    pub tick_interval: Duration,
    pub food_expiry: Option<Duration>,
    pub win_occupancy: f64,
}

impl SessionSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.rows < 1 || self.columns < 1 {
            return Err("Rows and columns must be at least 1".to_string());
        }
        if self.rows > 100 || self.columns > 100 {
            return Err("Rows and columns must not exceed 100".to_string());
        }
        if self.tick_interval < Duration::from_millis(50)
            || self.tick_interval > Duration::from_millis(5000)
        {
            return Err("Tick interval must be between 50ms and 5000ms".to_string());
        }
        if let Some(food_expiry) = self.food_expiry
            && food_expiry < Duration::from_millis(500)
        {
            return Err("Food expiry must be at least 500ms".to_string());
        }
        if !(self.win_occupancy > 0.0 && self.win_occupancy <= 1.0) {
            return Err("Win occupancy threshold must be greater than 0 and at most 1".to_string());
        }
        Ok(())
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&GameConfig::default())
    }
}

impl From<&GameConfig> for SessionSettings {
    fn from(config: &GameConfig) -> Self {
        let food_expiry = if config.food_expiry_enabled {
            Some(Duration::from_millis(config.food_expiry_ms as u64))
        } else {
            None
        };

        Self {
            rows: config.rows as usize,
            columns: config.columns as usize,
            tick_interval: Duration::from_millis(config.difficulty.tick_interval_ms() as u64),
            food_expiry,
            win_occupancy: config.win_occupancy_threshold,
        }
    }
}
