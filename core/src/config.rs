use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

/// Configuration for a directory session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of rows published immediately after a load.
    #[serde(default = "default_initial_display_rows")]
    pub initial_display_rows: usize,

    /// Rows appended per batch while the remainder streams in.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Delay between the initial publish and the first batch append.
    #[serde(default = "default_batch_grace_ms")]
    pub batch_grace_ms: u64,

    /// Pause between consecutive batch appends.
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Quiet interval a query input must survive before a filter pass runs.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Worker fan-out for row materialization and index building.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Start a background index build automatically after each load.
    #[serde(default = "default_true")]
    pub auto_index: bool,
}

fn default_initial_display_rows() -> usize {
    500
}

fn default_batch_size() -> usize {
    2000
}

fn default_batch_grace_ms() -> u64 {
    150
}

fn default_batch_pause_ms() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|value| value.get().clamp(2, 8))
        .unwrap_or(4)
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_display_rows: default_initial_display_rows(),
            batch_size: default_batch_size(),
            batch_grace_ms: default_batch_grace_ms(),
            batch_pause_ms: default_batch_pause_ms(),
            debounce_ms: default_debounce_ms(),
            max_workers: default_max_workers(),
            auto_index: default_true(),
        }
    }
}

impl SessionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_display_rows == 0 {
            return Err("Initial display rows must be > 0".to_string());
        }

        if self.batch_size == 0 {
            return Err("Batch size must be > 0".to_string());
        }

        if self.max_workers == 0 {
            return Err("Max workers must be > 0".to_string());
        }

        Ok(())
    }

    pub fn batch_grace(&self) -> Duration {
        Duration::from_millis(self.batch_grace_ms)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_display_rows, 500);
        assert_eq!(config.batch_size, 2000);
        assert_eq!(config.debounce_ms, 300);
        assert!(config.max_workers > 0);
        assert!(config.auto_index);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = SessionConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_workers_are_rejected() {
        let config = SessionConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
