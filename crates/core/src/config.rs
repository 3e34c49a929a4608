use serde::{Deserialize, Serialize};

/// Scheduler knobs as they appear in the config file. Durations are plain
/// millisecond integers; the scheduler crate converts them at its boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    pub dispatch_concurrency: usize,
    pub schedule_loop_interval_ms: u64,
    pub max_retries: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            dispatch_concurrency: 8,
            schedule_loop_interval_ms: 500,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    pub poll_interval_ms: u64,
    pub stall_threshold_ms: u64,
    pub default_timeout_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            stall_threshold_ms: 60_000,
            default_timeout_ms: 300_000,
        }
    }
}

/// Top-level configuration aggregating all sub-configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HivemindConfig {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub monitor: MonitorSettings,
}

/// Load configuration from a TOML file.
/// Falls back to defaults if the file doesn't exist or fails to parse.
pub fn load_config(path: &str) -> HivemindConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}, using defaults", path, e);
                HivemindConfig::default()
            }
        },
        Err(_) => {
            tracing::debug!("Config file {} not found, using defaults", path);
            HivemindConfig::default()
        }
    }
}

/// Save configuration to a TOML file.
/// Creates parent directories if they don't exist.
pub fn save_config(config: &HivemindConfig, path: &str) -> anyhow::Result<()> {
    let path = std::path::Path::new(path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    tracing::info!("Config saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config("/nonexistent/hivemind.toml");
        assert_eq!(config.scheduler.max_retries, 3);
        assert_eq!(config.monitor.poll_interval_ms, 10_000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join("hivemind-config-test");
        let path = dir.join("config.toml");
        let path = path.to_string_lossy().into_owned();

        let mut config = HivemindConfig::default();
        config.scheduler.max_retries = 5;
        config.monitor.stall_threshold_ms = 45_000;
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path);
        assert_eq!(loaded.scheduler.max_retries, 5);
        assert_eq!(loaded.monitor.stall_threshold_ms, 45_000);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: HivemindConfig = toml::from_str("[scheduler]\nmax_retries = 1\ndispatch_concurrency = 2\nschedule_loop_interval_ms = 100\n").unwrap();
        assert_eq!(config.scheduler.max_retries, 1);
        assert_eq!(config.monitor.default_timeout_ms, 300_000);
    }
}
