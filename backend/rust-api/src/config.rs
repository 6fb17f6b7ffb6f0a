use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::adaptive::rules::DEFAULT_WINDOW_SIZE;
use crate::services::adaptive::ModelSource;
use crate::services::session_service::SessionDefaults;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub model_path: PathBuf,
    pub model_meta_path: PathBuf,
    /// When false, the deployment has no learned decision path at all.
    pub learned_enabled: bool,
    pub default_window_size: usize,
    pub default_rounds: u32,
    /// Idle time after which a session is dropped from memory.
    pub session_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            model_path: PathBuf::from("models/adaptive_tree.json"),
            model_meta_path: PathBuf::from("models/adaptive_meta.json"),
            learned_enabled: true,
            default_window_size: DEFAULT_WINDOW_SIZE,
            default_rounds: 12,
            session_ttl_secs: 7200,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;
        let defaults = Config::default();

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);

        let model_path = settings
            .get_string("model.path")
            .or_else(|_| env::var("MODEL_PATH"))
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);

        let model_meta_path = settings
            .get_string("model.meta_path")
            .or_else(|_| env::var("MODEL_META_PATH"))
            .map(PathBuf::from)
            .unwrap_or(defaults.model_meta_path);

        let learned_enabled = settings
            .get_bool("model.learned_enabled")
            .ok()
            .or_else(|| env::var("LEARNED_ENABLED").ok().map(|v| v != "0" && v != "false"))
            .unwrap_or(defaults.learned_enabled);

        let default_window_size = settings
            .get_int("adaptive.default_window_size")
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .or_else(|| {
                env::var("DEFAULT_WINDOW_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .filter(|v| (1..=6).contains(v))
            .unwrap_or(defaults.default_window_size);

        let default_rounds = settings
            .get_int("adaptive.default_rounds")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| env::var("DEFAULT_ROUNDS").ok().and_then(|v| v.parse().ok()))
            .filter(|v| (3..=100).contains(v))
            .unwrap_or(defaults.default_rounds);

        let session_ttl_secs = settings
            .get_int("adaptive.session_ttl_secs")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .or_else(|| env::var("SESSION_TTL_SECS").ok().and_then(|v| v.parse().ok()))
            .filter(|v| *v > 0)
            .unwrap_or(defaults.session_ttl_secs);

        Ok(Config {
            bind_addr,
            model_path,
            model_meta_path,
            learned_enabled,
            default_window_size,
            default_rounds,
            session_ttl_secs,
        })
    }

    pub fn model_source(&self) -> ModelSource {
        ModelSource::new(self.model_path.clone(), self.model_meta_path.clone())
    }

    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            window_size: self.default_window_size,
            rounds: self.default_rounds,
            session_ttl: Duration::from_secs(self.session_ttl_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 7] = [
        "BIND_ADDR",
        "MODEL_PATH",
        "MODEL_META_PATH",
        "LEARNED_ENABLED",
        "DEFAULT_WINDOW_SIZE",
        "DEFAULT_ROUNDS",
        "SESSION_TTL_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        clear_env();
        let config = Config::load().unwrap();
        assert_eq!(config.default_window_size, 3);
        assert_eq!(config.default_rounds, 12);
        assert!(config.learned_enabled);
        assert_eq!(config.model_path, PathBuf::from("models/adaptive_tree.json"));
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        env::set_var("MODEL_PATH", "/tmp/tree.json");
        env::set_var("LEARNED_ENABLED", "0");
        env::set_var("DEFAULT_WINDOW_SIZE", "5");
        let config = Config::load().unwrap();
        assert_eq!(config.model_path, PathBuf::from("/tmp/tree.json"));
        assert!(!config.learned_enabled);
        assert_eq!(config.default_window_size, 5);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_out_of_range_window_size_is_ignored() {
        clear_env();
        env::set_var("DEFAULT_WINDOW_SIZE", "40");
        let config = Config::load().unwrap();
        assert_eq!(config.default_window_size, 3);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_default_rounds_must_be_requestable() {
        clear_env();
        env::set_var("DEFAULT_ROUNDS", "2");
        assert_eq!(Config::load().unwrap().default_rounds, 12);
        env::set_var("DEFAULT_ROUNDS", "101");
        assert_eq!(Config::load().unwrap().default_rounds, 12);
        env::set_var("DEFAULT_ROUNDS", "3");
        assert_eq!(Config::load().unwrap().default_rounds, 3);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_session_ttl_from_environment() {
        clear_env();
        assert_eq!(
            Config::load().unwrap().session_defaults().session_ttl,
            Duration::from_secs(7200)
        );
        env::set_var("SESSION_TTL_SECS", "90");
        assert_eq!(
            Config::load().unwrap().session_defaults().session_ttl,
            Duration::from_secs(90)
        );
        clear_env();
    }
}
