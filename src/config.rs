use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listening port for the inference API
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Candidate artifact paths, checked in order at first inference.
    /// The first existing path wins; `digitd train` exports to the first.
    #[serde(default = "default_candidate_paths")]
    pub candidate_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Fraction of the train split held out for validation
    #[serde(default = "default_valid_split")]
    pub valid_split: f64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Test predictions rendered to stdout after training (0 disables)
    #[serde(default = "default_show_predictions")]
    pub show_predictions: usize,
}

fn default_port() -> u16 {
    8000
}

fn default_candidate_paths() -> Vec<PathBuf> {
    [
        "artifacts/model.mpk",
        "model.mpk",
        "../artifacts/model.mpk",
        "../model.mpk",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

fn default_epochs() -> usize {
    5
}

fn default_batch_size() -> usize {
    32
}

fn default_valid_split() -> f64 {
    0.2
}

fn default_learning_rate() -> f64 {
    1e-3
}

fn default_num_workers() -> usize {
    4
}

fn default_seed() -> u64 {
    42
}

fn default_show_predictions() -> usize {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            candidate_paths: default_candidate_paths(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            valid_split: default_valid_split(),
            learning_rate: default_learning_rate(),
            num_workers: default_num_workers(),
            seed: default_seed(),
            show_predictions: default_show_predictions(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("server.port", 8000)?
            // Load optional config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Override with environment variables (DIGITD_SERVER__PORT, etc.)
            .add_source(
                Environment::with_prefix("DIGITD")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Self = builder.build()?.try_deserialize()?;

        // Deployments select the listen port with a bare PORT variable;
        // it takes precedence over file values.
        if let Ok(port) = std::env::var("PORT") {
            cfg.server.port = port
                .parse()
                .map_err(|_| ConfigError::Message(format!("invalid PORT value: {port}")))?;
        }

        Ok(cfg)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.model.candidate_paths.is_empty() {
            errors.push("model.candidate_paths must not be empty".to_string());
        }

        if self.training.epochs == 0 {
            errors.push("training.epochs must be positive".to_string());
        }

        if self.training.batch_size == 0 {
            errors.push("training.batch_size must be positive".to_string());
        }

        if !(0.0..1.0).contains(&self.training.valid_split) {
            errors.push("training.valid_split must be in [0, 1)".to_string());
        }

        if self.training.learning_rate <= 0.0 {
            errors.push("training.learning_rate must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.model.candidate_paths.len(), 4);
        assert_eq!(
            cfg.model.candidate_paths[0],
            PathBuf::from("artifacts/model.mpk")
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn training_defaults_match_reference_script() {
        let cfg = TrainingConfig::default();
        assert_eq!(cfg.epochs, 5);
        assert_eq!(cfg.batch_size, 32);
        assert!((cfg.valid_split - 0.2).abs() < f64::EPSILON);
    }

    // The only test touching the PORT variable; keeping every mutation in
    // one test avoids races with parallel test threads.
    #[test]
    fn bare_port_env_overrides_file_and_default() {
        let dir = std::env::temp_dir().join(format!("digitd-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("default.toml"), "[server]\nport = 1234\n").unwrap();

        std::env::remove_var("PORT");
        let cfg = AppConfig::load_from(&dir).unwrap();
        assert_eq!(cfg.server.port, 1234);

        std::env::set_var("PORT", "9123");
        let cfg = AppConfig::load_from(&dir).unwrap();
        assert_eq!(cfg.server.port, 9123);

        std::env::set_var("PORT", "not-a-port");
        let err = AppConfig::load_from(&dir).unwrap_err();
        assert!(err.to_string().contains("not-a-port"));

        std::env::remove_var("PORT");
        let cfg = AppConfig::load_from(&dir).unwrap();
        assert_eq!(cfg.server.port, 1234);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.training.batch_size = 0;
        cfg.training.valid_split = 1.5;
        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
