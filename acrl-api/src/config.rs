use crate::error::ConfigError;
use acrl_agents::{a2c::A2cConfig, agent::AgentConfig, ppo::PpoConfig};
use acrl_candle_lm::ModelConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    #[default]
    Ppo,
    A2c,
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub algorithm: AlgorithmKind,
    pub agent: AgentConfig,
    pub model: ModelConfig,
    pub ppo: PpoConfig,
    pub a2c: A2cConfig,
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Validation(msg.into())
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// The default configuration rendered as TOML.
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.agent
            .validate()
            .map_err(|err| ConfigError::Validation(err.0))?;
        if self.model.hidden_size.is_empty() {
            return Err(invalid("model.hidden_size must not be empty"));
        }
        if self.model.hidden_size.contains(&0) {
            return Err(invalid("model.hidden_size entries must be > 0"));
        }
        if self.ppo.ppo_epochs == 0 {
            return Err(invalid("ppo.ppo_epochs must be > 0"));
        }
        if self.ppo.clip_param <= 0.0 {
            return Err(invalid("ppo.clip_param must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acrl_candle_lm::sequential::Activation;
    use acrl_core::benchmark::Benchmark;

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn default_toml_round_trips() -> anyhow::Result<()> {
        let content = AppConfig::default_toml()?;
        assert!(content.contains("[agent]"));
        assert!(content.contains("[ppo]"));
        assert_eq!(AppConfig::from_toml(&content)?, AppConfig::default());
        Ok(())
    }

    #[test]
    fn partial_files_fill_in_defaults() -> anyhow::Result<()> {
        let config = AppConfig::from_toml(
            r#"
            algorithm = "a2c"

            [agent]
            benchmark = "dm_control"
            env = "point_mass-easy"
            max_grad_norm = 0.5

            [model]
            hidden_size = [32]
            activation = "relu"
            "#,
        )?;
        assert_eq!(config.algorithm, AlgorithmKind::A2c);
        assert_eq!(config.agent.benchmark, Benchmark::DmControl);
        assert_eq!(config.agent.max_grad_norm, Some(0.5));
        assert_eq!(config.agent.gamma, AgentConfig::default().gamma);
        assert_eq!(config.model.hidden_size, vec![32]);
        assert_eq!(config.model.activation, Activation::Relu);
        Ok(())
    }

    #[test]
    fn unknown_benchmark_is_a_parse_error() {
        let err = AppConfig::from_toml("[agent]\nbenchmark = \"atari\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let cases: Vec<(fn(&mut AppConfig), &str)> = vec![
            (|c| c.agent.gamma = 1.5, "agent.gamma"),
            (|c| c.agent.lamda = -0.1, "agent.lamda"),
            (|c| c.agent.actor_lr = 0.0, "agent.actor_lr"),
            (|c| c.agent.critic_lr = -1.0, "agent.critic_lr"),
            (|c| c.agent.batch_size = 0, "agent.batch_size"),
            (|c| c.agent.total_sample_size = 0, "agent.total_sample_size"),
            (|c| c.agent.save_interval = 0, "agent.save_interval"),
            (|c| c.agent.log_interval = 0, "agent.log_interval"),
            (|c| c.agent.max_iter = 0, "agent.max_iter"),
            (|c| c.model.hidden_size.clear(), "model.hidden_size"),
            (|c| c.ppo.clip_param = 0.0, "ppo.clip_param"),
        ];
        for (mutate, field) in cases {
            let mut config = AppConfig::default();
            mutate(&mut config);
            match config.validate() {
                Err(ConfigError::Validation(msg)) => assert!(msg.starts_with(field), "{msg}"),
                other => panic!("{field}: expected a validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_file_falls_back_to_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = AppConfig::load_or_default(&dir.path().join("missing.toml"))?;
        assert_eq!(config, AppConfig::default());
        assert!(matches!(
            AppConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::FileRead { .. })
        ));
        Ok(())
    }
}
