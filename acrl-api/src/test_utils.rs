use crate::config::{AlgorithmKind, AppConfig};
use acrl_agents::{agent::AgentConfig, ppo::PpoConfig};
use acrl_candle_lm::ModelConfig;
use acrl_core::benchmark::Benchmark;
use std::path::Path;

/// A configuration that trains for a couple of short iterations, writing everything below `dir`.
pub fn tiny_config(dir: &Path, benchmark: Benchmark, env: &str) -> AppConfig {
    AppConfig {
        algorithm: AlgorithmKind::Ppo,
        agent: AgentConfig {
            benchmark,
            env: env.into(),
            seed: 7,
            log_dir: dir.join("logs"),
            model_dir: dir.join("models"),
            max_iter: 2,
            save_interval: 1,
            batch_size: 16,
            total_sample_size: 40,
            test_iter: 2,
            max_episode_steps: Some(20),
            ..Default::default()
        },
        model: ModelConfig {
            hidden_size: vec![16],
            ..Default::default()
        },
        ppo: PpoConfig {
            ppo_epochs: 2,
            ..Default::default()
        },
        ..Default::default()
    }
}
