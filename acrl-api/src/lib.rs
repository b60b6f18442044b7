pub mod builders;
pub mod config;
pub mod error;
pub mod logging;
#[cfg(feature = "test-utils")]
pub mod test_utils;

use acrl_agents::agent::TrainReport;
use anyhow::Result;
use builders::build_agent;
use config::AppConfig;
use std::path::Path;
use tracing::info;

pub fn run_training(config: &AppConfig) -> Result<TrainReport> {
    let mut agent = build_agent(config)?;
    let report = agent.train()?;
    if let Some(last) = report.records.last() {
        info!(
            iterations = report.records.len(),
            avg_train_return = last.avg_train_return,
            "training finished"
        );
    }
    Ok(report)
}

/// Runs `test_iter` evaluation episodes, optionally restoring actor weights first.
pub fn run_test(config: &AppConfig, model_path: Option<&Path>, random: bool) -> Result<Vec<f32>> {
    let mut agent = build_agent(config)?;
    let scores = agent.test_interact(model_path, random)?;
    let mean = scores.iter().sum::<f32>() / scores.len().max(1) as f32;
    info!(episodes = scores.len(), mean_score = mean, "test finished");
    Ok(scores)
}
