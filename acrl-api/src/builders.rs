use crate::config::{AlgorithmKind, AppConfig};
use acrl_agents::{
    LearnerKind, a2c::A2c, agent::ActorCriticAgent, agent::AgentConfig, learner::Learner,
    ppo::Ppo,
};
use acrl_core::metrics::{JsonlMetrics, MetricsSink, NoopMetrics};
use acrl_gym::{EnvKind, make_env};
use anyhow::Result;
use tracing::info;

pub type HarnessAgent = ActorCriticAgent<EnvKind, LearnerKind>;

pub fn build_learner(config: &AppConfig) -> LearnerKind {
    match config.algorithm {
        AlgorithmKind::Ppo => LearnerKind::Ppo(Ppo::new(config.ppo)),
        AlgorithmKind::A2c => LearnerKind::A2c(A2c::new(config.a2c)),
    }
}

pub fn build_env(agent: &AgentConfig) -> Result<EnvKind> {
    make_env(agent.benchmark, &agent.env, agent.render, agent.seed)
}

/// `log_dir/metrics.jsonl` when `wandb` is set, nothing otherwise.
pub fn build_metrics(agent: &AgentConfig) -> Result<Box<dyn MetricsSink>> {
    if !agent.wandb {
        return Ok(Box::new(NoopMetrics));
    }
    let path = agent.log_dir.join("metrics.jsonl");
    info!(path = %path.display(), "writing metrics");
    Ok(Box::new(JsonlMetrics::create(&path)?))
}

pub fn build_agent(config: &AppConfig) -> Result<HarnessAgent> {
    config.validate()?;
    let env = build_env(&config.agent)?;
    let learner = build_learner(config);
    let metrics = build_metrics(&config.agent)?;
    info!(algorithm = learner.name(), "building agent");
    Ok(ActorCriticAgent::new(env, config.agent.clone(), &config.model, learner)?.with_metrics(metrics))
}
