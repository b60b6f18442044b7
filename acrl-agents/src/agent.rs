use crate::{
    learner::{Learner, UpdateContext},
    render::pace_frame,
};
use acrl_candle_lm::{
    ModelConfig,
    actor_critic::{ActorCritic, select_device},
};
use acrl_core::{
    Algorithm,
    benchmark::Benchmark,
    env::{Env, Space, state_tensor},
    error::EnvError,
    metrics::{EpisodeRecord, IterationRecord, MetricsSink, NoopMetrics},
    policy::Policy,
    rng::{self, RNG},
    rollout::{RolloutConfig, RolloutHooks, rollout},
    trajectory::TrajectoryBuffer,
};
use anyhow::Result;
use candle_core::Tensor;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct InvalidAgentConfig(pub String);

fn invalid(msg: &str) -> InvalidAgentConfig {
    InvalidAgentConfig(msg.into())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub benchmark: Benchmark,
    pub env: String,
    pub seed: u64,
    pub gpu: bool,
    pub render: bool,
    /// Writes episode and iteration records to `log_dir/metrics.jsonl`.
    pub wandb: bool,
    pub log_dir: PathBuf,
    pub log_interval: usize,
    pub model_dir: PathBuf,
    pub save_interval: usize,
    pub max_iter: usize,
    pub batch_size: usize,
    pub total_sample_size: usize,
    pub test_iter: usize,
    pub gamma: f32,
    pub lamda: f32,
    pub actor_lr: f64,
    pub critic_lr: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_grad_norm: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_episode_steps: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            benchmark: Benchmark::Gym,
            env: "Pendulum-v1".into(),
            seed: 500,
            gpu: false,
            render: false,
            wandb: false,
            log_dir: PathBuf::from("logs"),
            log_interval: 1,
            model_dir: PathBuf::from("save_model"),
            save_interval: 100,
            max_iter: 1000,
            batch_size: 64,
            total_sample_size: 2048,
            test_iter: 10,
            gamma: 0.99,
            lamda: 0.98,
            actor_lr: 3e-4,
            critic_lr: 3e-4,
            max_grad_norm: None,
            max_episode_steps: None,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), InvalidAgentConfig> {
        if self.env.is_empty() {
            return Err(invalid("agent.env must not be empty"));
        }
        if self.log_interval == 0 {
            return Err(invalid("agent.log_interval must be > 0"));
        }
        if self.save_interval == 0 {
            return Err(invalid("agent.save_interval must be > 0"));
        }
        if self.max_iter == 0 {
            return Err(invalid("agent.max_iter must be > 0"));
        }
        if self.batch_size == 0 {
            return Err(invalid("agent.batch_size must be > 0"));
        }
        if self.total_sample_size == 0 {
            return Err(invalid("agent.total_sample_size must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(invalid("agent.gamma must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.lamda) {
            return Err(invalid("agent.lamda must be in [0, 1]"));
        }
        if self.actor_lr <= 0.0 {
            return Err(invalid("agent.actor_lr must be > 0"));
        }
        if self.critic_lr <= 0.0 {
            return Err(invalid("agent.critic_lr must be > 0"));
        }
        if self.max_grad_norm.is_some_and(|norm| norm <= 0.0) {
            return Err(invalid("agent.max_grad_norm must be > 0"));
        }
        if self.max_episode_steps == Some(0) {
            return Err(invalid("agent.max_episode_steps must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainReport {
    pub records: Vec<IterationRecord>,
    /// Actor checkpoints in the order they were written.
    pub checkpoints: Vec<PathBuf>,
}

/// Renders after every step and forwards finished episodes to the metrics sink.
struct HarnessHooks<'a> {
    render: bool,
    benchmark: Benchmark,
    metrics: &'a mut dyn MetricsSink,
}

impl<E: Env + ?Sized> RolloutHooks<E> for HarnessHooks<'_> {
    fn post_step_hook(&mut self, env: &mut E, _step: usize, step_started: Instant) -> Result<()> {
        if self.render {
            render(env, self.benchmark, step_started)?;
        }
        Ok(())
    }

    fn post_episode_hook(&mut self, record: &EpisodeRecord) -> Result<()> {
        self.metrics.log_episode(record)
    }
}

fn render<E: Env + ?Sized>(env: &mut E, benchmark: Benchmark, step_started: Instant) -> Result<()> {
    env.render()?;
    if benchmark == Benchmark::DmControl {
        pace_frame(step_started);
    }
    Ok(())
}

/// The actor-critic training harness: owns the environment, the networks and the history, and
/// leaves the update itself to `L`.
pub struct ActorCriticAgent<E: Env, L: Learner> {
    pub env: E,
    pub model: ActorCritic,
    pub learner: L,
    pub config: AgentConfig,
    pub history: TrajectoryBuffer,
    pub global_episode: usize,
    state_dim: usize,
    action_dim: usize,
    metrics: Box<dyn MetricsSink>,
}

impl<E: Env, L: Learner> ActorCriticAgent<E, L> {
    pub fn new(env: E, config: AgentConfig, model_config: &ModelConfig, learner: L) -> Result<Self> {
        config.validate()?;
        rng::seed(config.seed);
        let description = env.env_description();
        if let Space::Discrete(_) = description.action_space {
            return Err(EnvError::DiscreteActions.into());
        }
        let state_dim = description.observation_size();
        let action_dim = description.action_size();
        info!(
            benchmark = %env.benchmark(),
            env = %config.env,
            state_dim,
            action_dim,
            action_space = ?description.action_space,
            "environment ready"
        );
        let device = select_device(config.gpu)?;
        let model = ActorCritic::build(
            state_dim,
            action_dim,
            model_config,
            config.actor_lr,
            config.critic_lr,
            config.max_grad_norm,
            &device,
        )?;
        info!(learner = learner.name(), device = ?device, "agent ready");
        Ok(Self {
            env,
            model,
            learner,
            config,
            history: TrajectoryBuffer::default(),
            global_episode: 0,
            state_dim,
            action_dim,
            metrics: Box::new(NoopMetrics),
        })
    }

    pub fn with_metrics(mut self, metrics: Box<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    pub fn save_model(&self, iter: usize, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        self.model.save_model(iter, dir)
    }

    fn rollout_config(&self) -> RolloutConfig {
        RolloutConfig {
            total_sample_size: self.config.total_sample_size,
            max_episode_steps: self.config.max_episode_steps,
        }
    }

    pub fn train(&mut self) -> Result<TrainReport> {
        let rollout_config = self.rollout_config();
        let benchmark = self.env.benchmark();
        let mut report = TrainReport::default();
        for iter in 0..self.config.max_iter {
            self.history.clear();
            let mut hooks = HarnessHooks {
                render: self.config.render,
                benchmark,
                metrics: self.metrics.as_mut(),
            };
            let stats = rollout(
                &mut self.env,
                &self.model.actor,
                &mut self.history,
                &rollout_config,
                &mut self.global_episode,
                &mut hooks,
            )?;
            let ctx = UpdateContext {
                iter,
                gamma: self.config.gamma,
                lamda: self.config.lamda,
                batch_size: self.config.batch_size,
            };
            let update = self.learner.update(&mut self.model, &self.history, &ctx)?;
            let record = IterationRecord {
                iter,
                sample_num: stats.sample_num,
                episodes: stats.episodes,
                avg_train_reward: stats.avg_train_reward,
                avg_train_return: stats.avg_train_return,
                avg_steps: stats.avg_steps,
                policy_loss: update.policy_loss,
                value_loss: update.value_loss,
                entropy: update.entropy,
            };
            if iter % self.config.log_interval == 0 {
                info!(
                    iter,
                    sample_num = record.sample_num,
                    episodes = record.episodes,
                    avg_train_reward = record.avg_train_reward,
                    avg_train_return = record.avg_train_return,
                    avg_steps = record.avg_steps,
                    policy_loss = record.policy_loss,
                    value_loss = record.value_loss,
                    "iteration done"
                );
                self.metrics.log_iteration(&record)?;
            }
            report.records.push(record);
            if iter % self.config.save_interval == 0 || iter + 1 == self.config.max_iter {
                let (actor_path, _) = self.model.save_model(iter, &self.config.model_dir)?;
                report.checkpoints.push(actor_path);
            }
        }
        self.metrics.flush()?;
        Ok(report)
    }

    /// Plays `test_iter` episodes and returns their scores. Weights are loaded from `model_path`
    /// when given. `random` ignores the actor and acts uniformly inside the action bounds
    /// (dm_control) or with standard normal noise (gym). gym envs render every step, dm_control
    /// envs only when `render` is set.
    pub fn test_interact(&mut self, model_path: Option<&Path>, random: bool) -> Result<Vec<f32>> {
        if let Some(model_path) = model_path {
            self.model.load_actor(model_path)?;
        }
        let benchmark = self.env.benchmark();
        let action_space = self.env.env_description().action_space;
        let mut scores = Vec::with_capacity(self.config.test_iter);
        for ep in 0..self.config.test_iter {
            let mut state = self.env.reset(rng::next_seed())?;
            let mut score = 0.;
            let mut steps = 0;
            loop {
                let tic = Instant::now();
                let action = if random {
                    random_action(benchmark, &action_space)?
                } else {
                    self.model.actor.get_action(&state)?
                };
                let snapshot = self.env.step(&action)?;
                if benchmark == Benchmark::Gym || self.config.render {
                    render(&mut self.env, benchmark, tic)?;
                }
                score += snapshot.reward;
                steps += 1;
                state = snapshot.state;
                let out_of_steps = self
                    .config
                    .max_episode_steps
                    .is_some_and(|max| steps >= max);
                if snapshot.terminated || snapshot.truncated || out_of_steps {
                    break;
                }
            }
            info!(episode = ep, score, steps, "test episode done");
            scores.push(score);
        }
        Ok(scores)
    }
}

impl<E: Env, L: Learner> Algorithm for ActorCriticAgent<E, L> {
    type Report = TrainReport;

    fn train(&mut self) -> Result<Self::Report> {
        ActorCriticAgent::train(self)
    }
}

/// A uniform draw inside the action bounds for dm_control, standard normal noise for gym.
pub fn random_action(benchmark: Benchmark, action_space: &Space) -> Result<Tensor> {
    let size = action_space.size();
    let values: Vec<f32> = RNG.with_borrow_mut(|rng| match (benchmark, action_space.bounds()) {
        (Benchmark::DmControl, Some((min, max))) => min
            .iter()
            .zip(max)
            .map(|(lo, hi)| lo + (hi - lo) * rng.random::<f32>())
            .collect(),
        (Benchmark::DmControl, None) => (0..size).map(|_| rng.random_range(-1f32..1.)).collect(),
        (Benchmark::Gym, _) => (0..size)
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect(),
    });
    state_tensor(values)
}
