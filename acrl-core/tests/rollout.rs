use acrl_core::{
    benchmark::Benchmark,
    env::{Env, EnvironmentDescription, SnapShot, Space, state_tensor},
    metrics::EpisodeRecord,
    policy::Policy,
    rollout::{NoRolloutHooks, RolloutConfig, RolloutHooks, rollout},
    trajectory::TrajectoryBuffer,
};
use anyhow::Result;
use candle_core::{Device, Tensor};
use std::time::Instant;

/// Returns the rewards 0, 1, 2, 3 and truncates after `episode_len` steps.
struct DummyRewardEnv {
    t: usize,
    episode_len: usize,
    resets: usize,
}

impl DummyRewardEnv {
    fn new(episode_len: usize) -> Self {
        Self {
            t: 0,
            episode_len,
            resets: 0,
        }
    }
}

impl Env for DummyRewardEnv {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        self.t = 0;
        self.resets += 1;
        state_tensor(vec![0.])
    }

    fn step(&mut self, _action: &Tensor) -> Result<SnapShot> {
        let reward = (self.t % 4) as f32;
        self.t += 1;
        Ok(SnapShot {
            state: state_tensor(vec![self.t as f32])?,
            reward,
            terminated: false,
            truncated: self.t == self.episode_len,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continous_from_dims(&[1]),
            Space::bounded(vec![-1.], vec![1.]),
        )
    }

    fn benchmark(&self) -> Benchmark {
        Benchmark::Gym
    }
}

/// Never ends an episode on its own.
struct EndlessEnv;

impl Env for EndlessEnv {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        state_tensor(vec![0.])
    }

    fn step(&mut self, _action: &Tensor) -> Result<SnapShot> {
        Ok(SnapShot {
            state: state_tensor(vec![0.])?,
            reward: 1.,
            terminated: false,
            truncated: false,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continous_from_dims(&[1]),
            Space::continous_from_dims(&[1]),
        )
    }

    fn benchmark(&self) -> Benchmark {
        Benchmark::Gym
    }
}

struct ZeroPolicy;

impl Policy for ZeroPolicy {
    fn get_action(&self, _observation: &Tensor) -> Result<Tensor> {
        state_tensor(vec![0.])
    }

    fn log_probs(&self, states: &Tensor, _actions: &Tensor) -> Result<Tensor> {
        Ok(Tensor::zeros(states.dim(0)?, candle_core::DType::F32, &Device::Cpu)?)
    }

    fn entropy(&self) -> Result<Tensor> {
        Ok(Tensor::new(0f32, &Device::Cpu)?)
    }

    fn std(&self) -> Result<f32> {
        Ok(0.)
    }
}

#[derive(Default)]
struct CountingHooks {
    steps: usize,
    episodes: Vec<EpisodeRecord>,
}

impl<E: Env> RolloutHooks<E> for CountingHooks {
    fn post_step_hook(&mut self, _env: &mut E, _step: usize, _started: Instant) -> Result<()> {
        self.steps += 1;
        Ok(())
    }

    fn post_episode_hook(&mut self, record: &EpisodeRecord) -> Result<()> {
        self.episodes.push(*record);
        Ok(())
    }
}

#[test]
fn collects_whole_episodes_past_the_sample_target() -> Result<()> {
    let mut env = DummyRewardEnv::new(4);
    let mut history = TrajectoryBuffer::default();
    let mut global_episode = 0;
    let config = RolloutConfig {
        total_sample_size: 6,
        max_episode_steps: None,
    };
    let stats = rollout(
        &mut env,
        &ZeroPolicy,
        &mut history,
        &config,
        &mut global_episode,
        &mut NoRolloutHooks,
    )?;
    assert_eq!(stats.sample_num, 8);
    assert_eq!(stats.episodes, 2);
    assert_eq!(env.resets, 2);
    assert_eq!(global_episode, 2);
    assert_eq!(history.len(), 8);
    assert_eq!(history.masks, vec![1., 1., 1., 0., 1., 1., 1., 0.]);
    // every episode earns 0 + 1 + 2 + 3
    assert_eq!(stats.avg_train_return, 6.);
    assert_eq!(stats.avg_train_reward, 1.5);
    assert_eq!(stats.avg_steps, 4.);
    Ok(())
}

#[test]
fn stored_state_is_the_one_the_action_was_taken_in() -> Result<()> {
    let mut env = DummyRewardEnv::new(3);
    let mut history = TrajectoryBuffer::default();
    let config = RolloutConfig {
        total_sample_size: 1,
        max_episode_steps: None,
    };
    rollout(
        &mut env,
        &ZeroPolicy,
        &mut history,
        &config,
        &mut 0,
        &mut NoRolloutHooks,
    )?;
    let states = history.stacked_states()?.flatten_all()?.to_vec1::<f32>()?;
    assert_eq!(states, vec![0., 1., 2.]);
    Ok(())
}

#[test]
fn zero_sample_target_runs_nothing() -> Result<()> {
    let mut env = DummyRewardEnv::new(4);
    let mut history = TrajectoryBuffer::default();
    let config = RolloutConfig::default();
    let stats = rollout(
        &mut env,
        &ZeroPolicy,
        &mut history,
        &config,
        &mut 0,
        &mut NoRolloutHooks,
    )?;
    assert_eq!(stats.sample_num, 0);
    assert_eq!(stats.avg_train_return, 0.);
    assert_eq!(env.resets, 0);
    assert!(history.is_empty());
    Ok(())
}

#[test]
fn max_episode_steps_bounds_endless_episodes() -> Result<()> {
    let mut history = TrajectoryBuffer::default();
    let config = RolloutConfig {
        total_sample_size: 10,
        max_episode_steps: Some(5),
    };
    let stats = rollout(
        &mut EndlessEnv,
        &ZeroPolicy,
        &mut history,
        &config,
        &mut 0,
        &mut NoRolloutHooks,
    )?;
    assert_eq!(stats.episodes, 2);
    assert_eq!(history.episodes(), vec![0..5, 5..10]);
    Ok(())
}

#[test]
fn hooks_see_every_step_and_episode() -> Result<()> {
    let mut env = DummyRewardEnv::new(2);
    let mut history = TrajectoryBuffer::default();
    let mut hooks = CountingHooks::default();
    let mut global_episode = 10;
    let config = RolloutConfig {
        total_sample_size: 4,
        max_episode_steps: None,
    };
    rollout(
        &mut env,
        &ZeroPolicy,
        &mut history,
        &config,
        &mut global_episode,
        &mut hooks,
    )?;
    assert_eq!(hooks.steps, 4);
    let episodes: Vec<usize> = hooks.episodes.iter().map(|r| r.episode).collect();
    assert_eq!(episodes, vec![11, 12]);
    assert_eq!(hooks.episodes[0].total_reward, 1.);
    assert_eq!(hooks.episodes[0].len, 2);
    Ok(())
}
