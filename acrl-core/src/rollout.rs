use crate::{
    env::Env, metrics::EpisodeRecord, policy::Policy, rng, trajectory::TrajectoryBuffer,
};
use anyhow::Result;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct RolloutConfig {
    /// Minimum number of environment steps collected per call.
    pub total_sample_size: usize,
    /// Episodes reaching this many steps are cut short and stored as finished.
    pub max_episode_steps: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RolloutStats {
    pub sample_num: usize,
    pub episodes: usize,
    /// Average reward per environment step.
    pub avg_train_reward: f32,
    /// Average undiscounted episode return.
    pub avg_train_return: f32,
    pub avg_steps: f32,
}

impl RolloutStats {
    pub fn new(sample_num: usize, episodes: usize, total_reward: f32) -> Self {
        if episodes == 0 {
            return Self::default();
        }
        Self {
            sample_num,
            episodes,
            avg_train_reward: total_reward / sample_num as f32,
            avg_train_return: total_reward / episodes as f32,
            avg_steps: sample_num as f32 / episodes as f32,
        }
    }
}

pub trait RolloutHooks<E: Env + ?Sized> {
    /// Called after every environment step. `step_started` marks when the action was requested.
    fn post_step_hook(&mut self, _env: &mut E, _step: usize, _step_started: Instant) -> Result<()> {
        Ok(())
    }

    fn post_episode_hook(&mut self, _record: &EpisodeRecord) -> Result<()> {
        Ok(())
    }
}

pub struct NoRolloutHooks;

impl<E: Env + ?Sized> RolloutHooks<E> for NoRolloutHooks {}

/// Runs whole episodes until at least `total_sample_size` steps were stored in `history`.
pub fn rollout<E, P, H>(
    env: &mut E,
    policy: &P,
    history: &mut TrajectoryBuffer,
    config: &RolloutConfig,
    global_episode: &mut usize,
    hooks: &mut H,
) -> Result<RolloutStats>
where
    E: Env + ?Sized,
    P: Policy + ?Sized,
    H: RolloutHooks<E> + ?Sized,
{
    let mut sample_num = 0;
    let mut episodes = 0;
    let mut sum_reward_iter = 0.;
    while sample_num < config.total_sample_size {
        let mut state = env.reset(rng::next_seed())?;
        let mut steps = 0;
        let mut total_reward_per_ep = 0.;
        loop {
            let tic = Instant::now();
            let action = policy.get_action(&state)?;
            let snapshot = env.step(&action)?;
            steps += 1;
            let out_of_steps = config.max_episode_steps.is_some_and(|max| steps >= max);
            let done = snapshot.done() || out_of_steps;
            let mask = if done { 0. } else { 1. };
            history.store_history(action, state, snapshot.reward, mask);
            total_reward_per_ep += snapshot.reward;
            hooks.post_step_hook(env, steps - 1, tic)?;
            state = snapshot.state;
            if done {
                break;
            }
        }
        episodes += 1;
        *global_episode += 1;
        let record = EpisodeRecord::new(*global_episode, total_reward_per_ep, steps);
        debug!(
            episode = record.episode,
            total_reward = record.total_reward,
            avg_reward = record.avg_reward,
            len = record.len,
            "episode finished"
        );
        hooks.post_episode_hook(&record)?;
        sum_reward_iter += total_reward_per_ep;
        sample_num += steps;
    }
    Ok(RolloutStats::new(sample_num, episodes, sum_reward_iter))
}
