use anyhow::{Result, ensure};
use candle_core::Tensor;
use derive_more::{Deref, DerefMut};
use std::ops::Range;

/// Per step history of the current iteration. `mask` is 0 on the last step of an episode and 1
/// everywhere else, so it doubles as the "not done" multiplier of the return recursion.
#[derive(Debug, Default, Clone)]
pub struct TrajectoryBuffer {
    pub states: Vec<Tensor>,
    pub actions: Vec<Tensor>,
    pub rewards: Vec<f32>,
    pub masks: Vec<f32>,
}

impl TrajectoryBuffer {
    pub fn store_history(&mut self, action: Tensor, state: Tensor, reward: f32, mask: f32) {
        self.actions.push(action);
        self.states.push(state);
        self.rewards.push(reward);
        self.masks.push(mask);
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.actions.clear();
        self.rewards.clear();
        self.masks.clear();
    }

    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().sum()
    }

    /// Step ranges of the stored episodes. A trailing episode without a closing mask is still
    /// reported.
    pub fn episodes(&self) -> Vec<Range<usize>> {
        let mut episodes = vec![];
        let mut start = 0;
        for (idx, mask) in self.masks.iter().enumerate() {
            if *mask == 0. {
                episodes.push(start..idx + 1);
                start = idx + 1;
            }
        }
        if start < self.masks.len() {
            episodes.push(start..self.masks.len());
        }
        episodes
    }

    pub fn stacked_states(&self) -> Result<Tensor> {
        ensure!(!self.is_empty(), "trajectory buffer is empty");
        Ok(Tensor::stack(&self.states, 0)?)
    }

    pub fn stacked_actions(&self) -> Result<Tensor> {
        ensure!(!self.is_empty(), "trajectory buffer is empty");
        Ok(Tensor::stack(&self.actions, 0)?)
    }

    pub fn gae(&self, values: &[f32], gamma: f32, lamda: f32) -> Result<(Returns, Advantages)> {
        compute_gae(&self.rewards, &self.masks, values, gamma, lamda)
    }
}

#[derive(Deref, DerefMut, Debug, Clone, PartialEq)]
pub struct Returns(pub Vec<f32>);

#[derive(Deref, DerefMut, Debug, Clone, PartialEq)]
pub struct Advantages(pub Vec<f32>);

impl Advantages {
    pub fn normalize(&mut self) {
        normalize(&mut self.0)
    }
}

/// Discounted returns and generalized advantage estimates. The value after the final stored step
/// is taken as zero, which is exact because rollouts only store whole episodes.
pub fn compute_gae(
    rewards: &[f32],
    masks: &[f32],
    values: &[f32],
    gamma: f32,
    lamda: f32,
) -> Result<(Returns, Advantages)> {
    ensure!(
        rewards.len() == masks.len() && rewards.len() == values.len(),
        "gae inputs disagree in length: {} rewards, {} masks, {} values",
        rewards.len(),
        masks.len(),
        values.len()
    );
    let total_steps = rewards.len();
    let mut returns = vec![0.; total_steps];
    let mut advantages = vec![0.; total_steps];
    let mut running_return = 0.;
    let mut previous_value = 0.;
    let mut running_advantage = 0.;
    for t in (0..total_steps).rev() {
        running_return = rewards[t] + gamma * running_return * masks[t];
        let delta = rewards[t] + gamma * previous_value * masks[t] - values[t];
        running_advantage = delta + gamma * lamda * running_advantage * masks[t];
        returns[t] = running_return;
        advantages[t] = running_advantage;
        previous_value = values[t];
    }
    Ok((Returns(returns), Advantages(advantages)))
}

pub fn normalize(xs: &mut [f32]) {
    if xs.is_empty() {
        return;
    }
    let mean = xs.iter().sum::<f32>() / xs.len() as f32;
    let variance = xs.iter().map(|x| (*x - mean).powi(2)).sum::<f32>() / xs.len() as f32;
    let std = variance.sqrt() + 1e-8;
    for x in xs.iter_mut() {
        *x = (*x - mean) / std;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn approx_eq(lhs: &[f32], rhs: &[f32]) {
        assert_eq!(lhs.len(), rhs.len());
        for (l, r) in lhs.iter().zip(rhs) {
            assert!((l - r).abs() < 1e-5, "{lhs:?} != {rhs:?}");
        }
    }

    fn scalar(value: f32) -> Tensor {
        Tensor::new(&[value], &Device::Cpu).unwrap()
    }

    #[test]
    fn returns_reset_at_episode_boundaries() -> Result<()> {
        let rewards = [1., 1., 1., 2.];
        let masks = [1., 0., 1., 0.];
        let values = [0.; 4];
        let (returns, _) = compute_gae(&rewards, &masks, &values, 0.5, 1.)?;
        approx_eq(&returns, &[1.5, 1., 2., 2.]);
        Ok(())
    }

    #[test]
    fn zero_values_and_unit_lambda_give_advantage_equal_to_return() -> Result<()> {
        let rewards = [1., 2., 3.];
        let masks = [1., 1., 0.];
        let values = [0.; 3];
        let (returns, advantages) = compute_gae(&rewards, &masks, &values, 0.9, 1.)?;
        approx_eq(&returns, &advantages);
        Ok(())
    }

    #[test]
    fn zero_lambda_is_one_step_td_error() -> Result<()> {
        let rewards = [1., 1.];
        let masks = [1., 0.];
        let values = [0.5, 2.];
        let (_, advantages) = compute_gae(&rewards, &masks, &values, 0.9, 0.)?;
        // delta_0 = 1 + 0.9 * 2 - 0.5, delta_1 = 1 - 2
        approx_eq(&advantages, &[2.3, -1.]);
        Ok(())
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = compute_gae(&[1.], &[0., 1.], &[0.], 0.99, 0.95).unwrap_err();
        assert!(err.to_string().contains("disagree in length"));
    }

    #[test]
    fn normalize_gives_zero_mean_unit_std() {
        let mut xs = vec![1., 2., 3., 4.];
        normalize(&mut xs);
        let mean = xs.iter().sum::<f32>() / 4.;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / 4.;
        assert!(mean.abs() < 1e-6);
        assert!((var - 1.).abs() < 1e-4);
    }

    #[test]
    fn normalize_empty_is_noop() {
        let mut xs: Vec<f32> = vec![];
        normalize(&mut xs);
        assert!(xs.is_empty());
    }

    #[test]
    fn episodes_follow_masks() {
        let mut buffer = TrajectoryBuffer::default();
        for mask in [1., 0., 1., 1., 0., 1.] {
            buffer.store_history(scalar(0.), scalar(0.), 1., mask);
        }
        assert_eq!(buffer.episodes(), vec![0..2, 2..5, 5..6]);
        assert_eq!(buffer.total_reward(), 6.);
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.episodes().is_empty());
    }

    #[test]
    fn stacking_an_empty_buffer_fails() {
        let buffer = TrajectoryBuffer::default();
        assert!(buffer.stacked_states().is_err());
    }

    #[test]
    fn stacked_states_keep_insertion_order() -> Result<()> {
        let mut buffer = TrajectoryBuffer::default();
        buffer.store_history(scalar(0.), scalar(1.), 0., 1.);
        buffer.store_history(scalar(0.), scalar(2.), 0., 0.);
        let states = buffer.stacked_states()?;
        assert_eq!(states.dims(), &[2, 1]);
        assert_eq!(states.flatten_all()?.to_vec1::<f32>()?, vec![1., 2.]);
        Ok(())
    }
}
