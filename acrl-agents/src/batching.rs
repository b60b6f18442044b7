use acrl_candle_lm::actor_critic::ActorCritic;
use acrl_core::{
    policy::{Policy, ValueFunction},
    rng::RNG,
    trajectory::TrajectoryBuffer,
};
use anyhow::Result;
use candle_core::Tensor;
use rand::seq::SliceRandom;

/// One minibatch, every tensor already on the model device.
pub struct Batch {
    pub observations: Tensor,
    pub actions: Tensor,
    pub returns: Tensor,
    pub advantages: Tensor,
    pub logp_old: Tensor,
}

/// The history of one iteration stacked onto the model device, with returns, advantages and the
/// log probabilities of the behaviour policy computed once up front.
pub struct PreparedRollout {
    observations: Tensor,
    actions: Tensor,
    returns: Tensor,
    advantages: Tensor,
    logp_old: Tensor,
    len: usize,
}

impl PreparedRollout {
    pub fn new(
        history: &TrajectoryBuffer,
        model: &ActorCritic,
        gamma: f32,
        lamda: f32,
        normalize_advantages: bool,
    ) -> Result<Self> {
        let device = model.device();
        let observations = history.stacked_states()?.to_device(device)?;
        let actions = history.stacked_actions()?.to_device(device)?;
        let values = model
            .critic
            .calculate_values(&observations)?
            .to_vec1::<f32>()?;
        let (returns, mut advantages) = history.gae(&values, gamma, lamda)?;
        if normalize_advantages {
            advantages.normalize();
        }
        let len = history.len();
        let returns = Tensor::from_slice(returns.as_slice(), len, device)?;
        let advantages = Tensor::from_slice(advantages.as_slice(), len, device)?;
        let logp_old = model.actor.log_probs(&observations, &actions)?.detach();
        Ok(Self {
            observations,
            actions,
            returns,
            advantages,
            logp_old,
            len,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Shuffled minibatches of `batch_size` covering every sample once. The last batch holds the
    /// remainder.
    pub fn batches(&self, batch_size: usize) -> BatchIterator<'_> {
        let mut indicies: Vec<u32> = (0..self.len as u32).collect();
        RNG.with_borrow_mut(|rng| indicies.shuffle(rng));
        BatchIterator {
            rollout: self,
            indicies,
            batch_size: batch_size.max(1),
            current: 0,
        }
    }

    fn select(&self, indicies: &[u32]) -> Result<Batch> {
        let device = self.observations.device();
        let index = Tensor::from_slice(indicies, indicies.len(), device)?;
        Ok(Batch {
            observations: self.observations.index_select(&index, 0)?,
            actions: self.actions.index_select(&index, 0)?,
            returns: self.returns.index_select(&index, 0)?,
            advantages: self.advantages.index_select(&index, 0)?,
            logp_old: self.logp_old.index_select(&index, 0)?,
        })
    }
}

pub struct BatchIterator<'a> {
    rollout: &'a PreparedRollout,
    indicies: Vec<u32>,
    batch_size: usize,
    current: usize,
}

impl Iterator for BatchIterator<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.indicies.len() {
            return None;
        }
        let end = (self.current + self.batch_size).min(self.indicies.len());
        let batch_indicies = &self.indicies[self.current..end];
        self.current = end;
        Some(self.rollout.select(batch_indicies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acrl_candle_lm::ModelConfig;
    use acrl_core::{env::state_tensor, rng};
    use candle_core::Device;

    fn history(len: usize) -> Result<TrajectoryBuffer> {
        let mut history = TrajectoryBuffer::default();
        for t in 0..len {
            let mask = if t + 1 == len { 0. } else { 1. };
            history.store_history(
                state_tensor(vec![0.])?,
                state_tensor(vec![t as f32, 1.])?,
                1.,
                mask,
            );
        }
        Ok(history)
    }

    fn model() -> Result<ActorCritic> {
        let config = ModelConfig {
            hidden_size: vec![4],
            ..Default::default()
        };
        ActorCritic::build(2, 1, &config, 1e-3, 1e-3, None, &Device::Cpu)
    }

    #[test]
    fn batches_cover_every_sample_once() -> Result<()> {
        rng::seed(3);
        let prepared = PreparedRollout::new(&history(10)?, &model()?, 0.99, 0.95, false)?;
        let batches = prepared.batches(4).collect::<Result<Vec<_>>>()?;
        let sizes: Vec<usize> = batches
            .iter()
            .map(|b| b.observations.dim(0))
            .collect::<candle_core::Result<_>>()?;
        assert_eq!(sizes, vec![4, 4, 2]);
        let mut seen: Vec<f32> = batches
            .iter()
            .map(|b| b.observations.narrow(1, 0, 1)?.flatten_all()?.to_vec1::<f32>())
            .collect::<candle_core::Result<Vec<_>>>()?
            .concat();
        seen.sort_by(f32::total_cmp);
        assert_eq!(seen, (0..10).map(|t| t as f32).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn normalized_advantages_have_zero_mean() -> Result<()> {
        let prepared = PreparedRollout::new(&history(6)?, &model()?, 0.99, 0.95, true)?;
        let mean = prepared.advantages.mean_all()?.to_scalar::<f32>()?;
        assert!(mean.abs() < 1e-5);
        assert_eq!(prepared.len(), 6);
        Ok(())
    }

    #[test]
    fn empty_history_cannot_be_prepared() -> Result<()> {
        let prepared = PreparedRollout::new(&TrajectoryBuffer::default(), &model()?, 0.99, 0.95, true);
        assert!(prepared.is_err());
        Ok(())
    }
}
