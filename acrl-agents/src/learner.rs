use acrl_candle_lm::actor_critic::ActorCritic;
use acrl_core::trajectory::TrajectoryBuffer;
use anyhow::Result;
use serde::Serialize;

/// Hyper-parameters shared by every learner, taken from the agent configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateContext {
    pub iter: usize,
    pub gamma: f32,
    pub lamda: f32,
    pub batch_size: usize,
}

/// Mean losses over the minibatches of one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UpdateStats {
    pub policy_loss: f32,
    pub value_loss: f32,
    pub entropy: f32,
}

/// The algorithm specific part of training: turns one iteration of history into parameter
/// updates. Learner specific hyper-parameters live in the learner itself.
pub trait Learner {
    fn name(&self) -> &'static str;

    fn update(
        &mut self,
        model: &mut ActorCritic,
        history: &TrajectoryBuffer,
        ctx: &UpdateContext,
    ) -> Result<UpdateStats>;
}

#[derive(Default)]
pub(crate) struct LossAccumulator {
    policy_loss: f32,
    value_loss: f32,
    batches: usize,
}

impl LossAccumulator {
    pub fn push(&mut self, policy_loss: f32, value_loss: f32) {
        self.policy_loss += policy_loss;
        self.value_loss += value_loss;
        self.batches += 1;
    }

    pub fn finish(self, entropy: f32) -> UpdateStats {
        let batches = self.batches.max(1) as f32;
        UpdateStats {
            policy_loss: self.policy_loss / batches,
            value_loss: self.value_loss / batches,
            entropy,
        }
    }
}
