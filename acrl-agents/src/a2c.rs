use crate::{
    batching::PreparedRollout,
    learner::{Learner, LossAccumulator, UpdateContext, UpdateStats},
};
use acrl_candle_lm::{
    actor_critic::ActorCritic,
    tensors::{Logp, PolicyLoss, ValueLoss, ValuesPred},
};
use acrl_core::{
    policy::{Policy, ValueFunction},
    trajectory::TrajectoryBuffer,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct A2cConfig {
    pub normalize_advantages: bool,
}

/// Advantage actor-critic: a single pass over the shuffled minibatches of an iteration.
#[derive(Debug, Clone, Default)]
pub struct A2c {
    pub config: A2cConfig,
}

impl A2c {
    pub fn new(config: A2cConfig) -> Self {
        Self { config }
    }
}

impl Learner for A2c {
    fn name(&self) -> &'static str {
        "a2c"
    }

    fn update(
        &mut self,
        model: &mut ActorCritic,
        history: &TrajectoryBuffer,
        ctx: &UpdateContext,
    ) -> Result<UpdateStats> {
        let prepared = PreparedRollout::new(
            history,
            model,
            ctx.gamma,
            ctx.lamda,
            self.config.normalize_advantages,
        )?;
        trace!(iter = ctx.iter, samples = prepared.len(), "rollout prepared");
        let mut losses = LossAccumulator::default();
        for batch in prepared.batches(ctx.batch_size) {
            let batch = batch?;
            let logp = Logp(model.actor.log_probs(&batch.observations, &batch.actions)?);
            let values_pred = ValuesPred(model.critic.calculate_values(&batch.observations)?);
            let value_loss = ValueLoss(batch.returns.sub(&values_pred)?.sqr()?.mean_all()?);
            let policy_loss = PolicyLoss(batch.advantages.mul(&logp)?.neg()?.mean_all()?);
            model.update_actor(&policy_loss)?;
            model.update_critic(&value_loss)?;
            losses.push(
                policy_loss.to_scalar::<f32>()?,
                value_loss.to_scalar::<f32>()?,
            );
        }
        let entropy = model.actor.entropy()?.to_scalar::<f32>()?;
        Ok(losses.finish(entropy))
    }
}
