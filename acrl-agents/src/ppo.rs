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
use candle_core::Tensor;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpoConfig {
    pub ppo_epochs: usize,
    pub clip_param: f32,
    pub normalize_advantages: bool,
}

impl Default for PpoConfig {
    fn default() -> Self {
        Self {
            ppo_epochs: 10,
            clip_param: 0.2,
            normalize_advantages: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ppo {
    pub config: PpoConfig,
}

impl Ppo {
    pub fn new(config: PpoConfig) -> Self {
        Self { config }
    }

    /// Negated clipped surrogate objective, averaged over the batch.
    pub fn clipped_surrogate(
        &self,
        logp: &Tensor,
        logp_old: &Tensor,
        advantages: &Tensor,
    ) -> Result<Tensor> {
        let clip = self.config.clip_param;
        let ratio = logp.sub(logp_old)?.exp()?;
        let clip_adv = ratio.clamp(1. - clip, 1. + clip)?.mul(advantages)?;
        Ok(Tensor::minimum(&ratio.mul(advantages)?, &clip_adv)?
            .neg()?
            .mean_all()?)
    }
}

impl Learner for Ppo {
    fn name(&self) -> &'static str {
        "ppo"
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
        for epoch in 0..self.config.ppo_epochs {
            for batch in prepared.batches(ctx.batch_size) {
                let batch = batch?;
                let logp = Logp(model.actor.log_probs(&batch.observations, &batch.actions)?);
                let values_pred = ValuesPred(model.critic.calculate_values(&batch.observations)?);
                let value_loss = ValueLoss(batch.returns.sub(&values_pred)?.sqr()?.mean_all()?);
                let policy_loss = PolicyLoss(self.clipped_surrogate(
                    logp.deref(),
                    &batch.logp_old,
                    &batch.advantages,
                )?);
                model.update_actor(&policy_loss)?;
                model.update_critic(&value_loss)?;
                losses.push(
                    policy_loss.to_scalar::<f32>()?,
                    value_loss.to_scalar::<f32>()?,
                );
            }
            trace!(iter = ctx.iter, epoch, "ppo epoch done");
        }
        let entropy = model.actor.entropy()?.to_scalar::<f32>()?;
        Ok(losses.finish(entropy))
    }
}
