pub mod a2c;
pub mod agent;
pub mod batching;
pub mod learner;
pub mod ppo;
pub mod render;

use a2c::A2c;
use acrl_candle_lm::actor_critic::ActorCritic;
use acrl_core::trajectory::TrajectoryBuffer;
use anyhow::Result;
use learner::{Learner, UpdateContext, UpdateStats};
use ppo::Ppo;

/// Learners selectable from configuration.
#[derive(Debug, Clone)]
pub enum LearnerKind {
    A2c(A2c),
    Ppo(Ppo),
}

impl Learner for LearnerKind {
    fn name(&self) -> &'static str {
        match self {
            Self::A2c(a2c) => a2c.name(),
            Self::Ppo(ppo) => ppo.name(),
        }
    }

    fn update(
        &mut self,
        model: &mut ActorCritic,
        history: &TrajectoryBuffer,
        ctx: &UpdateContext,
    ) -> Result<UpdateStats> {
        match self {
            Self::A2c(a2c) => a2c.update(model, history, ctx),
            Self::Ppo(ppo) => ppo.update(model, history, ctx),
        }
    }
}
