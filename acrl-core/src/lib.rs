pub mod benchmark;
pub mod env;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod rng;
pub mod rollout;
pub mod trajectory;

use anyhow::Result;

/// A learning algorithm driven to completion by calling `train`. The actor-critic harness in
/// `acrl-agents` is the only implementor for now.
pub trait Algorithm {
    type Report;

    fn train(&mut self) -> Result<Self::Report>;
}
