use anyhow::Result;
use candle_core::Tensor;

/// A stochastic policy over continuous actions.
pub trait Policy {
    /// Samples an action for a single rank 1 observation. The action comes back on the CPU.
    fn get_action(&self, observation: &Tensor) -> Result<Tensor>;

    /// Log probability of each `(state, action)` row, summed over action dimensions.
    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor>;

    fn entropy(&self) -> Result<Tensor>;

    fn std(&self) -> Result<f32>;
}

pub trait ValueFunction {
    /// State values for a `[batch, state_dim]` tensor, returned as `[batch]`.
    fn calculate_values(&self, states: &Tensor) -> Result<Tensor>;
}

impl<P: Policy + ?Sized> Policy for &P {
    fn get_action(&self, observation: &Tensor) -> Result<Tensor> {
        (**self).get_action(observation)
    }

    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor> {
        (**self).log_probs(states, actions)
    }

    fn entropy(&self) -> Result<Tensor> {
        (**self).entropy()
    }

    fn std(&self) -> Result<f32> {
        (**self).std()
    }
}
