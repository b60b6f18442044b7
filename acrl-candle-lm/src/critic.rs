use crate::sequential::{Activation, Mlp, mlp};
use acrl_core::policy::ValueFunction;
use anyhow::Result;
use candle_core::{Device, Module, Tensor};
use candle_nn::VarBuilder;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Critic {
    c_net: Mlp,
    device: Device,
}

impl Critic {
    pub fn new(
        input_dim: usize,
        hidden: &[usize],
        activation: Activation,
        vb: &VarBuilder,
    ) -> Result<Self> {
        let c_net = mlp(input_dim, hidden, 1, activation, vb, "c_net")?;
        debug!(layers = ?c_net.linear_dims(), "critic built");
        Ok(Self {
            c_net,
            device: vb.device().clone(),
        })
    }

    /// `[batch, state_dim]` to `[batch, 1]`.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        Ok(self.c_net.forward(xs)?)
    }
}

impl ValueFunction for Critic {
    fn calculate_values(&self, states: &Tensor) -> Result<Tensor> {
        let states = states.to_device(&self.device)?;
        Ok(self.forward(&states)?.squeeze(1)?)
    }
}
