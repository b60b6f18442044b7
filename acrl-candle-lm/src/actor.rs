use crate::sequential::{Activation, Mlp, mlp};
use acrl_core::{policy::Policy, rng::RNG};
use anyhow::Result;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::VarBuilder;
use rand::Rng;
use rand_distr::StandardNormal;
use std::f32::consts::PI;
use tracing::debug;

/// Gaussian actor: the network predicts the mean torque, the standard deviation is fixed at one
/// (a constant zero `log_std`).
#[derive(Debug, Clone)]
pub struct Actor {
    a_net: Mlp,
    log_std: Tensor,
    device: Device,
}

impl Actor {
    pub fn new(
        input_dim: usize,
        output_dim: usize,
        hidden: &[usize],
        activation: Activation,
        vb: &VarBuilder,
    ) -> Result<Self> {
        let a_net = mlp(input_dim, hidden, output_dim, activation, vb, "a_net")?;
        debug!(layers = ?a_net.linear_dims(), "actor built");
        let device = vb.device().clone();
        let log_std = Tensor::zeros(output_dim, DType::F32, &device)?;
        Ok(Self {
            a_net,
            log_std,
            device,
        })
    }

    pub fn action_dim(&self) -> usize {
        self.log_std.elem_count()
    }

    /// `[batch, state_dim]` to the per-row mean and standard deviation.
    pub fn forward(&self, xs: &Tensor) -> Result<(Tensor, Tensor)> {
        let mu = self.a_net.forward(xs)?;
        let log_std = mu.zeros_like()?;
        let std = log_std.exp()?;
        Ok((mu, std))
    }

    /// Draws `mu + std * eps` with `eps` from the crate RNG. The sample carries no gradient.
    pub fn sample_action(&self, mu: &Tensor, std: &Tensor) -> Result<Tensor> {
        let noise: Vec<f32> = RNG.with_borrow_mut(|rng| {
            (0..mu.elem_count())
                .map(|_| rng.sample::<f32, _>(StandardNormal))
                .collect()
        });
        let noise = Tensor::from_vec(noise, mu.shape(), mu.device())?;
        Ok(mu.add(&std.mul(&noise)?)?.detach())
    }

    /// Elementwise normal log density of `actions`.
    pub fn log_prob(&self, actions: &Tensor, mu: &Tensor, std: &Tensor) -> Result<Tensor> {
        let var = std.sqr()?;
        let log_sqrt_2pi = (2. * PI).sqrt().ln() as f64;
        let log_probs = actions
            .sub(mu)?
            .sqr()?
            .div(&var.affine(2., 0.)?)?
            .neg()?
            .sub(&std.log()?)?
            .affine(1., -log_sqrt_2pi)?;
        Ok(log_probs)
    }
}

impl Policy for Actor {
    fn get_action(&self, observation: &Tensor) -> Result<Tensor> {
        let observation = observation.to_device(&self.device)?.unsqueeze(0)?;
        let (mu, std) = self.forward(&observation)?;
        let action = self.sample_action(&mu, &std)?.squeeze(0)?;
        Ok(action.to_device(&Device::Cpu)?)
    }

    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let states = states.to_device(&self.device)?;
        let actions = actions.to_device(&self.device)?;
        let (mu, std) = self.forward(&states)?;
        Ok(self.log_prob(&actions, &mu, &std)?.sum(1)?)
    }

    fn entropy(&self) -> Result<Tensor> {
        let half_log_2pi_e = (0.5 * ((2. * PI).ln() + 1.)) as f64;
        Ok(self.log_std.affine(1., half_log_2pi_e)?.sum_all()?)
    }

    fn std(&self) -> Result<f32> {
        Ok(self.log_std.exp()?.mean_all()?.to_scalar::<f32>()?)
    }
}
