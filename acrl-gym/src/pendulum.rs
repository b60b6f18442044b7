use acrl_core::{
    benchmark::Benchmark,
    env::{Env, EnvironmentDescription, SnapShot, Space, action_values, state_tensor},
    error::EnvError,
};
use anyhow::Result;
use candle_core::Tensor;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::f32::consts::PI;
use tracing::debug;

const MAX_SPEED: f32 = 8.;
const MAX_TORQUE: f32 = 2.;
const DT: f32 = 0.05;
const G: f32 = 10.;
const M: f32 = 1.;
const L: f32 = 1.;

pub const PENDULUM_MAX_STEPS: usize = 200;

fn angle_normalize(x: f32) -> f32 {
    (x + PI).rem_euclid(2. * PI) - PI
}

/// Inverted pendulum swing-up with the `Pendulum-v1` dynamics and time limit.
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    steps: usize,
    needs_reset: bool,
    max_steps: usize,
}

impl Default for Pendulum {
    fn default() -> Self {
        Self {
            theta: 0.,
            theta_dot: 0.,
            steps: 0,
            needs_reset: true,
            max_steps: PENDULUM_MAX_STEPS,
        }
    }
}

impl Pendulum {
    pub fn set_state(&mut self, theta: f32, theta_dot: f32) {
        self.theta = theta;
        self.theta_dot = theta_dot;
        self.steps = 0;
        self.needs_reset = false;
    }

    fn observation(&self) -> Vec<f32> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }
}

impl Env for Pendulum {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        let mut rng = StdRng::seed_from_u64(seed);
        let theta = rng.random_range(-PI..=PI);
        let theta_dot = rng.random_range(-1f32..=1.);
        self.set_state(theta, theta_dot);
        state_tensor(self.observation())
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        if self.needs_reset {
            return Err(EnvError::NeedsReset.into());
        }
        let action = action_values(action)?;
        let [u] = action[..] else {
            return Err(EnvError::ActionSize {
                expected: 1,
                got: action.len(),
            }
            .into());
        };
        let u = u.clamp(-MAX_TORQUE, MAX_TORQUE);
        let (th, thdot) = (self.theta, self.theta_dot);
        let costs = angle_normalize(th).powi(2) + 0.1 * thdot.powi(2) + 0.001 * u.powi(2);
        let new_thdot = (thdot + (3. * G / (2. * L) * th.sin() + 3. / (M * L * L) * u) * DT)
            .clamp(-MAX_SPEED, MAX_SPEED);
        self.theta = th + new_thdot * DT;
        self.theta_dot = new_thdot;
        self.steps += 1;
        let truncated = self.steps >= self.max_steps;
        self.needs_reset = truncated;
        Ok(SnapShot {
            state: state_tensor(self.observation())?,
            reward: -costs,
            terminated: false,
            truncated,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::bounded(vec![-1., -1., -MAX_SPEED], vec![1., 1., MAX_SPEED]),
            Space::bounded(vec![-MAX_TORQUE], vec![MAX_TORQUE]),
        )
    }

    fn benchmark(&self) -> Benchmark {
        Benchmark::Gym
    }

    fn render(&mut self) -> Result<()> {
        debug!(theta = self.theta, theta_dot = self.theta_dot, step = self.steps, "pendulum");
        Ok(())
    }
}
