use super::{Env, EnvironmentDescription, SnapShot, Space, action_values, state_tensor};
use crate::{benchmark::Benchmark, error::EnvError};
use anyhow::Result;
use candle_core::Tensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepType {
    First,
    Mid,
    Last,
}

/// Named observation arrays, kept in the order the environment reports them.
pub type Observation = Vec<(String, Vec<f32>)>;

#[derive(Debug, Clone)]
pub struct TimeStep {
    pub step_type: StepType,
    pub reward: Option<f32>,
    pub discount: Option<f32>,
    pub observation: Observation,
}

impl TimeStep {
    pub fn first(observation: Observation) -> Self {
        Self {
            step_type: StepType::First,
            reward: None,
            discount: None,
            observation,
        }
    }

    pub fn is_last(&self) -> bool {
        self.step_type == StepType::Last
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArraySpec {
    pub name: String,
    pub shape: Vec<usize>,
}

impl ArraySpec {
    pub fn new(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// Element count. Scalars have an empty shape and count as one element.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundedArraySpec {
    pub shape: Vec<usize>,
    pub minimum: Vec<f32>,
    pub maximum: Vec<f32>,
}

impl BoundedArraySpec {
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Physics simulator contract modelled on dm_control: episodes start with a `First` timestep and
/// end with a `Last` one. A `Last` step with discount zero is a true termination, anything else
/// is a time limit.
pub trait DmEnv {
    fn reset(&mut self) -> Result<TimeStep>;

    fn step(&mut self, action: &[f32]) -> Result<TimeStep>;

    fn observation_spec(&self) -> Vec<ArraySpec>;

    fn action_spec(&self) -> BoundedArraySpec;

    fn render(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Exposes a [`DmEnv`] through the flat [`Env`] interface by concatenating the named
/// observation arrays in spec order.
pub struct DmControlAdapter<E: DmEnv> {
    env: E,
    observation_spec: Vec<ArraySpec>,
    action_spec: BoundedArraySpec,
}

impl<E: DmEnv> DmControlAdapter<E> {
    pub fn new(env: E) -> Self {
        let observation_spec = env.observation_spec();
        let action_spec = env.action_spec();
        Self {
            env,
            observation_spec,
            action_spec,
        }
    }

    pub fn state_dim(&self) -> usize {
        self.observation_spec.iter().map(ArraySpec::size).sum()
    }

    pub fn observation_spec(&self) -> &[ArraySpec] {
        &self.observation_spec
    }

    pub fn action_spec(&self) -> &BoundedArraySpec {
        &self.action_spec
    }

    /// Flattens a timestep into `(state, reward, mask)`, the way the trajectory history wants it.
    pub fn convert_time_step(&self, time_step: &TimeStep) -> Result<(Vec<f32>, f32, f32)> {
        let state = self.flatten(&time_step.observation)?;
        let reward = time_step.reward.unwrap_or(0.);
        let mask = if time_step.is_last() { 0. } else { 1. };
        Ok((state, reward, mask))
    }

    fn flatten(&self, observation: &Observation) -> Result<Vec<f32>> {
        let mut state = Vec::with_capacity(self.state_dim());
        for spec in self.observation_spec.iter() {
            let values = observation
                .iter()
                .find(|(name, _)| name == &spec.name)
                .map(|(_, values)| values.as_slice())
                .unwrap_or_default();
            if values.len() != spec.size() {
                return Err(EnvError::ObservationSize {
                    name: spec.name.clone(),
                    expected: spec.size(),
                    got: values.len(),
                }
                .into());
            }
            state.extend_from_slice(values);
        }
        Ok(state)
    }
}

impl<E: DmEnv> Env for DmControlAdapter<E> {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        let time_step = self.env.reset()?;
        state_tensor(self.flatten(&time_step.observation)?)
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        let action = action_values(action)?;
        if action.len() != self.action_spec.size() {
            return Err(EnvError::ActionSize {
                expected: self.action_spec.size(),
                got: action.len(),
            }
            .into());
        }
        let time_step = self.env.step(&action)?;
        let (state, reward, _) = self.convert_time_step(&time_step)?;
        let last = time_step.is_last();
        let terminated = last && time_step.discount == Some(0.);
        Ok(SnapShot {
            state: state_tensor(state)?,
            reward,
            terminated,
            truncated: last && !terminated,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continous_from_dims(&[self.state_dim()]),
            Space::bounded(
                self.action_spec.minimum.clone(),
                self.action_spec.maximum.clone(),
            ),
        )
    }

    fn benchmark(&self) -> Benchmark {
        Benchmark::DmControl
    }

    fn render(&mut self) -> Result<()> {
        self.env.render()
    }
}
