pub mod timestep;

use crate::benchmark::Benchmark;
use anyhow::Result;
use candle_core::{Device, Tensor};

#[derive(Debug, Clone, PartialEq)]
pub enum Space {
    Discrete(usize),
    Continous {
        min: Option<Vec<f32>>,
        max: Option<Vec<f32>>,
        size: usize,
    },
}

impl Space {
    pub fn continous_from_dims(dims: &[usize]) -> Self {
        Self::Continous {
            min: None,
            max: None,
            size: dims.iter().product(),
        }
    }

    pub fn bounded(min: Vec<f32>, max: Vec<f32>) -> Self {
        let size = min.len();
        Self::Continous {
            min: Some(min),
            max: Some(max),
            size,
        }
    }

    pub fn size(&self) -> usize {
        match &self {
            Self::Discrete(size) => *size,
            Self::Continous { size, .. } => *size,
        }
    }

    /// Lower and upper bounds when both are known.
    pub fn bounds(&self) -> Option<(&[f32], &[f32])> {
        match self {
            Self::Continous {
                min: Some(min),
                max: Some(max),
                ..
            } => Some((min, max)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    pub action_space: Space,
}

impl EnvironmentDescription {
    pub fn new(observation_space: Space, action_space: Space) -> Self {
        Self {
            observation_space,
            action_space,
        }
    }

    pub fn action_size(&self) -> usize {
        self.action_space.size()
    }

    pub fn observation_size(&self) -> usize {
        self.observation_space.size()
    }
}

#[derive(Debug, Clone)]
pub struct SnapShot {
    pub state: Tensor,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
}

impl SnapShot {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Gym style environment. States and actions are rank 1 tensors living on the CPU.
pub trait Env {
    fn reset(&mut self, seed: u64) -> Result<Tensor>;

    fn step(&mut self, action: &Tensor) -> Result<SnapShot>;

    fn env_description(&self) -> EnvironmentDescription;

    fn benchmark(&self) -> Benchmark;

    fn render(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<E: Env + ?Sized> Env for Box<E> {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        (**self).reset(seed)
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        (**self).step(action)
    }

    fn env_description(&self) -> EnvironmentDescription {
        (**self).env_description()
    }

    fn benchmark(&self) -> Benchmark {
        (**self).benchmark()
    }

    fn render(&mut self) -> Result<()> {
        (**self).render()
    }
}

pub fn state_tensor(values: Vec<f32>) -> Result<Tensor> {
    let len = values.len();
    Ok(Tensor::from_vec(values, len, &Device::Cpu)?)
}

pub fn action_values(action: &Tensor) -> Result<Vec<f32>> {
    Ok(action.flatten_all()?.to_vec1::<f32>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continous_space_from_dims_multiplies() {
        let space = Space::continous_from_dims(&[3, 2]);
        assert_eq!(space.size(), 6);
        assert!(space.bounds().is_none());
    }

    #[test]
    fn bounded_space_exposes_bounds() {
        let space = Space::bounded(vec![-1., -2.], vec![1., 2.]);
        assert_eq!(space.size(), 2);
        let (min, max) = space.bounds().unwrap();
        assert_eq!(min, &[-1., -2.]);
        assert_eq!(max, &[1., 2.]);
    }

    #[test]
    fn action_values_flattens_batched_action() -> Result<()> {
        let action = Tensor::from_vec(vec![0.5f32, -0.5], (1, 2), &Device::Cpu)?;
        assert_eq!(action_values(&action)?, vec![0.5, -0.5]);
        Ok(())
    }
}
