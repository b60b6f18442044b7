use crate::{
    ModelConfig, actor::Actor, critic::Critic, error::CheckpointError,
    optimizer::OptimizerWithMaxGrad, tensors::{PolicyLoss, ValueLoss},
};
use anyhow::{Context, Result};
use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use safetensors::SafeTensors;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// CUDA device 0 when asked for and compiled in, the CPU otherwise.
pub fn select_device(gpu: bool) -> Result<Device> {
    if !gpu {
        return Ok(Device::Cpu);
    }
    let device = Device::cuda_if_available(0)?;
    if device.is_cpu() {
        warn!("gpu requested but cuda is not available, falling back to cpu");
    }
    Ok(device)
}

pub fn actor_checkpoint(dir: &Path, iter: usize) -> PathBuf {
    dir.join(format!("{iter}th_model_a.safetensors"))
}

pub fn critic_checkpoint(dir: &Path, iter: usize) -> PathBuf {
    dir.join(format!("{iter}th_model_c.safetensors"))
}

/// Actor and critic with their own variables and optimizers.
pub struct ActorCritic {
    pub actor: Actor,
    pub critic: Critic,
    pub actor_optimizer: OptimizerWithMaxGrad,
    pub critic_optimizer: OptimizerWithMaxGrad,
    actor_varmap: VarMap,
    critic_varmap: VarMap,
    device: Device,
}

impl ActorCritic {
    pub fn build(
        state_dim: usize,
        action_dim: usize,
        model: &ModelConfig,
        actor_lr: f64,
        critic_lr: f64,
        max_grad_norm: Option<f32>,
        device: &Device,
    ) -> Result<Self> {
        let actor_varmap = VarMap::new();
        let actor_vb = VarBuilder::from_varmap(&actor_varmap, DType::F32, device);
        let actor = Actor::new(
            state_dim,
            action_dim,
            &model.hidden_size,
            model.activation,
            &actor_vb,
        )?;
        let critic_varmap = VarMap::new();
        let critic_vb = VarBuilder::from_varmap(&critic_varmap, DType::F32, device);
        let critic = Critic::new(state_dim, &model.hidden_size, model.activation, &critic_vb)?;
        let actor_optimizer =
            OptimizerWithMaxGrad::adam(actor_varmap.clone(), actor_lr, max_grad_norm)?;
        let critic_optimizer =
            OptimizerWithMaxGrad::adam(critic_varmap.clone(), critic_lr, max_grad_norm)?;
        Ok(Self {
            actor,
            critic,
            actor_optimizer,
            critic_optimizer,
            actor_varmap,
            critic_varmap,
            device: device.clone(),
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn update_actor(&mut self, loss: &PolicyLoss) -> Result<()> {
        self.actor_optimizer.backward_step(loss)
    }

    pub fn update_critic(&mut self, loss: &ValueLoss) -> Result<()> {
        self.critic_optimizer.backward_step(loss)
    }

    /// Writes `{iter}th_model_a.safetensors` and `{iter}th_model_c.safetensors` into `dir`.
    pub fn save_model(&self, iter: usize, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(dir).with_context(|| format!("creating model dir {}", dir.display()))?;
        let actor_path = actor_checkpoint(dir, iter);
        let critic_path = critic_checkpoint(dir, iter);
        self.actor_varmap.save(&actor_path)?;
        self.critic_varmap.save(&critic_path)?;
        info!(
            actor = %actor_path.display(),
            critic = %critic_path.display(),
            "model saved"
        );
        Ok((actor_path, critic_path))
    }

    pub fn load_actor(&mut self, path: &Path) -> Result<()> {
        load_varmap(&mut self.actor_varmap, path)?;
        info!(path = %path.display(), "actor loaded");
        Ok(())
    }

    pub fn load_critic(&mut self, path: &Path) -> Result<()> {
        load_varmap(&mut self.critic_varmap, path)?;
        info!(path = %path.display(), "critic loaded");
        Ok(())
    }
}

fn load_varmap(varmap: &mut VarMap, path: &Path) -> Result<()> {
    let buffer =
        fs::read(path).with_context(|| format!("reading checkpoint {}", path.display()))?;
    let checkpoint =
        SafeTensors::deserialize(&buffer).map_err(|err| CheckpointError::Malformed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    let names = checkpoint.names();
    let mut missing: Vec<String> = {
        let vars = varmap.data().lock().map_err(|_| CheckpointError::Poisoned)?;
        vars.keys()
            .filter(|name| !names.contains(name))
            .cloned()
            .collect()
    };
    if !missing.is_empty() {
        missing.sort();
        return Err(CheckpointError::MissingTensors {
            path: path.to_path_buf(),
            missing,
        }
        .into());
    }
    varmap.load(path)?;
    Ok(())
}
