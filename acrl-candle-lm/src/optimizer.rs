use anyhow::Result;
use candle_core::{Tensor, backprop::GradStore};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use std::fmt::Debug;

/// Rescales every gradient so that the global l2 norm does not exceed `max_norm`.
pub fn clip_grad(loss: &Tensor, varmap: &VarMap, max_norm: f32) -> Result<GradStore> {
    let mut grad_store = loss.backward()?;
    let mut grads = vec![];
    let mut total_norm_squared = 0f32;
    for var in varmap.all_vars() {
        if let Some(grad) = grad_store.get(var.as_tensor()) {
            total_norm_squared += grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
            grads.push((var, grad.clone()));
        }
    }
    let total_norm = total_norm_squared.sqrt();
    if total_norm > max_norm {
        let clip_coef = (max_norm / (total_norm + 1e-6)) as f64;
        for (var, grad) in grads {
            grad_store.insert(var.as_tensor(), grad.affine(clip_coef, 0.)?);
        }
    }
    Ok(grad_store)
}

/// Adam over the variables of a single `VarMap`, optionally with gradient norm clipping.
pub struct OptimizerWithMaxGrad {
    pub optimizer: AdamW,
    pub max_grad_norm: Option<f32>,
    pub varmap: VarMap,
}

impl Debug for OptimizerWithMaxGrad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerWithMaxGrad")
            .field("learning_rate", &self.optimizer.learning_rate())
            .field("max_grad_norm", &self.max_grad_norm)
            .finish()
    }
}

impl OptimizerWithMaxGrad {
    /// Plain Adam: AdamW with the weight decay switched off.
    pub fn adam(varmap: VarMap, lr: f64, max_grad_norm: Option<f32>) -> Result<Self> {
        let params = ParamsAdamW {
            lr,
            weight_decay: 0.,
            ..Default::default()
        };
        let optimizer = AdamW::new(varmap.all_vars(), params)?;
        Ok(Self {
            optimizer,
            max_grad_norm,
            varmap,
        })
    }

    pub fn learning_rate(&self) -> f64 {
        self.optimizer.learning_rate()
    }

    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        let grads = if let Some(max_norm) = self.max_grad_norm {
            clip_grad(loss, &self.varmap, max_norm)?
        } else {
            loss.backward()?
        };
        self.optimizer.step(&grads)?;
        Ok(())
    }
}
