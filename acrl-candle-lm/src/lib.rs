pub mod actor;
pub mod actor_critic;
pub mod critic;
pub mod error;
pub mod optimizer;
pub mod sequential;
pub mod tensors;

use sequential::Activation;
use serde::{Deserialize, Serialize};

/// Shape of the actor and critic networks. Both use the same hidden layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub hidden_size: Vec<usize>,
    pub activation: Activation,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_size: vec![64, 64],
            activation: Activation::Tanh,
        }
    }
}
