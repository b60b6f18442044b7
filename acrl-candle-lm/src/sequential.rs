use candle_core::{Module, Result, Tensor};
use candle_nn::{Linear, VarBuilder, linear};
use either::Either;
use serde::{Deserialize, Serialize};

/// Hidden layer nonlinearity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Tanh,
    Relu,
}

impl Module for Activation {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match self {
            Self::Tanh => xs.tanh(),
            Self::Relu => xs.relu(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinearLayer {
    layer: Linear,
    in_dim: usize,
    out_dim: usize,
}

impl LinearLayer {
    pub fn new(in_dim: usize, out_dim: usize, vb: &VarBuilder, prefix: &str) -> Result<Self> {
        let layer = linear(in_dim, out_dim, vb.pp(prefix))?;
        Ok(Self {
            layer,
            in_dim,
            out_dim,
        })
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.in_dim, self.out_dim)
    }
}

impl Module for LinearLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.layer.forward(xs)
    }
}

#[derive(Debug, Clone)]
pub struct Layer(pub Either<LinearLayer, Activation>);

impl Layer {
    pub fn linear(linear: LinearLayer) -> Self {
        Self(Either::Left(linear))
    }

    pub fn activation(activation: Activation) -> Self {
        Self(Either::Right(activation))
    }
}

impl Module for Layer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match &self.0 {
            Either::Left(linear) => linear.forward(xs),
            Either::Right(activation) => activation.forward(xs),
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct Mlp {
    layers: Vec<Layer>,
}

impl Mlp {
    pub fn add_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Shapes of the linear layers, input to output.
    pub fn linear_dims(&self) -> Vec<(usize, usize)> {
        self.layers
            .iter()
            .filter_map(|layer| layer.0.as_ref().left().map(LinearLayer::dims))
            .collect()
    }
}

impl Module for Mlp {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        for layer in self.layers.iter() {
            xs = layer.forward(&xs)?
        }
        Ok(xs)
    }
}

/// `hidden.len() + 1` linear layers with `activation` between them and a linear output. Layer
/// variables are named `{prefix}{idx}.weight` / `{prefix}{idx}.bias`.
pub fn mlp(
    input_dim: usize,
    hidden: &[usize],
    output_dim: usize,
    activation: Activation,
    vb: &VarBuilder,
    prefix: &str,
) -> Result<Mlp> {
    let mut last_dim = input_dim;
    let mut nn = Mlp::default();
    for (layer_idx, layer_size) in hidden.iter().enumerate() {
        let layer = LinearLayer::new(last_dim, *layer_size, vb, &format!("{prefix}{layer_idx}"))?;
        nn = nn
            .add_layer(Layer::linear(layer))
            .add_layer(Layer::activation(activation));
        last_dim = *layer_size;
    }
    let output = LinearLayer::new(last_dim, output_dim, vb, &format!("{prefix}{}", hidden.len()))?;
    Ok(nn.add_layer(Layer::linear(output)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn builds_hidden_plus_one_linear_layers() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let net = mlp(3, &[8, 4], 2, Activation::Tanh, &vb, "a_net")?;
        assert_eq!(net.linear_dims(), vec![(3, 8), (8, 4), (4, 2)]);
        assert_eq!(net.layers.len(), 5);
        assert_eq!(varmap.all_vars().len(), 6);
        Ok(())
    }

    #[test]
    fn forward_maps_batch_to_output_dim() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let net = mlp(3, &[5], 1, Activation::Relu, &vb, "c_net")?;
        let xs = Tensor::ones((7, 3), DType::F32, &Device::Cpu)?;
        assert_eq!(net.forward(&xs)?.dims(), &[7, 1]);
        Ok(())
    }

    #[test]
    fn no_hidden_layers_is_a_single_linear_map() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let net = mlp(2, &[], 3, Activation::Tanh, &vb, "x")?;
        assert_eq!(net.linear_dims(), vec![(2, 3)]);
        Ok(())
    }

    #[test]
    fn tanh_activation_is_bounded() -> Result<()> {
        let xs = Tensor::new(&[-100f32, 0., 100.], &Device::Cpu)?;
        let ys = Activation::Tanh.forward(&xs)?.to_vec1::<f32>()?;
        assert!((ys[0] + 1.).abs() < 1e-6);
        assert_eq!(ys[1], 0.);
        assert!((ys[2] - 1.).abs() < 1e-6);
        Ok(())
    }
}
