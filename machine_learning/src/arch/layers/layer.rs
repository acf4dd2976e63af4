use ndarray::{ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

use super::Dense;
use crate::{
    Result,
    arch::activations::{ActFn, ActFnSpec},
};

#[derive(Clone, Debug)]
pub enum Layer {
    Dense(Dense),
}

/// The serializable description of a `Layer`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Dense {
        dim: (usize, usize),
        act_fn: Option<ActFnSpec>,
    },
}

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    pub fn size(&self) -> usize {
        match self {
            Self::Dense(l) => l.size(),
        }
    }

    /// The amount of inputs and outputs of the layer.
    pub fn dim(&self) -> (usize, usize) {
        match self {
            Self::Dense(l) => l.dim(),
        }
    }

    /// Splits the layer's parameter count into its named tensors, in storage order.
    pub fn param_shapes(&self) -> Vec<(&'static str, Vec<usize>)> {
        match self {
            Self::Dense(l) => {
                let (n, m) = l.dim();
                vec![("kernel", vec![n, m]), ("bias", vec![m])]
            }
        }
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<ArrayView2<'_, f32>> {
        match self {
            Self::Dense(l) => l.forward(params, x),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayViewMut2<f32>,
    ) -> Result<ArrayViewMut2<'_, f32>> {
        match self {
            Self::Dense(l) => l.backward(params, grad, d),
        }
    }

    pub fn regularize(&self, params: &[f32], grad: &mut [f32], l2: f32) {
        match self {
            Self::Dense(l) => l.regularize(params, grad, l2),
        }
    }

    pub fn spec(&self) -> LayerSpec {
        match self {
            Self::Dense(l) => LayerSpec::Dense {
                dim: l.dim(),
                act_fn: l.act_fn().map(ActFn::spec),
            },
        }
    }
}

impl From<LayerSpec> for Layer {
    fn from(spec: LayerSpec) -> Self {
        match spec {
            LayerSpec::Dense { dim, act_fn } => Layer::dense(dim, act_fn.map(ActFn::from)),
        }
    }
}
