use super::{Optimizer, OptimizerSpec, OptimizerState, optimizer::check_len, optimizer::match_state};
use crate::Result;

/// Gradient descent optimization algorithm.
#[derive(Debug)]
pub struct GradientDescent {
    learning_rate: f32,
    len: Option<usize>,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_weights`.
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            len: None,
        }
    }
}

impl Optimizer for GradientDescent {
    fn build(&mut self, len: usize) {
        self.len = Some(len);
    }

    fn is_built(&self) -> bool {
        self.len.is_some()
    }

    /// Updates the parameters according to the algorithm's learning rule, that is, making a step in
    /// the opposite direction of the gradient, with a length of `learning_rate`.
    fn update_weights(&mut self, grad: &[f32], weights: &mut [f32]) -> Result<()> {
        let len = *self.len.get_or_insert(weights.len());
        check_len(grad, weights, len)?;

        let lr = self.learning_rate;

        for (w, g) in weights.iter_mut().zip(grad) {
            *w -= lr * g;
        }

        Ok(())
    }

    fn spec(&self) -> OptimizerSpec {
        OptimizerSpec::GradientDescent {
            learning_rate: self.learning_rate,
        }
    }

    fn state(&self) -> OptimizerState {
        Vec::new()
    }

    fn set_state(&mut self, state: &[(String, Vec<f32>)]) -> Result<()> {
        if !self.is_built() {
            return Err(crate::MlErr::OptimizerNotBuilt);
        }

        match_state(&[], state).map(|_| ())
    }
}
