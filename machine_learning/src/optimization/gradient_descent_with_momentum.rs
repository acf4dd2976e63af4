use super::{Optimizer, OptimizerSpec, OptimizerState, optimizer::check_len, optimizer::match_state};
use crate::{MlErr, Result};

#[derive(Debug)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    velocity: Option<Box<[f32]>>,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Hyperparameter to the optimization algorithm.
    pub fn new(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: None,
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn build(&mut self, len: usize) {
        if self.velocity.as_ref().is_some_and(|v| v.len() == len) {
            return;
        }

        self.velocity = Some(vec![0.; len].into_boxed_slice());
    }

    fn is_built(&self) -> bool {
        self.velocity.is_some()
    }

    fn update_weights(&mut self, grad: &[f32], weights: &mut [f32]) -> Result<()> {
        let lr = self.learning_rate;
        let mu = self.momentum;
        let velocity = self
            .velocity
            .get_or_insert_with(|| vec![0.; weights.len()].into_boxed_slice());
        check_len(grad, weights, velocity.len())?;

        weights
            .iter_mut()
            .zip(grad)
            .zip(velocity.iter_mut())
            .for_each(|((w, g), v)| {
                *v = (mu * *v) + g;
                *w -= lr * *v;
            });

        Ok(())
    }

    fn spec(&self) -> OptimizerSpec {
        OptimizerSpec::GradientDescentWithMomentum {
            learning_rate: self.learning_rate,
            momentum: self.momentum,
        }
    }

    fn state(&self) -> OptimizerState {
        match &self.velocity {
            Some(velocity) => vec![("velocity".into(), velocity.to_vec())],
            None => Vec::new(),
        }
    }

    fn set_state(&mut self, state: &[(String, Vec<f32>)]) -> Result<()> {
        let velocity = self.velocity.as_mut().ok_or(MlErr::OptimizerNotBuilt)?;
        let values = match_state(&[("velocity", velocity.len())], state)?;
        velocity.copy_from_slice(values[0]);
        Ok(())
    }
}
