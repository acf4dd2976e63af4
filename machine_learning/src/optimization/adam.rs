use super::{Optimizer, OptimizerSpec, OptimizerState, optimizer::check_len, optimizer::match_state};
use crate::{MlErr, Result};

/// The running moments of an `Adam` optimizer.
#[derive(Debug, Clone)]
struct Moments {
    beta1_t: f32,
    beta2_t: f32,
    v: Box<[f32]>,
    s: Box<[f32]>,
}

impl Moments {
    fn new(len: usize) -> Self {
        Self {
            beta1_t: 1.,
            beta2_t: 1.,
            v: vec![0.; len].into_boxed_slice(),
            s: vec![0.; len].into_boxed_slice(),
        }
    }
}

#[derive(Debug)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    moments: Option<Moments>,
}

impl Adam {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            moments: None,
        }
    }
}

impl Optimizer for Adam {
    fn build(&mut self, len: usize) {
        if self.moments.as_ref().is_some_and(|m| m.v.len() == len) {
            return;
        }

        self.moments = Some(Moments::new(len));
    }

    fn is_built(&self) -> bool {
        self.moments.is_some()
    }

    fn update_weights(&mut self, grad: &[f32], weights: &mut [f32]) -> Result<()> {
        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        let moments = self.moments.get_or_insert_with(|| Moments::new(weights.len()));
        check_len(grad, weights, moments.v.len())?;

        moments.beta1_t *= b1;
        moments.beta2_t *= b2;

        let bc1 = 1. - moments.beta1_t;
        let bc2 = 1. - moments.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        weights
            .iter_mut()
            .zip(grad)
            .zip(moments.v.iter_mut())
            .zip(moments.s.iter_mut())
            .for_each(|(((w, g), v), s)| {
                *v = b1 * *v + (1. - b1) * g;
                *s = b2 * *s + (1. - b2) * g.powi(2);
                *w -= step_size * *v / (s.sqrt() + eps);
            });

        Ok(())
    }

    fn spec(&self) -> OptimizerSpec {
        OptimizerSpec::Adam {
            learning_rate: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
        }
    }

    fn state(&self) -> OptimizerState {
        let Some(m) = &self.moments else {
            return Vec::new();
        };

        vec![
            ("beta1_t".into(), vec![m.beta1_t]),
            ("beta2_t".into(), vec![m.beta2_t]),
            ("v".into(), m.v.to_vec()),
            ("s".into(), m.s.to_vec()),
        ]
    }

    fn set_state(&mut self, state: &[(String, Vec<f32>)]) -> Result<()> {
        let m = self.moments.as_mut().ok_or(MlErr::OptimizerNotBuilt)?;
        let len = m.v.len();

        let values = match_state(&[("beta1_t", 1), ("beta2_t", 1), ("v", len), ("s", len)], state)?;

        m.beta1_t = values[0][0];
        m.beta2_t = values[1][0];
        m.v.copy_from_slice(values[2]);
        m.s.copy_from_slice(values[3]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_by_the_learning_rate() {
        let mut adam = Adam::new(0.1, 0.9, 0.999, 0.);
        let mut weights = [1., 1.];

        adam.update_weights(&[2., -3.], &mut weights).unwrap();

        assert!((weights[0] - 0.9).abs() < 1e-5);
        assert!((weights[1] - 1.1).abs() < 1e-5);
    }

    #[test]
    fn restored_state_continues_the_trajectory() {
        let mut trained = Adam::new(0.1, 0.9, 0.999, 1e-7);
        let mut weights = [1., -1.];
        for _ in 0..3 {
            trained.update_weights(&[0.5, -0.25], &mut weights).unwrap();
        }

        let mut restored = Adam::new(0.1, 0.9, 0.999, 1e-7);
        restored.build(2);
        restored.set_state(&trained.state()).unwrap();

        let mut a = weights;
        let mut b = weights;
        trained.update_weights(&[1., 1.], &mut a).unwrap();
        restored.update_weights(&[1., 1.], &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn set_state_rejects_foreign_names() {
        let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-7);
        adam.build(1);

        let mut state = adam.state();
        state.push(("velocity".into(), vec![0.]));

        assert!(matches!(
            adam.set_state(&state),
            Err(MlErr::UnknownOptimizerState { .. })
        ));
    }

    #[test]
    fn set_state_rejects_wrong_lengths() {
        let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-7);
        adam.build(2);

        let state = vec![
            ("beta1_t".to_string(), vec![0.9]),
            ("beta2_t".to_string(), vec![0.999]),
            ("v".to_string(), vec![0.]),
            ("s".to_string(), vec![0., 0.]),
        ];

        assert!(matches!(
            adam.set_state(&state),
            Err(MlErr::SizeMismatch { got: 1, expected: 2, .. })
        ));
    }
}
