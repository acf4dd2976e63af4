use serde::{Deserialize, Serialize};

use super::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer};

/// The specification for the `Optimizer` trait: a class name plus its hyperparameters.
///
/// Serializes as `{"class_name": "Adam", "config": {...}}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class_name", content = "config")]
pub enum OptimizerSpec {
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    GradientDescent {
        learning_rate: f32,
    },
    GradientDescentWithMomentum {
        learning_rate: f32,
        momentum: f32,
    },
}

impl OptimizerSpec {
    /// Builds a fresh, unbuilt optimizer following this spec.
    pub fn build(self) -> Box<dyn Optimizer> {
        match self {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => Box::new(Adam::new(learning_rate, beta1, beta2, epsilon)),
            OptimizerSpec::GradientDescent { learning_rate } => {
                Box::new(GradientDescent::new(learning_rate))
            }
            OptimizerSpec::GradientDescentWithMomentum {
                learning_rate,
                momentum,
            } => Box::new(GradientDescentWithMomentum::new(learning_rate, momentum)),
        }
    }

    /// The name this optimizer is registered with when serialized.
    pub fn class_name(&self) -> &'static str {
        match self {
            OptimizerSpec::Adam { .. } => "Adam",
            OptimizerSpec::GradientDescent { .. } => "GradientDescent",
            OptimizerSpec::GradientDescentWithMomentum { .. } => "GradientDescentWithMomentum",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_keeps_the_hyperparameters() {
        let spec = OptimizerSpec::GradientDescentWithMomentum {
            learning_rate: 0.1,
            momentum: 0.9,
        };

        let optimizer = spec.build();
        assert_eq!(optimizer.spec(), spec);
        assert!(!optimizer.is_built());
    }

    #[test]
    fn class_name_matches_the_serde_tag() {
        let spec = OptimizerSpec::GradientDescent { learning_rate: 0.5 };
        assert_eq!(spec.class_name(), "GradientDescent");
    }
}
