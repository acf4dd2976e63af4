use serde::{Deserialize, Serialize};

use super::{Relu, Sigmoid};

#[derive(Clone, Debug, PartialEq)]
pub enum ActFn {
    Sigmoid(Sigmoid),
    Relu(Relu),
}

/// The serializable description of an `ActFn`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Sigmoid { amp: f32 },
    Relu,
}

impl ActFn {
    pub fn sigmoid(amp: f32) -> Self {
        Self::Sigmoid(Sigmoid::new(amp))
    }

    pub fn relu() -> Self {
        Self::Relu(Relu::new())
    }

    pub fn f(&self, x: f32) -> f32 {
        match self {
            Self::Sigmoid(a) => a.f(x),
            Self::Relu(a) => a.f(x),
        }
    }

    pub fn df(&self, x: f32) -> f32 {
        match self {
            Self::Sigmoid(a) => a.df(x),
            Self::Relu(a) => a.df(x),
        }
    }

    pub fn spec(&self) -> ActFnSpec {
        match self {
            Self::Sigmoid(a) => ActFnSpec::Sigmoid { amp: a.amp() },
            Self::Relu(_) => ActFnSpec::Relu,
        }
    }
}

impl From<ActFnSpec> for ActFn {
    fn from(spec: ActFnSpec) -> Self {
        match spec {
            ActFnSpec::Sigmoid { amp } => ActFn::sigmoid(amp),
            ActFnSpec::Relu => ActFn::relu(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_centered_at_half_amplitude() {
        let act_fn = ActFn::sigmoid(2.);
        assert_eq!(act_fn.f(0.), 1.);
        assert_eq!(act_fn.df(0.), 0.5);
    }

    #[test]
    fn relu_clips_negatives() {
        let act_fn = ActFn::relu();
        assert_eq!(act_fn.f(-3.), 0.);
        assert_eq!(act_fn.f(3.), 3.);
        assert_eq!(act_fn.df(-3.), 0.);
        assert_eq!(act_fn.df(3.), 1.);
    }

    #[test]
    fn spec_rebuilds_the_same_function() {
        let act_fn = ActFn::sigmoid(1.5);
        assert_eq!(ActFn::from(act_fn.spec()), act_fn);
    }
}
