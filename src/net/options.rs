use machine_learning::optimization::OptimizerSpec;
use rand::{SeedableRng, rngs::StdRng};

/// Hyperparameters of the training loop and of the default optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOptions {
    pub lr: f32,
    pub beta_1: f32,
    pub beta_2: f32,
    pub optimizer_epsilon: f32,
    pub max_epochs: usize,
    /// Seeds weight initialization and shuffling, random when `None`.
    pub seed: Option<u64>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            lr: 0.005,
            beta_1: 0.9,
            beta_2: 0.999,
            optimizer_epsilon: 1e-7,
            max_epochs: 50,
            seed: None,
        }
    }
}

impl TrainingOptions {
    /// The Adam optimizer bound when `compile` is given none.
    pub fn optimizer(&self) -> OptimizerSpec {
        OptimizerSpec::Adam {
            learning_rate: self.lr,
            beta1: self.beta_1,
            beta2: self.beta_2,
            epsilon: self.optimizer_epsilon,
        }
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// When `NeuralNet::train` writes the model folder.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PersistPolicy {
    /// Only after training finished without errors.
    #[default]
    OnSuccess,
    /// Also after training failed, keeping whatever state was reached.
    Always,
    Never,
}

impl PersistPolicy {
    pub fn should_persist(self, succeeded: bool) -> bool {
        match self {
            PersistPolicy::OnSuccess => succeeded,
            PersistPolicy::Always => true,
            PersistPolicy::Never => false,
        }
    }
}
