mod model_trainer;

pub use model_trainer::{EpochLoss, ModelTrainer};
