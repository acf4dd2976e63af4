pub mod record;
pub mod settings;

pub use record::{ConsistencyPolicy, ModelConfig, NormMode, OneOrMany, Shape, Task};
pub use settings::Settings;
