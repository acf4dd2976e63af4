mod dense;
mod layer;

pub use dense::Dense;
pub use layer::{Layer, LayerSpec};
