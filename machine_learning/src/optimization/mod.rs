mod adam;
mod gradient_descent;
mod gradient_descent_with_momentum;
mod optimizer;
mod spec;

pub use adam::Adam;
pub use gradient_descent::GradientDescent;
pub use gradient_descent_with_momentum::GradientDescentWithMomentum;
pub use optimizer::{Optimizer, OptimizerState};
pub use spec::OptimizerSpec;
