use super::OptimizerSpec;
use crate::{MlErr, Result};

/// The internal accumulators of an optimizer, as `(name, values)` pairs in a stable order.
pub type OptimizerState = Vec<(String, Vec<f32>)>;

/// Defines the strategy for updating model parameters based on calculated gradients.
///
/// The `Optimizer` trait is responsible for the mathematical transition of weights from state `t` to `t+1`.
/// Stateful optimizers allocate their accumulators lazily in `build`, which must happen before
/// any state can be assigned to them.
pub trait Optimizer {
    /// Allocates the optimizer's accumulators for `len` parameters.
    ///
    /// Calling it again with the same length keeps the current state.
    fn build(&mut self, len: usize);

    /// Whether `build` was already called.
    fn is_built(&self) -> bool;

    /// Updates the provided slice of weights using the accumulated gradients, building the
    /// optimizer first if needed.
    ///
    /// # Arguments
    /// * `grad` - The accumulated gradients corresponding to the `weights` slice.
    /// * `weights` - A mutable slice of the current parameter values.
    fn update_weights(&mut self, grad: &[f32], weights: &mut [f32]) -> Result<()>;

    /// Returns the class name and hyperparameters needed to rebuild an equivalent optimizer.
    fn spec(&self) -> OptimizerSpec;

    /// Returns a copy of the internal state, empty when the optimizer was not built.
    fn state(&self) -> OptimizerState;

    /// Overwrites the internal state.
    ///
    /// # Errors
    /// `OptimizerNotBuilt` if `build` was not called, `UnknownOptimizerState` for names the
    /// optimizer does not own, `MissingOptimizerState` when one of its names is absent and
    /// `SizeMismatch` when an accumulator has the wrong length.
    fn set_state(&mut self, state: &[(String, Vec<f32>)]) -> Result<()>;
}

/// Validates a state vector against the slots an optimizer owns, in the optimizer's order.
///
/// # Returns
/// The values for each slot, in the order of `slots`.
pub(super) fn match_state<'s>(
    slots: &[(&str, usize)],
    state: &'s [(String, Vec<f32>)],
) -> Result<Vec<&'s [f32]>> {
    if let Some((name, _)) = state
        .iter()
        .find(|(name, _)| !slots.iter().any(|(slot, _)| slot == name))
    {
        return Err(MlErr::UnknownOptimizerState { name: name.clone() });
    }

    slots
        .iter()
        .map(|&(slot, len)| {
            let (_, values) = state
                .iter()
                .find(|(name, _)| name == slot)
                .ok_or_else(|| MlErr::MissingOptimizerState { name: slot.into() })?;

            if values.len() != len {
                return Err(MlErr::SizeMismatch {
                    what: "optimizer state",
                    got: values.len(),
                    expected: len,
                });
            }

            Ok(values.as_slice())
        })
        .collect()
}

pub(super) fn check_len(grad: &[f32], weights: &[f32], expected: usize) -> Result<()> {
    for got in [grad.len(), weights.len()] {
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what: "optimizer update",
                got,
                expected,
            });
        }
    }

    Ok(())
}
