use std::{fmt, iter, num::NonZeroUsize, ops::Range};

use machine_learning::{
    arch::{Model, loss::{LossFn, Mse}},
    dataset::Dataset,
    optimization::{Optimizer, OptimizerState},
    training::{EpochLoss, ModelTrainer},
};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use crate::{Result, ZooError, models::GraphSet};

/// Where one named parameter tensor lives in the flat parameter buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSlot {
    pub name: String,
    pub shape: Vec<usize>,
    pub range: Range<usize>,
}

/// The graphs of an architecture bound to their parameters, loss and optimizer.
pub struct CompiledModel {
    graphs: GraphSet,
    params: Vec<f32>,
    optimizer: Box<dyn Optimizer>,
    loss: Option<Mse>,
}

impl fmt::Debug for CompiledModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledModel")
            .field("graphs", &self.graphs)
            .field("params", &self.params.len())
            .field("optimizer", &self.optimizer.spec())
            .field("loss", &self.loss)
            .finish()
    }
}

impl CompiledModel {
    /// Creates a new `CompiledModel`.
    ///
    /// # Arguments
    /// * `graphs` - The graphs built by the architecture.
    /// * `params` - The initial parameters of the trainable graph.
    /// * `optimizer` - The optimizer applying the gradients, built lazily.
    /// * `loss` - The supervised loss, if any.
    ///
    /// # Returns
    /// A new `CompiledModel` or an error if the parameters don't fit the graph.
    pub fn new(
        graphs: GraphSet,
        params: Vec<f32>,
        optimizer: Box<dyn Optimizer>,
        loss: Option<Mse>,
    ) -> Result<Self> {
        check_len(params.len(), graphs.trainable.size())?;

        Ok(Self {
            graphs,
            params,
            optimizer,
            loss,
        })
    }

    pub fn graphs(&self) -> &GraphSet {
        &self.graphs
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// Overwrites every parameter of the trainable graph.
    pub fn set_params(&mut self, params: &[f32]) -> Result<()> {
        check_len(params.len(), self.params.len())?;
        self.params.copy_from_slice(params);
        Ok(())
    }

    pub fn optimizer(&self) -> &dyn Optimizer {
        self.optimizer.as_ref()
    }

    pub fn loss(&self) -> Option<Mse> {
        self.loss
    }

    /// Names every parameter tensor `dense_<i>/<kernel|bias>`, in storage order.
    pub fn tensor_slots(&self) -> Vec<TensorSlot> {
        let layers = self.graphs.trainable.layers();
        let offsets = self.graphs.trainable.offsets();
        let mut slots = Vec::new();

        for (i, (layer, range)) in layers.iter().zip(offsets).enumerate() {
            let mut start = range.start;

            for (tensor, shape) in layer.param_shapes() {
                let len: usize = shape.iter().product();
                slots.push(TensorSlot {
                    name: format!("dense_{i}/{tensor}"),
                    shape,
                    range: start..start + len,
                });
                start += len;
            }
        }

        slots
    }

    /// Builds the optimizer's update path so its state can be assigned.
    pub fn make_train_function(&mut self) {
        if !self.optimizer.is_built() {
            self.optimizer.build(self.params.len());
        }
    }

    /// Assigns previously exported optimizer state. Fails unless `make_train_function` ran.
    ///
    /// An empty state comes from a model saved before its first step and leaves the
    /// freshly built state untouched.
    pub fn set_optimizer_state(&mut self, state: &[(String, Vec<f32>)]) -> Result<()> {
        if state.is_empty() && self.optimizer.is_built() {
            log::debug!("no optimizer state saved, keeping the fresh one");
            return Ok(());
        }

        self.optimizer.set_state(state)?;
        Ok(())
    }

    pub fn optimizer_state(&self) -> OptimizerState {
        self.optimizer.state()
    }

    /// Replaces the optimizer with a fresh one of the same spec.
    pub fn reset_optimizer(&mut self) {
        self.optimizer = self.optimizer.spec().build();
    }

    pub fn predict(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        Ok(self.graphs.trainable.forward(&self.params, x)?)
    }

    /// Runs only the sub-graph `name`, e.g. the decoder of an autoencoder.
    pub fn run_part(&mut self, name: &str, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let span = self
            .graphs
            .part(name)
            .map(|part| part.layers.clone())
            .ok_or_else(|| ZooError::InvalidConfig(format!("no sub-graph named '{name}'")))?;

        Ok(self.graphs.trainable.forward_span(&self.params, x, span)?)
    }

    /// Takes one optimizer step over a single batch.
    ///
    /// # Returns
    /// The loss measured before the step.
    pub fn train_on_batch(&mut self, x: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<f32> {
        let loss = self.loss.unwrap_or_default();
        let mut grad = vec![0.; self.params.len()];

        let loss = self.graphs.trainable.backprop(
            &mut self.params,
            &mut grad,
            &loss,
            self.optimizer.as_mut(),
            iter::once((x, y)),
        )?;

        Ok(loss)
    }

    /// Runs `epochs` epochs of mini-batch training.
    ///
    /// # Arguments
    /// * `loss_fn` - The objective being minimized.
    /// * `train` - The training samples.
    /// * `validation` - Samples only used to measure the loss.
    /// * `epochs` - The amount of passes over `train`.
    /// * `batch_size` - The amount of samples per optimizer step.
    /// * `rng` - Shuffles `train` on every epoch.
    pub fn fit<L, R>(
        &mut self,
        loss_fn: L,
        train: &mut Dataset,
        validation: Option<&Dataset>,
        epochs: usize,
        batch_size: usize,
        rng: R,
    ) -> Result<Vec<EpochLoss>>
    where
        L: LossFn,
        R: Rng,
    {
        let batch_size = NonZeroUsize::new(batch_size)
            .ok_or_else(|| ZooError::InvalidConfig("batch_size must be positive".into()))?;

        let mut trainer = ModelTrainer::new(loss_fn, epochs, batch_size, rng);
        let losses = trainer.train(
            &mut self.graphs.trainable,
            &mut self.params,
            self.optimizer.as_mut(),
            train,
            validation,
        )?;

        Ok(losses)
    }
}

fn check_len(got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(ZooError::InvalidWeights(format!(
            "got {got} parameters but the graph has {expected}"
        )));
    }

    Ok(())
}
