mod apogee;
mod cifar;
mod conv;
mod generative;

use std::ops::Range;

use machine_learning::{
    arch::{Sequential, activations::ActFn, layers::Layer, loss::Mse},
    dataset::Dataset,
    training::EpochLoss,
};
use ndarray::Array2;

pub use apogee::{ApogeeBcnn, ApogeeCnn, StarNet2017};
pub use cifar::{Cifar10Cnn, GALAXY10_CLASSES, Galaxy10Cnn, MnistBcnn};
pub use generative::{ApogeeCvae, Galaxy10Gan, GalaxyGan2017};

use crate::{
    Result, ZooError,
    config::{ModelConfig, Task},
    net::{CompiledModel, TrainingOptions},
};

/// A named contiguous run of layers inside a `GraphSet`'s trainable graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubGraph {
    pub name: &'static str,
    pub layers: Range<usize>,
}

/// The graphs built by an architecture: the one being trained plus the named sub-graphs
/// sharing its parameters (encoder and decoder, generator and discriminator).
#[derive(Debug, Clone)]
pub struct GraphSet {
    pub trainable: Sequential,
    pub parts: Vec<SubGraph>,
}

impl GraphSet {
    pub fn new(trainable: Sequential) -> Self {
        Self {
            trainable,
            parts: Vec::new(),
        }
    }

    pub fn with_part(mut self, name: &'static str, layers: Range<usize>) -> Self {
        self.parts.push(SubGraph { name, layers });
        self
    }

    pub fn part(&self, name: &str) -> Option<&SubGraph> {
        self.parts.iter().find(|part| part.name == name)
    }

    /// Copies the layers of the sub-graph `name` into a standalone graph.
    pub fn extract(&self, name: &str) -> Result<Sequential> {
        let part = self
            .part(name)
            .ok_or_else(|| ZooError::InvalidConfig(format!("no sub-graph named '{name}'")))?;

        let layers = self.trainable.layers()[part.layers.clone()].iter().cloned();
        Ok(Sequential::new(layers))
    }
}

/// The capabilities every architecture of the zoo provides. Built-ins and plugins alike
/// are driven through this trait by `NeuralNet`.
pub trait Architecture {
    /// The human readable name, e.g. `Convolutional Neural Network`.
    fn name(&self) -> &str;

    /// The identifier stored in the parameter record and resolved by the registry.
    fn identifier(&self) -> &str;

    fn default_config(&self) -> ModelConfig {
        ModelConfig::new(self.identifier())
    }

    /// Builds the graphs described by `config`.
    fn model(&self, config: &ModelConfig) -> Result<GraphSet>;

    fn discriminator(&self, _config: &ModelConfig) -> Result<Sequential> {
        Err(ZooError::Unsupported {
            identifier: self.identifier().to_string(),
            what: "discriminator",
        })
    }

    fn generator(&self, _config: &ModelConfig) -> Result<Sequential> {
        Err(ZooError::Unsupported {
            identifier: self.identifier().to_string(),
            what: "generator",
        })
    }

    /// The supervised loss, `None` when the architecture trains on its own objective.
    fn loss(&self) -> Option<Mse> {
        Some(Mse)
    }

    /// Drives training over already normalized data.
    ///
    /// # Arguments
    /// * `model` - The compiled graphs, parameters and optimizer.
    /// * `config` - The record of the instance being trained.
    /// * `options` - Epochs, seed and optimizer hyperparameters.
    /// * `input` - One sample per row.
    /// * `target` - One target per row.
    ///
    /// # Returns
    /// The losses of every epoch.
    fn train(
        &self,
        model: &mut CompiledModel,
        config: &ModelConfig,
        options: &TrainingOptions,
        input: Array2<f32>,
        target: Array2<f32>,
    ) -> Result<Vec<EpochLoss>> {
        let loss = model.loss().unwrap_or_default();
        fit_with_validation(model, loss, config, options, input, target)
    }
}

/// Holds out the last `val_size` fraction of the samples and trains on the rest.
pub fn fit_with_validation(
    model: &mut CompiledModel,
    loss: Mse,
    config: &ModelConfig,
    options: &TrainingOptions,
    input: Array2<f32>,
    target: Array2<f32>,
) -> Result<Vec<EpochLoss>> {
    let (mut train, validation) = Dataset::new(input, target)?.split(config.val_size)?;

    log::info!(
        "training {} on {} samples, validating on {}",
        config.identifier,
        train.len(),
        validation.as_ref().map_or(0, Dataset::len)
    );

    let losses = model.fit(
        loss,
        &mut train,
        validation.as_ref(),
        options.max_epochs,
        config.batch_size,
        options.rng(),
    )?;

    if let Some(last) = losses.last() {
        log::info!(
            "finished after {} epochs: loss {}, val_loss {:?}",
            losses.len(),
            last.loss,
            last.val_loss
        );
    }

    Ok(losses)
}

/// Chains dense layers through `widths`. Every layer but the last uses `hidden`.
pub(crate) fn dense_stack(widths: &[usize], hidden: &ActFn, last: Option<ActFn>) -> Vec<Layer> {
    let nlayers = widths.len().saturating_sub(1);

    widths
        .windows(2)
        .enumerate()
        .map(|(i, dims)| {
            let act_fn = if i + 1 == nlayers {
                last.clone()
            } else {
                Some(hidden.clone())
            };

            Layer::dense((dims[0], dims[1]), act_fn)
        })
        .collect()
}

/// The output activation matching a task.
pub(crate) fn output_activation(task: Task) -> Option<ActFn> {
    match task {
        Task::Regression => None,
        Task::Classification | Task::BinaryClassification => Some(ActFn::sigmoid(1.)),
    }
}

/// The input and label widths, failing while either shape is unset.
pub(crate) fn io_features(config: &ModelConfig) -> Result<(usize, usize)> {
    let input = config.input_shape.features();
    let labels = config.labels_shape.features();

    if input == 0 || labels == 0 {
        return Err(ZooError::InvalidConfig(format!(
            "{} needs both the input and labels shapes before building its graph",
            config.identifier
        )));
    }

    Ok((input, labels))
}
