use std::num::NonZeroUsize;

use rand::Rng;

use crate::{
    Result,
    arch::{Model, loss::LossFn},
    dataset::Dataset,
    optimization::Optimizer,
};

/// The losses measured at the end of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLoss {
    pub epoch: usize,
    pub loss: f32,
    pub val_loss: Option<f32>,
}

/// A model `Trainer`. Contains the relevant components needed for training a model,
/// except the model, its parameters and its optimizer, which are lent on each `train` call.
pub struct ModelTrainer<L, R>
where
    L: LossFn,
    R: Rng,
{
    loss_fn: L,
    epochs: usize,
    batch_size: NonZeroUsize,
    rng: R,
}

impl<L, R> ModelTrainer<L, R>
where
    L: LossFn,
    R: Rng,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `epochs` - The amount of passes over the dataset per `train` call.
    /// * `batch_size` - The amount of samples per optimizer step.
    /// * `rng` - A random number generator, used to shuffle the dataset on each epoch.
    pub fn new(loss_fn: L, epochs: usize, batch_size: NonZeroUsize, rng: R) -> Self {
        Self {
            loss_fn,
            epochs,
            batch_size,
            rng,
        }
    }

    /// Performs `epochs` epochs of training over `dataset`.
    ///
    /// # Arguments
    /// * `model` - The model being trained.
    /// * `params` - The model's parameters, updated in place.
    /// * `optimizer` - The optimizer applying each batch's gradient.
    /// * `dataset` - The training samples, reshuffled on every epoch.
    /// * `validation` - Samples only used to measure the loss after each epoch.
    ///
    /// # Returns
    /// The losses of every epoch.
    pub fn train<M: Model>(
        &mut self,
        model: &mut M,
        params: &mut [f32],
        optimizer: &mut dyn Optimizer,
        dataset: &mut Dataset,
        validation: Option<&Dataset>,
    ) -> Result<Vec<EpochLoss>> {
        let mut grad = vec![0.; model.size()];
        let mut losses = Vec::with_capacity(self.epochs);

        for epoch in 0..self.epochs {
            dataset.shuffle(&mut self.rng);
            let batches = dataset.batches(self.batch_size.get());

            let loss = model.backprop(params, &mut grad, &self.loss_fn, optimizer, batches)?;

            let val_loss = match validation {
                Some(val) => {
                    let y_pred = model.forward(params, val.x())?;
                    Some(self.loss_fn.loss(y_pred.view(), val.y()))
                }
                None => None,
            };

            log::debug!("epoch {epoch}: loss {loss}, val_loss {val_loss:?}");
            losses.push(EpochLoss {
                epoch,
                loss,
                val_loss,
            });
        }

        Ok(losses)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        arch::{Sequential, layers::Layer, loss::Mse},
        optimization::GradientDescent,
    };

    #[test]
    fn training_a_linear_model_converges() {
        let x = array![[0.], [1.], [2.], [3.]];
        let y = array![[1.], [3.], [5.], [7.]];
        let mut dataset = Dataset::new(x, y).unwrap();

        let mut model = Sequential::new([Layer::dense((1, 1), None)]);
        let mut params = vec![0., 0.];
        let mut optimizer = GradientDescent::new(0.05);

        let batch_size = NonZeroUsize::new(4).unwrap();
        let mut trainer = ModelTrainer::new(Mse, 500, batch_size, StdRng::seed_from_u64(0));

        let losses = trainer
            .train(&mut model, &mut params, &mut optimizer, &mut dataset, None)
            .unwrap();

        assert_eq!(losses.len(), 500);
        assert!(losses[499].loss < 1e-3);
        assert!((params[0] - 2.).abs() < 0.05);
        assert!((params[1] - 1.).abs() < 0.05);
    }

    #[test]
    fn validation_loss_is_reported() {
        let x = array![[0.], [1.]];
        let y = array![[0.], [1.]];
        let mut dataset = Dataset::new(x.clone(), y.clone()).unwrap();
        let validation = Dataset::new(x, y).unwrap();

        let mut model = Sequential::new([Layer::dense((1, 1), None)]);
        let mut params = vec![1., 0.];
        let mut optimizer = GradientDescent::new(0.);

        let batch_size = NonZeroUsize::new(2).unwrap();
        let mut trainer = ModelTrainer::new(Mse, 1, batch_size, StdRng::seed_from_u64(0));

        let losses = trainer
            .train(&mut model, &mut params, &mut optimizer, &mut dataset, Some(&validation))
            .unwrap();

        assert_eq!(losses[0].val_loss, Some(0.));
    }
}
