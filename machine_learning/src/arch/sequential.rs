use std::ops::Range;

use ndarray::{Array2, ArrayView2};

use super::{Model, layers::Layer, loss::LossFn};
use crate::{MlErr, Result, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
    l2: Option<f32>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
            l2: None,
        }
    }

    /// Penalizes the kernels with `l2 * ||w||^2 / 2` while backpropagating.
    pub fn with_l2(mut self, l2: Option<f32>) -> Self {
        self.l2 = l2;
        self
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Returns the parameter range owned by each layer, in order.
    pub fn offsets(&self) -> Vec<Range<usize>> {
        let mut start = 0;

        self.layers
            .iter()
            .map(|layer| {
                let range = start..start + layer.size();
                start = range.end;
                range
            })
            .collect()
    }

    /// Makes a forward pass through a contiguous span of layers.
    ///
    /// # Arguments
    /// * `params` - The parameters of the whole model.
    /// * `x` - The input of the first layer in the span.
    /// * `span` - The layers to run.
    ///
    /// # Returns
    /// The output of the last layer in the span or an error if occurred.
    pub fn forward_span(
        &mut self,
        params: &[f32],
        x: ArrayView2<f32>,
        span: Range<usize>,
    ) -> Result<Array2<f32>> {
        self.check_params(params)?;

        if span.end > self.layers.len() || span.start > span.end {
            return Err(MlErr::SizeMismatch {
                what: "layers",
                got: span.end,
                expected: self.layers.len(),
            });
        }

        let offsets = self.offsets();
        let mut out = x.to_owned();

        for i in span {
            let y = self.layers[i].forward(&params[offsets[i].clone()], out.view())?;
            out = y.to_owned();
        }

        Ok(out)
    }

    fn check_params(&self, params: &[f32]) -> Result<()> {
        let expected = self.size();

        if params.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "model parameters",
                got: params.len(),
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let nlayers = self.layers.len();
        self.forward_span(params, x, 0..nlayers)
    }

    // NOTE: the epoch loss is approximated by averaging the loss of each batch, measured before
    // the batch's update is applied.
    fn backprop<'a, L, I>(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        loss_fn: &L,
        optimizer: &mut dyn Optimizer,
        batches: I,
    ) -> Result<f32>
    where
        L: LossFn + ?Sized,
        I: Iterator<Item = (ArrayView2<'a, f32>, ArrayView2<'a, f32>)>,
    {
        self.check_params(params)?;

        if grad.len() != params.len() {
            return Err(MlErr::SizeMismatch {
                what: "gradient",
                got: grad.len(),
                expected: params.len(),
            });
        }

        let offsets = self.offsets();
        let mut total_loss = 0.0;
        let mut num_batches = 0;

        for (x, y) in batches {
            grad.fill(0.);

            let y_pred = self.forward(params, x)?;
            total_loss += loss_fn.loss(y_pred.view(), y);
            num_batches += 1;

            let mut d_last = loss_fn.loss_prime(y_pred.view(), y);
            let mut d = d_last.view_mut();

            for (layer, range) in self.layers.iter_mut().zip(&offsets).rev() {
                let layer_params = &params[range.clone()];
                let layer_grad = &mut grad[range.clone()];

                d = layer.backward(layer_params, layer_grad, d)?;
            }

            if let Some(l2) = self.l2 {
                for (layer, range) in self.layers.iter().zip(&offsets) {
                    layer.regularize(&params[range.clone()], &mut grad[range.clone()], l2);
                }
            }

            optimizer.update_weights(grad, params)?;
        }

        if num_batches == 0 {
            return Err(MlErr::EmptyDataset);
        }

        Ok(total_loss / num_batches as f32)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        arch::{activations::ActFn, loss::Mse},
        optimization::GradientDescent,
    };

    fn two_layer() -> Sequential {
        Sequential::new([
            Layer::dense((2, 2), Some(ActFn::relu())),
            Layer::dense((2, 1), None),
        ])
    }

    #[test]
    fn offsets_cover_every_parameter() {
        let model = two_layer();
        assert_eq!(model.offsets(), vec![0..6, 6..9]);
        assert_eq!(model.size(), 9);
    }

    #[test]
    fn forward_span_runs_only_the_requested_layers() {
        let mut model = two_layer();
        let params = [1., 0., 0., 1., 0., 0., 1., 1., 0.];
        let x = array![[1., 2.]];

        let hidden = model.forward_span(&params, x.view(), 0..1).unwrap();
        assert_eq!(hidden, array![[1., 2.]]);

        let out = model.forward(&params, x.view()).unwrap();
        assert_eq!(out, array![[3.]]);
    }

    #[test]
    fn backprop_reduces_the_loss() {
        let mut model = two_layer();
        let mut params = vec![0.5, -0.2, 0.1, 0.3, 0., 0., 0.4, -0.1, 0.];
        let mut grad = vec![0.; params.len()];
        let mut optimizer = GradientDescent::new(0.05);

        let x = array![[1., 0.], [0., 1.], [1., 1.]];
        let y = array![[1.], [0.], [1.]];

        let first = model
            .backprop(
                &mut params,
                &mut grad,
                &Mse,
                &mut optimizer,
                std::iter::once((x.view(), y.view())),
            )
            .unwrap();

        let mut last = first;
        for _ in 0..50 {
            last = model
                .backprop(
                    &mut params,
                    &mut grad,
                    &Mse,
                    &mut optimizer,
                    std::iter::once((x.view(), y.view())),
                )
                .unwrap();
        }

        assert!(last < first);
    }

    #[test]
    fn backprop_without_batches_fails() {
        let mut model = two_layer();
        let mut params = vec![0.; model.size()];
        let mut grad = vec![0.; model.size()];
        let mut optimizer = GradientDescent::new(0.05);

        let result = model.backprop(
            &mut params,
            &mut grad,
            &Mse,
            &mut optimizer,
            std::iter::empty(),
        );

        assert!(matches!(result, Err(MlErr::EmptyDataset)));
    }
}
