use machine_learning::arch::{Sequential, activations::ActFn};

use super::{GraphSet, dense_stack, io_features, output_activation};
use crate::{Result, config::ModelConfig};

/// The widths of the convolution stages. Each stage becomes a dense stage with
/// `num_filters * filter_length` units, shrunk by the stage's pooling length.
pub(super) fn conv_widths(config: &ModelConfig) -> Vec<usize> {
    let filters = config
        .num_filters
        .as_ref()
        .map(|n| n.to_vec())
        .unwrap_or_default();
    let lengths = config
        .filter_length
        .as_ref()
        .map(|n| n.to_vec())
        .unwrap_or_default();
    let pools = config
        .pool_length
        .as_ref()
        .map(|n| n.to_vec())
        .unwrap_or_default();

    // shorter sequences repeat their last entry
    let nth = |values: &[usize], i: usize| values.get(i).or(values.last()).copied().unwrap_or(1);

    filters
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let width = n * nth(&lengths, i).max(1);
            let pool = if i + 1 == filters.len() {
                nth(&pools, 0).max(1)
            } else {
                1
            };

            (width / pool).max(1)
        })
        .collect()
}

/// input -> convolution stages -> hidden stages -> labels.
pub(super) fn conv_graph(config: &ModelConfig) -> Result<GraphSet> {
    let (input, labels) = io_features(config)?;

    let mut widths = vec![input];
    widths.extend(conv_widths(config));
    widths.extend(&config.num_hidden);
    widths.push(labels);

    let layers = dense_stack(&widths, &ActFn::relu(), output_activation(config.task));
    Ok(GraphSet::new(Sequential::new(layers).with_l2(config.l2)))
}
