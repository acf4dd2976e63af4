use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::{MlErr, Result, arch::layers::Layer};

/// Samples the initial parameters of a stack of layers: Xavier uniform kernels and zero biases.
///
/// # Arguments
/// * `rng` - A random number generator.
/// * `layers` - The layers whose parameters are being generated, in storage order.
///
/// # Returns
/// The flat parameter buffer or an error if a layer has a degenerate fan.
pub fn xavier_uniform<R: Rng>(rng: &mut R, layers: &[Layer]) -> Result<Vec<f32>> {
    let size = layers.iter().map(Layer::size).sum();
    let mut params = Vec::with_capacity(size);

    for layer in layers {
        let (fan_in, fan_out) = layer.dim();
        let range = (6. / (fan_in + fan_out) as f32).sqrt();
        let distribution =
            Uniform::new(-range, range).map_err(|e| MlErr::InvalidInit(e.to_string()))?;

        for (name, shape) in layer.param_shapes() {
            let len: usize = shape.iter().product();

            match name {
                "kernel" => params.extend((&distribution).sample_iter(&mut *rng).take(len)),
                _ => params.extend(std::iter::repeat_n(0., len)),
            }
        }
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::arch::activations::ActFn;

    #[test]
    fn kernels_are_bounded_and_biases_zero() {
        let layers = [Layer::dense((4, 2), Some(ActFn::relu()))];
        let mut rng = StdRng::seed_from_u64(7);

        let params = xavier_uniform(&mut rng, &layers).unwrap();
        let range = (6f32 / 6.).sqrt();

        assert_eq!(params.len(), 10);
        assert!(params[..8].iter().all(|w| w.abs() <= range));
        assert!(params[8..].iter().all(|&b| b == 0.));
    }

    #[test]
    fn same_seed_same_parameters() {
        let layers = [Layer::dense((3, 3), None), Layer::dense((3, 1), None)];

        let a = xavier_uniform(&mut StdRng::seed_from_u64(1), &layers).unwrap();
        let b = xavier_uniform(&mut StdRng::seed_from_u64(1), &layers).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_layer_fails() {
        let layers = [Layer::dense((0, 0), None)];
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(
            xavier_uniform(&mut rng, &layers),
            Err(MlErr::InvalidInit(_))
        ));
    }
}
