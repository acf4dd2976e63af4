use machine_learning::{
    arch::{Sequential, activations::ActFn, loss::Mse},
    training::EpochLoss,
};
use ndarray::Array2;

use super::{
    Architecture, GraphSet, conv::conv_widths, dense_stack, fit_with_validation, io_features,
};
use crate::{
    Result, ZooError,
    config::{ModelConfig, NormMode, OneOrMany},
    net::{CompiledModel, TrainingOptions},
};

/// Builds `first` (input -> latent) followed by `second` (latent -> labels) as one graph.
fn autoencoder(config: &ModelConfig, first: &'static str, second: &'static str) -> Result<GraphSet> {
    let (input, labels) = io_features(config)?;
    let latent = config.latent_dim.filter(|&n| n > 0).ok_or_else(|| {
        ZooError::InvalidConfig(format!("{} needs a latent dimension", config.identifier))
    })?;

    let mut stages = conv_widths(config);
    stages.extend(&config.num_hidden);

    let encoder: Vec<_> = [input]
        .into_iter()
        .chain(stages.iter().copied())
        .chain([latent])
        .collect();
    let decoder: Vec<_> = [latent]
        .into_iter()
        .chain(stages.iter().rev().copied())
        .chain([labels])
        .collect();

    let relu = ActFn::relu();
    let mut layers = dense_stack(&encoder, &relu, None);
    let split = layers.len();
    layers.extend(dense_stack(&decoder, &relu, None));
    let total = layers.len();

    Ok(GraphSet::new(Sequential::new(layers).with_l2(config.l2))
        .with_part(first, 0..split)
        .with_part(second, split..total))
}

/// Trains the whole graph to reproduce `target` from `input`.
fn reconstruct(
    model: &mut CompiledModel,
    config: &ModelConfig,
    options: &TrainingOptions,
    input: Array2<f32>,
    target: Array2<f32>,
) -> Result<Vec<EpochLoss>> {
    if target.ncols() != config.labels_shape.features() {
        return Err(ZooError::InvalidConfig(format!(
            "the reconstruction target has {} columns, expected {}",
            target.ncols(),
            config.labels_shape.features()
        )));
    }

    fit_with_validation(model, Mse, config, options, input, target)
}

/// A variational autoencoder of APOGEE spectra.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApogeeCvae;

impl Architecture for ApogeeCvae {
    fn name(&self) -> &str {
        "Convolutional Variational Autoencoder"
    }

    fn identifier(&self) -> &str {
        "ApogeeCVAE"
    }

    fn default_config(&self) -> ModelConfig {
        let mut config = ModelConfig::new(self.identifier());
        config.num_filters = Some(OneOrMany::Many(vec![2, 4]));
        config.filter_length = Some(OneOrMany::One(8));
        config.pool_length = Some(OneOrMany::One(4));
        config.num_hidden = vec![128, 64];
        config.latent_dim = Some(2);
        config.l2 = Some(1e-7);
        config.labels_norm_mode = NormMode::GLOBAL;
        config
    }

    fn model(&self, config: &ModelConfig) -> Result<GraphSet> {
        autoencoder(config, "encoder", "decoder")
    }

    fn loss(&self) -> Option<Mse> {
        None
    }

    fn train(
        &self,
        model: &mut CompiledModel,
        config: &ModelConfig,
        options: &TrainingOptions,
        input: Array2<f32>,
        target: Array2<f32>,
    ) -> Result<Vec<EpochLoss>> {
        reconstruct(model, config, options, input, target)
    }
}

fn gan_config(identifier: &str) -> ModelConfig {
    let mut config = ModelConfig::new(identifier);
    config.num_filters = Some(OneOrMany::Many(vec![8, 16]));
    config.filter_length = Some(OneOrMany::One(3));
    config.pool_length = Some(OneOrMany::Many(vec![2, 2]));
    config.num_hidden = vec![128];
    config.latent_dim = Some(16);
    config.input_norm_mode = NormMode::IMAGE;
    config.labels_norm_mode = NormMode::IMAGE;
    config
}

macro_rules! gan {
    ($(#[$doc:meta])* $ty:ident, $identifier:literal) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $ty;

        impl Architecture for $ty {
            fn name(&self) -> &str {
                "Convolutional Generative Adversarial Network"
            }

            fn identifier(&self) -> &str {
                $identifier
            }

            fn default_config(&self) -> ModelConfig {
                gan_config(self.identifier())
            }

            fn model(&self, config: &ModelConfig) -> Result<GraphSet> {
                autoencoder(config, "discriminator", "generator")
            }

            fn discriminator(&self, config: &ModelConfig) -> Result<Sequential> {
                self.model(config)?.extract("discriminator")
            }

            fn generator(&self, config: &ModelConfig) -> Result<Sequential> {
                self.model(config)?.extract("generator")
            }

            fn loss(&self) -> Option<Mse> {
                None
            }

            fn train(
                &self,
                model: &mut CompiledModel,
                config: &ModelConfig,
                options: &TrainingOptions,
                input: Array2<f32>,
                target: Array2<f32>,
            ) -> Result<Vec<EpochLoss>> {
                reconstruct(model, config, options, input, target)
            }
        }
    };
}

gan!(
    /// The galaxy image GAN.
    GalaxyGan2017,
    "GalaxyGAN2017"
);

gan!(
    /// The GAN trained on Galaxy10 images.
    Galaxy10Gan,
    "Galaxy10GAN"
);
