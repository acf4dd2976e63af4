use super::{Architecture, GraphSet, conv::conv_graph};
use crate::{
    Result,
    config::{ModelConfig, NormMode, OneOrMany},
};

fn apogee_targets() -> Vec<String> {
    ["teff", "logg", "M", "alpha", "C", "N", "O", "Na", "Mg", "Al", "Si", "Fe"]
        .map(String::from)
        .to_vec()
}

/// A convolutional regressor of stellar parameters from APOGEE spectra.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApogeeCnn;

impl Architecture for ApogeeCnn {
    fn name(&self) -> &str {
        "Convolutional Neural Network"
    }

    fn identifier(&self) -> &str {
        "ApogeeCNN"
    }

    fn default_config(&self) -> ModelConfig {
        let mut config = ModelConfig::new(self.identifier());
        config.num_filters = Some(OneOrMany::Many(vec![2, 4]));
        config.filter_length = Some(OneOrMany::One(8));
        config.pool_length = Some(OneOrMany::One(4));
        config.num_hidden = vec![196, 96];
        config.l2 = Some(1e-7);
        config.targetname = apogee_targets();
        config
    }

    fn model(&self, config: &ModelConfig) -> Result<GraphSet> {
        conv_graph(config)
    }
}

/// `ApogeeCnn` carrying the dropout and precision settings of its Bayesian variant.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApogeeBcnn;

impl Architecture for ApogeeBcnn {
    fn name(&self) -> &str {
        "Bayesian Convolutional Neural Network"
    }

    fn identifier(&self) -> &str {
        "ApogeeBCNN"
    }

    fn default_config(&self) -> ModelConfig {
        let mut config = ApogeeCnn.default_config();
        config.identifier = self.identifier().to_string();
        config.l2 = Some(5e-9);
        config.dropout_rate = Some(0.3);
        config.length_scale = Some(3.);
        config
    }

    fn model(&self, config: &ModelConfig) -> Result<GraphSet> {
        conv_graph(config)
    }
}

/// The StarNet network of Fabbro et al. (2017).
#[derive(Debug, Default, Clone, Copy)]
pub struct StarNet2017;

impl Architecture for StarNet2017 {
    fn name(&self) -> &str {
        "StarNet (arXiv:1709.09182)"
    }

    fn identifier(&self) -> &str {
        "StarNet2017"
    }

    fn default_config(&self) -> ModelConfig {
        let mut config = ModelConfig::new(self.identifier());
        config.num_filters = Some(OneOrMany::Many(vec![4, 16]));
        config.filter_length = Some(OneOrMany::One(8));
        config.pool_length = Some(OneOrMany::One(4));
        config.num_hidden = vec![256, 128];
        config.input_norm_mode = NormMode::CENTER;
        config.targetname = ["teff", "logg", "Fe"].map(String::from).to_vec();
        config
    }

    fn model(&self, config: &ModelConfig) -> Result<GraphSet> {
        conv_graph(config)
    }
}
