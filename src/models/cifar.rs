use super::{Architecture, GraphSet, conv::conv_graph};
use crate::{
    Result,
    config::{ModelConfig, NormMode, OneOrMany, Task},
};

/// The Galaxy10 classes, indexed by label.
pub const GALAXY10_CLASSES: [&str; 10] = [
    "Disk, Face-on, No Spiral",
    "Smooth, Completely round",
    "Smooth, in-between round",
    "Smooth, Cigar shaped",
    "Disk, Edge-on, Rounded Bulge",
    "Disk, Edge-on, Boxy Bulge",
    "Disk, Edge-on, No Bulge",
    "Disk, Face-on, Tight Spiral",
    "Disk, Face-on, Medium Spiral",
    "Disk, Face-on, Loose Spiral",
];

const CIFAR10_CLASSES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

fn image_classifier(identifier: &str, classes: &[&str]) -> ModelConfig {
    let mut config = ModelConfig::new(identifier);
    config.num_filters = Some(OneOrMany::Many(vec![8, 16]));
    config.filter_length = Some(OneOrMany::One(3));
    config.pool_length = Some(OneOrMany::Many(vec![4, 4]));
    config.num_hidden = vec![256, 128];
    config.task = Task::Classification;
    config.input_norm_mode = NormMode::IMAGE;
    config.labels_norm_mode = NormMode::NONE;
    config.targetname = classes.iter().map(|c| c.to_string()).collect();
    config
}

/// An image classifier for CIFAR-10.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cifar10Cnn;

impl Architecture for Cifar10Cnn {
    fn name(&self) -> &str {
        "2D Convolutional Neural Network"
    }

    fn identifier(&self) -> &str {
        "Cifar10CNN"
    }

    fn default_config(&self) -> ModelConfig {
        image_classifier(self.identifier(), &CIFAR10_CLASSES)
    }

    fn model(&self, config: &ModelConfig) -> Result<GraphSet> {
        conv_graph(config)
    }
}

/// `Cifar10Cnn` trained on the Galaxy10 morphology classes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Galaxy10Cnn;

impl Architecture for Galaxy10Cnn {
    fn name(&self) -> &str {
        "2D Convolutional Neural Network"
    }

    fn identifier(&self) -> &str {
        "Galaxy10CNN"
    }

    fn default_config(&self) -> ModelConfig {
        image_classifier(self.identifier(), &GALAXY10_CLASSES)
    }

    fn model(&self, config: &ModelConfig) -> Result<GraphSet> {
        conv_graph(config)
    }
}

/// A Bayesian image classifier for MNIST digits.
#[derive(Debug, Default, Clone, Copy)]
pub struct MnistBcnn;

impl Architecture for MnistBcnn {
    fn name(&self) -> &str {
        "Bayesian 2D Convolutional Neural Network"
    }

    fn identifier(&self) -> &str {
        "MNIST_BCNN"
    }

    fn default_config(&self) -> ModelConfig {
        let digits: Vec<String> = (0..10).map(|d| d.to_string()).collect();
        let digits: Vec<&str> = digits.iter().map(String::as_str).collect();

        let mut config = image_classifier(self.identifier(), &digits);
        config.num_hidden = vec![100];
        config.dropout_rate = Some(0.2);
        config.l2 = Some(1e-5);
        config.length_scale = Some(0.1);
        config
    }

    fn model(&self, config: &ModelConfig) -> Result<GraphSet> {
        conv_graph(config)
    }
}
