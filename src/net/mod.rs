mod compiled;
mod options;

use std::{
    env, fmt,
    path::{Path, PathBuf},
};

use machine_learning::{
    initialization, optimization::OptimizerSpec, training::EpochLoss,
};
use ndarray::{Array2, ArrayView2};

pub use compiled::{CompiledModel, TensorSlot};
pub use options::{PersistPolicy, TrainingOptions};

use crate::{
    Result, ZooError,
    config::{ModelConfig, Shape},
    models::Architecture,
    normalizer::{NormStats, Normalizer},
    persistence,
};

/// A model instance: an architecture, the record describing it and, once compiled, its
/// graphs, parameters and optimizer.
pub struct NeuralNet {
    architecture: Box<dyn Architecture>,
    config: ModelConfig,
    options: TrainingOptions,
    persist: PersistPolicy,
    folder: Option<PathBuf>,
    compiled: Option<CompiledModel>,
}

impl fmt::Debug for NeuralNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeuralNet")
            .field("name", &self.architecture.name())
            .field("config", &self.config)
            .field("folder", &self.folder)
            .field("compiled", &self.compiled)
            .finish_non_exhaustive()
    }
}

impl NeuralNet {
    /// Creates an uncompiled instance carrying the architecture's default record.
    pub fn new(architecture: Box<dyn Architecture>) -> Self {
        let config = architecture.default_config();
        Self::with_config(architecture, config)
    }

    /// Creates an uncompiled instance from an existing record. The record takes the
    /// architecture's identifier.
    pub fn with_config(architecture: Box<dyn Architecture>, mut config: ModelConfig) -> Self {
        if config.identifier != architecture.identifier() {
            log::warn!(
                "record names {} but the architecture is {}, keeping the architecture's",
                config.identifier,
                architecture.identifier()
            );
            config.identifier = architecture.identifier().to_string();
        }

        Self {
            architecture,
            config,
            options: TrainingOptions::default(),
            persist: PersistPolicy::default(),
            folder: None,
            compiled: None,
        }
    }

    pub fn with_options(mut self, options: TrainingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_persist_policy(mut self, persist: PersistPolicy) -> Self {
        self.persist = persist;
        self
    }

    /// Sets the folder written by `post_training_checklist`.
    pub fn with_folder<P: Into<PathBuf>>(mut self, folder: P) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn name(&self) -> &str {
        self.architecture.name()
    }

    pub fn identifier(&self) -> &str {
        self.architecture.identifier()
    }

    pub fn architecture(&self) -> &dyn Architecture {
        self.architecture.as_ref()
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn options(&self) -> &TrainingOptions {
        &self.options
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn compiled(&self) -> Option<&CompiledModel> {
        self.compiled.as_ref()
    }

    pub fn compiled_mut(&mut self) -> Option<&mut CompiledModel> {
        self.compiled.as_mut()
    }

    /// Takes the input and labels shapes from one sample of each.
    pub fn fit_shapes(&mut self, input: ArrayView2<f32>, target: ArrayView2<f32>) {
        self.config.input_shape = Shape::One(input.ncols());
        self.config.labels_shape = Shape::One(target.ncols());
    }

    /// Builds the graphs, initializes their weights and binds the optimizer and loss.
    /// Compiling again discards the previous graphs.
    ///
    /// # Arguments
    /// * `optimizer` - The optimizer to bind, Adam from the training options when `None`.
    pub fn compile(&mut self, optimizer: Option<OptimizerSpec>) -> Result<()> {
        let graphs = self.architecture.model(&self.config)?;
        let params =
            initialization::xavier_uniform(&mut self.options.rng(), graphs.trainable.layers())?;
        let optimizer = optimizer.unwrap_or_else(|| self.options.optimizer());

        log::debug!(
            "compiled {} with {} parameters and {:?}",
            self.identifier(),
            params.len(),
            optimizer
        );

        self.compiled = Some(CompiledModel::new(
            graphs,
            params,
            optimizer.build(),
            self.architecture.loss(),
        )?);

        Ok(())
    }

    /// Checks the data against the record and computes its normalization statistics.
    ///
    /// # Returns
    /// The normalized input and target.
    pub fn pre_training_checklist(
        &mut self,
        input: ArrayView2<f32>,
        target: ArrayView2<f32>,
    ) -> Result<(Array2<f32>, Array2<f32>)> {
        let num_samples = input.nrows();

        if num_samples != target.nrows() {
            return Err(ZooError::InvalidConfig(format!(
                "got {num_samples} inputs but {} targets",
                target.nrows()
            )));
        }

        let held_out = (num_samples as f32 * self.config.val_size.clamp(0., 1.)).floor() as usize;
        let num_train = num_samples - held_out;
        if self.config.batch_size > num_train {
            return Err(ZooError::InvalidConfig(format!(
                "batch_size {} exceeds the {num_train} training samples",
                self.config.batch_size
            )));
        }

        for (what, shape, got) in [
            ("input", &self.config.input_shape, input.ncols()),
            ("labels", &self.config.labels_shape, target.ncols()),
        ] {
            if shape.features() != got {
                return Err(ZooError::InvalidConfig(format!(
                    "the {what} shape holds {} features but the data has {got}",
                    shape.features()
                )));
            }
        }

        let input_normalizer = Normalizer::new(self.config.input_norm_mode);
        let labels_normalizer = Normalizer::new(self.config.labels_norm_mode);
        let input_stats = input_normalizer.fit(input)?;
        let labels_stats = labels_normalizer.fit(target)?;

        let input = input_normalizer.normalize(input, &input_stats)?;
        let target = labels_normalizer.normalize(target, &labels_stats)?;

        self.config.input_mean = input_stats.mean;
        self.config.input_std = input_stats.std;
        self.config.labels_mean = labels_stats.mean;
        self.config.labels_std = labels_stats.std;

        Ok((input, target))
    }

    /// Trains the compiled model on raw data and persists it following the persist policy.
    ///
    /// # Returns
    /// The losses of every epoch, `UnboundGraph` when `compile` was never called.
    pub fn train(
        &mut self,
        input: ArrayView2<f32>,
        target: ArrayView2<f32>,
    ) -> Result<Vec<EpochLoss>> {
        if self.compiled.is_none() {
            return Err(ZooError::UnboundGraph);
        }

        let (input, target) = self.pre_training_checklist(input, target)?;

        let Self {
            architecture,
            config,
            options,
            compiled,
            ..
        } = self;
        let compiled = compiled.as_mut().ok_or(ZooError::UnboundGraph)?;
        let result = architecture.train(compiled, config, options, input, target);

        if let Err(e) = &result {
            log::error!("training {} failed: {e}", self.identifier());
        }

        if self.persist.should_persist(result.is_ok()) {
            match (&result, self.post_training_checklist()) {
                (Err(_), Err(e)) => log::error!("saving {} failed: {e}", self.identifier()),
                (Ok(_), Err(e)) => return Err(e),
                (_, Ok(_)) => {}
            }
        }

        result
    }

    /// Writes the record and the weights into the model folder, creating a fresh
    /// `astroNN_<n>` folder in the current directory when none was set.
    pub fn post_training_checklist(&mut self) -> Result<PathBuf> {
        let folder = match &self.folder {
            Some(folder) => folder.clone(),
            None => persistence::next_run_folder(&env::current_dir()?),
        };

        let folder = self.save(&folder)?;
        self.folder = Some(folder.clone());
        Ok(folder)
    }

    /// Saves the instance into `folder`.
    pub fn save<P: AsRef<Path>>(&self, folder: P) -> Result<PathBuf> {
        persistence::save(self, folder.as_ref())
    }

    /// Predicts on raw input, undoing the labels normalization on the way out.
    pub fn predict(&mut self, input: ArrayView2<f32>) -> Result<Array2<f32>> {
        let compiled = self.compiled.as_mut().ok_or(ZooError::UnboundGraph)?;

        let input_stats = NormStats {
            mean: self.config.input_mean.clone(),
            std: self.config.input_std.clone(),
        };
        let labels_stats = NormStats {
            mean: self.config.labels_mean.clone(),
            std: self.config.labels_std.clone(),
        };

        let input = Normalizer::new(self.config.input_norm_mode).normalize(input, &input_stats)?;
        let output = compiled.predict(input.view())?;

        Normalizer::new(self.config.labels_norm_mode).denormalize(output.view(), &labels_stats)
    }

    /// Takes one optimizer step on an already normalized batch.
    pub fn train_on_batch(&mut self, x: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<f32> {
        self.compiled
            .as_mut()
            .ok_or(ZooError::UnboundGraph)?
            .train_on_batch(x, y)
    }

    pub(crate) fn set_folder(&mut self, folder: PathBuf) {
        self.folder = Some(folder);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ndarray::Array2;

    use super::*;
    use crate::{
        config::OneOrMany,
        models::{ApogeeCnn, GraphSet, StarNet2017},
    };

    /// Builds like `ApogeeCnn` but never finishes training.
    #[derive(Debug)]
    struct Diverging;

    impl Architecture for Diverging {
        fn name(&self) -> &str {
            "Diverging"
        }

        fn identifier(&self) -> &str {
            "Diverging"
        }

        fn model(&self, config: &ModelConfig) -> Result<GraphSet> {
            ApogeeCnn.model(config)
        }

        fn train(
            &self,
            _model: &mut CompiledModel,
            _config: &ModelConfig,
            _options: &TrainingOptions,
            _input: Array2<f32>,
            _target: Array2<f32>,
        ) -> Result<Vec<EpochLoss>> {
            Err(ZooError::InvalidConfig("loss diverged".into()))
        }
    }

    fn data() -> (Array2<f32>, Array2<f32>) {
        let x = Array2::from_shape_fn((20, 4), |(i, j)| (i * 4 + j) as f32 / 80.);
        let y = Array2::from_shape_fn((20, 2), |(i, j)| (i + j) as f32);
        (x, y)
    }

    fn net() -> NeuralNet {
        let mut config = ApogeeCnn.default_config();
        config.num_filters = Some(OneOrMany::Many(vec![2]));
        config.num_hidden = vec![4];
        config.batch_size = 4;

        NeuralNet::with_config(Box::new(ApogeeCnn), config)
            .with_options(TrainingOptions {
                max_epochs: 2,
                seed: Some(7),
                ..Default::default()
            })
            .with_persist_policy(PersistPolicy::Never)
    }

    #[test]
    fn training_an_uncompiled_model_fails() {
        let (x, y) = data();
        let mut net = net();
        net.fit_shapes(x.view(), y.view());

        assert!(matches!(
            net.train(x.view(), y.view()),
            Err(ZooError::UnboundGraph)
        ));
    }

    #[test]
    fn training_records_normalization_statistics() {
        let (x, y) = data();
        let mut net = net();
        net.fit_shapes(x.view(), y.view());
        net.compile(None).unwrap();

        let losses = net.train(x.view(), y.view()).unwrap();

        assert_eq!(losses.len(), 2);
        assert!(losses[0].val_loss.is_some());
        assert!(matches!(&net.config().labels_mean, OneOrMany::Many(m) if m.len() == 2));
        assert_eq!(net.predict(x.view()).unwrap().dim(), (20, 2));
    }

    #[test]
    fn oversized_batches_are_rejected() {
        let (x, y) = data();
        let mut net = net();
        net.config.batch_size = 100;
        net.fit_shapes(x.view(), y.view());
        net.compile(None).unwrap();

        assert!(matches!(
            net.train(x.view(), y.view()),
            Err(ZooError::InvalidConfig(_))
        ));
    }

    #[test]
    fn compile_binds_the_default_adam() {
        let (x, y) = data();
        let mut net = net();
        net.fit_shapes(x.view(), y.view());
        net.compile(None).unwrap();

        let spec = net.compiled().unwrap().optimizer().spec();
        assert_eq!(spec, net.options().optimizer());
    }

    #[test]
    fn saving_requires_a_graph() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(net().save(dir.path()), Err(ZooError::UnboundGraph)));
    }

    #[test]
    fn records_take_the_architecture_identifier() {
        let net = NeuralNet::with_config(Box::new(StarNet2017), ApogeeCnn.default_config());

        assert_eq!(net.config().identifier, "StarNet2017");
        assert_eq!(net.identifier(), net.config().identifier);
    }

    #[test]
    fn failed_saves_keep_the_training_error() {
        let (x, y) = data();
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        fs::write(&blocker, "not a folder").unwrap();

        let mut config = ApogeeCnn.default_config();
        config.num_hidden = vec![4];
        config.batch_size = 4;
        let mut net = NeuralNet::with_config(Box::new(Diverging), config)
            .with_persist_policy(PersistPolicy::Always)
            .with_folder(&blocker);
        net.fit_shapes(x.view(), y.view());
        net.compile(None).unwrap();

        let result = net.train(x.view(), y.view());
        assert!(matches!(result, Err(ZooError::InvalidConfig(m)) if m == "loss diverged"));
    }
}
