use std::{collections::HashMap, fs, io::Write, path::Path};

use machine_learning::optimization::{OptimizerSpec, OptimizerState};
use safetensors::{Dtype, SafeTensors, serialize, tensor::TensorView};
use serde::{Deserialize, Serialize};

use crate::{Result, ZooError, net::CompiledModel};

const TRAINING_CONFIG_KEY: &str = "training_config";
const LAYER_NAMES_KEY: &str = "layer_names";
const OPTIMIZER_NAMES_KEY: &str = "optimizer_weight_names";
const OPTIMIZER_PREFIX: &str = "optimizer_weights/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TrainingConfig {
    optimizer_config: OptimizerSpec,
}

/// A named `f32` tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

/// The contents of `model_weights.safetensors`: every layer tensor, the optimizer's
/// configuration and its exported state.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightsContainer {
    pub layers: Vec<NamedTensor>,
    pub optimizer: OptimizerSpec,
    pub optimizer_state: OptimizerState,
}

impl WeightsContainer {
    /// Captures the parameters and optimizer of a compiled model.
    pub fn from_compiled(model: &CompiledModel) -> Self {
        let params = model.params();
        let layers = model
            .tensor_slots()
            .into_iter()
            .map(|slot| NamedTensor {
                values: params[slot.range].to_vec(),
                name: slot.name,
                shape: slot.shape,
            })
            .collect();

        Self {
            layers,
            optimizer: model.optimizer().spec(),
            optimizer_state: model.optimizer_state(),
        }
    }

    /// Copies the stored layer tensors into `model`, matching them by name.
    pub fn restore_layers(&self, model: &mut CompiledModel) -> Result<()> {
        let mut params = model.params().to_vec();

        for slot in model.tensor_slots() {
            let tensor = self
                .layers
                .iter()
                .find(|tensor| tensor.name == slot.name)
                .ok_or_else(|| {
                    ZooError::InvalidWeights(format!("no tensor named '{}'", slot.name))
                })?;

            if tensor.shape != slot.shape {
                return Err(ZooError::InvalidWeights(format!(
                    "tensor '{}' has shape {:?}, the graph expects {:?}",
                    slot.name, tensor.shape, slot.shape
                )));
            }

            params[slot.range].copy_from_slice(&tensor.values);
        }

        model.set_params(&params)
    }

    /// Serializes the container in the safetensors format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let optimizer_names: Vec<&str> = self
            .optimizer_state
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        let layer_names: Vec<&str> = self.layers.iter().map(|t| t.name.as_str()).collect();

        let training_config = TrainingConfig {
            optimizer_config: self.optimizer,
        };
        let metadata = HashMap::from([
            (
                TRAINING_CONFIG_KEY.to_string(),
                serde_json::to_string(&training_config)?,
            ),
            (
                LAYER_NAMES_KEY.to_string(),
                serde_json::to_string(&layer_names)?,
            ),
            (
                OPTIMIZER_NAMES_KEY.to_string(),
                serde_json::to_string(&optimizer_names)?,
            ),
        ]);

        let layers = self
            .layers
            .iter()
            .map(|t| (t.name.clone(), t.shape.clone(), t.values.as_slice()));
        let optimizer = self.optimizer_state.iter().map(|(name, values)| {
            (
                format!("{OPTIMIZER_PREFIX}{name}"),
                vec![values.len()],
                values.as_slice(),
            )
        });

        let views = layers
            .chain(optimizer)
            .map(|(name, shape, values)| {
                let view = TensorView::new(Dtype::F32, shape, bytemuck::cast_slice(values))?;
                Ok((name, view))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(serialize(
            views.iter().map(|(name, view)| (name.as_str(), view)),
            &Some(metadata),
        )?)
    }

    /// Parses a safetensors buffer written by `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (_, header) = SafeTensors::read_metadata(bytes)?;
        let metadata = header
            .metadata()
            .as_ref()
            .ok_or_else(|| ZooError::InvalidWeights("the container has no metadata".into()))?;
        let entry = |key: &str| {
            metadata
                .get(key)
                .ok_or_else(|| ZooError::InvalidWeights(format!("missing metadata '{key}'")))
        };

        let training_config: TrainingConfig = serde_json::from_str(entry(TRAINING_CONFIG_KEY)?)?;
        let layer_names: Vec<String> = serde_json::from_str(entry(LAYER_NAMES_KEY)?)?;
        let optimizer_names: Vec<String> = serde_json::from_str(entry(OPTIMIZER_NAMES_KEY)?)?;

        let tensors = SafeTensors::deserialize(bytes)?;

        let layers = layer_names
            .into_iter()
            .map(|name| {
                let (shape, values) = read_f32(&tensors, &name)?;
                Ok(NamedTensor {
                    name,
                    shape,
                    values,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let optimizer_state = optimizer_names
            .into_iter()
            .map(|name| {
                let (_, values) = read_f32(&tensors, &format!("{OPTIMIZER_PREFIX}{name}"))?;
                Ok((name, values))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            layers,
            optimizer: training_config.optimizer_config,
            optimizer_state,
        })
    }

    /// Writes the container to `path` and flushes it to disk.
    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let mut file = fs::File::create(path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

fn read_f32(tensors: &SafeTensors<'_>, name: &str) -> Result<(Vec<usize>, Vec<f32>)> {
    let view = tensors.tensor(name)?;

    if view.dtype() != Dtype::F32 {
        return Err(ZooError::InvalidWeights(format!(
            "tensor '{name}' is {:?}, expected F32",
            view.dtype()
        )));
    }

    let shape = view.shape().to_vec();
    let len: usize = shape.iter().product();
    if view.data().len() != len * std::mem::size_of::<f32>() {
        return Err(ZooError::InvalidWeights(format!(
            "tensor '{name}' holds {} bytes for shape {shape:?}",
            view.data().len()
        )));
    }

    // the buffer is not guaranteed to be aligned for f32
    Ok((shape, bytemuck::allocation::pod_collect_to_vec(view.data())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> WeightsContainer {
        WeightsContainer {
            layers: vec![
                NamedTensor {
                    name: "dense_0/kernel".into(),
                    shape: vec![2, 1],
                    values: vec![0.5, -1.25],
                },
                NamedTensor {
                    name: "dense_0/bias".into(),
                    shape: vec![1],
                    values: vec![0.125],
                },
            ],
            optimizer: OptimizerSpec::GradientDescentWithMomentum {
                learning_rate: 0.01,
                momentum: 0.9,
            },
            optimizer_state: vec![("velocity".into(), vec![0.1, 0.2, 0.3])],
        }
    }

    #[test]
    fn container_survives_serialization() {
        let container = container();
        let bytes = container.to_bytes().unwrap();
        assert_eq!(WeightsContainer::from_bytes(&bytes).unwrap(), container);
    }

    #[test]
    fn metadata_names_the_optimizer() {
        let bytes = container().to_bytes().unwrap();
        let (_, header) = SafeTensors::read_metadata(&bytes).unwrap();
        let metadata = header.metadata().as_ref().unwrap();

        let training_config: serde_json::Value =
            serde_json::from_str(&metadata[TRAINING_CONFIG_KEY]).unwrap();
        assert_eq!(
            training_config["optimizer_config"]["class_name"],
            "GradientDescentWithMomentum"
        );
        assert_eq!(metadata[OPTIMIZER_NAMES_KEY], r#"["velocity"]"#);
    }

    #[test]
    fn garbage_is_rejected() {
        let result = WeightsContainer::from_bytes(b"not a container");
        assert!(matches!(result, Err(ZooError::InvalidWeights(_))));
    }
}
