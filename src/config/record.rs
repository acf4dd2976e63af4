use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{Result, ZooError};

/// The keys a parameter record must carry to be loadable.
pub const REQUIRED_KEYS: [&str; 13] = [
    "id",
    "hidden",
    "input",
    "labels",
    "input_mean",
    "labels_mean",
    "input_std",
    "labels_std",
    "input_norm_mode",
    "labels_norm_mode",
    "batch_size",
    "targetname",
    "valsize",
];

/// A value stored either as a scalar or as a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Self::One(v) => vec![v.clone()],
            Self::Many(vs) => vs.clone(),
        }
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    /// Collapses single element vectors into a scalar.
    fn from(mut values: Vec<T>) -> Self {
        match values.len() {
            1 => Self::One(values.remove(0)),
            _ => Self::Many(values),
        }
    }
}

/// The shape of one sample.
pub type Shape = OneOrMany<usize>;

impl Shape {
    /// The amount of scalars in one sample, zero for an unset shape.
    pub fn features(&self) -> usize {
        match self {
            Self::One(n) => *n,
            Self::Many(dims) if dims.is_empty() => 0,
            Self::Many(dims) => dims.iter().product(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    #[default]
    Regression,
    Classification,
    BinaryClassification,
}

/// How the normalizer centers and scales data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormMode(pub u8);

impl NormMode {
    pub const NONE: Self = Self(0);
    pub const GLOBAL: Self = Self(1);
    pub const PER_FEATURE: Self = Self(2);
    pub const CENTER: Self = Self(3);
    pub const IMAGE: Self = Self(255);
}

/// What to do with a record whose fields contradict each other.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyPolicy {
    #[default]
    Strict,
    Warn,
}

/// The parameter record of one model instance, stored as `astroNN_model_parameter.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(rename = "id")]
    pub identifier: String,
    #[serde(rename = "filterlen", default, skip_serializing_if = "Option::is_none")]
    pub filter_length: Option<OneOrMany<usize>>,
    #[serde(rename = "filternum", default, skip_serializing_if = "Option::is_none")]
    pub num_filters: Option<OneOrMany<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_length: Option<OneOrMany<usize>>,
    #[serde(rename = "hidden")]
    pub num_hidden: Vec<usize>,
    #[serde(rename = "input")]
    pub input_shape: Shape,
    #[serde(rename = "labels")]
    pub labels_shape: Shape,
    #[serde(default)]
    pub task: Task,
    #[serde(
        rename = "latent",
        default,
        deserialize_with = "integral",
        skip_serializing_if = "Option::is_none"
    )]
    pub latent_dim: Option<usize>,
    pub input_mean: OneOrMany<f32>,
    pub labels_mean: OneOrMany<f32>,
    pub input_std: OneOrMany<f32>,
    pub labels_std: OneOrMany<f32>,
    pub input_norm_mode: NormMode,
    pub labels_norm_mode: NormMode,
    pub batch_size: usize,
    #[serde(rename = "valsize")]
    pub val_size: f32,
    pub targetname: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropout_rate: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inv_tau: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_scale: Option<f32>,
}

/// Accepts integers written as floats, e.g. `2.0`.
fn integral<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(n) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if n < 0. || n.fract() != 0. {
        return Err(serde::de::Error::custom(format!(
            "expected a non negative integer, got {n}"
        )));
    }

    Ok(Some(n as usize))
}

impl ModelConfig {
    /// Creates a record with unset shapes and the usual training defaults.
    ///
    /// # Arguments
    /// * `identifier` - The registry identifier of the architecture.
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            filter_length: None,
            num_filters: None,
            pool_length: None,
            num_hidden: Vec::new(),
            input_shape: Shape::Many(Vec::new()),
            labels_shape: Shape::Many(Vec::new()),
            task: Task::default(),
            latent_dim: None,
            input_mean: OneOrMany::One(0.),
            labels_mean: OneOrMany::One(0.),
            input_std: OneOrMany::One(1.),
            labels_std: OneOrMany::One(1.),
            input_norm_mode: NormMode::GLOBAL,
            labels_norm_mode: NormMode::PER_FEATURE,
            batch_size: 64,
            val_size: 0.1,
            targetname: Vec::new(),
            dropout_rate: None,
            l2: None,
            inv_tau: None,
            length_scale: None,
        }
    }

    /// Parses a parameter record.
    ///
    /// # Arguments
    /// * `json` - The contents of the record.
    /// * `policy` - What to do when the record contradicts itself.
    ///
    /// # Returns
    /// The parsed record, or `MissingRequiredField` naming the first absent key.
    pub fn from_json(json: &str, policy: ConsistencyPolicy) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;

        if let Value::Object(map) = &value {
            if let Some(key) = REQUIRED_KEYS.into_iter().find(|key| !map.contains_key(*key)) {
                return Err(ZooError::MissingRequiredField(key));
            }
        }

        let config: Self = serde_json::from_value(value)?;
        config.check_consistency(policy)?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the fields that only make sense together.
    pub fn check_consistency(&self, policy: ConsistencyPolicy) -> Result<()> {
        if self.inv_tau.is_some() && self.length_scale.is_none() {
            let (field, requires) = ("inv_tau", "length_scale");

            match policy {
                ConsistencyPolicy::Strict => {
                    return Err(ZooError::InconsistentConfig { field, requires });
                }
                ConsistencyPolicy::Warn => {
                    log::warn!("{field} is set without {requires}, ignoring the inconsistency")
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record() -> Value {
        json!({
            "id": "ApogeeCNN",
            "filterlen": 8,
            "filternum": [2, 4],
            "hidden": [196, 96],
            "input": [7514, 1],
            "labels": 3,
            "task": "regression",
            "input_mean": 1.0,
            "labels_mean": [4500.0, 2.5, 0.0],
            "input_std": 0.5,
            "labels_std": [300.0, 0.5, 0.2],
            "input_norm_mode": 1,
            "labels_norm_mode": 2,
            "batch_size": 64,
            "targetname": ["teff", "logg", "Fe"],
            "valsize": 0.1,
            "some_future_key": "ignored"
        })
    }

    #[test]
    fn optional_fields_default_to_none() {
        let config = ModelConfig::from_json(&record().to_string(), ConsistencyPolicy::Strict)
            .unwrap();

        assert_eq!(config.identifier, "ApogeeCNN");
        assert_eq!(config.input_shape.features(), 7514);
        assert_eq!(config.labels_shape, Shape::One(3));
        assert_eq!(config.dropout_rate, None);
        assert_eq!(config.l2, None);
        assert_eq!(config.latent_dim, None);
        assert_eq!(config.pool_length, None);
    }

    #[test]
    fn missing_required_field_is_named() {
        let mut value = record();
        value.as_object_mut().unwrap().remove("valsize");

        let result = ModelConfig::from_json(&value.to_string(), ConsistencyPolicy::Strict);
        assert!(matches!(result, Err(ZooError::MissingRequiredField("valsize"))));
    }

    #[test]
    fn missing_task_means_regression() {
        let mut value = record();
        value.as_object_mut().unwrap().remove("task");

        let config =
            ModelConfig::from_json(&value.to_string(), ConsistencyPolicy::Strict).unwrap();
        assert_eq!(config.task, Task::Regression);
    }

    #[test]
    fn latent_accepts_integral_floats_only() {
        let mut value = record();
        value["latent"] = json!(2.0);
        let config =
            ModelConfig::from_json(&value.to_string(), ConsistencyPolicy::Strict).unwrap();
        assert_eq!(config.latent_dim, Some(2));

        value["latent"] = json!(2.5);
        let result = ModelConfig::from_json(&value.to_string(), ConsistencyPolicy::Strict);
        assert!(matches!(result, Err(ZooError::InvalidRecord(_))));
    }

    #[test]
    fn inv_tau_requires_length_scale() {
        let mut value = record();
        value["inv_tau"] = json!(1.0);

        let strict = ModelConfig::from_json(&value.to_string(), ConsistencyPolicy::Strict);
        assert!(matches!(
            strict,
            Err(ZooError::InconsistentConfig {
                field: "inv_tau",
                requires: "length_scale"
            })
        ));

        let lenient = ModelConfig::from_json(&value.to_string(), ConsistencyPolicy::Warn);
        assert_eq!(lenient.unwrap().inv_tau, Some(1.0));
    }

    #[test]
    fn serialization_skips_unset_optionals() {
        let config = ModelConfig::new("ApogeeCNN");
        let value: Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        let map = value.as_object().unwrap();

        for key in REQUIRED_KEYS {
            assert!(map.contains_key(key), "{key} is missing");
        }
        assert!(!map.contains_key("latent"));
        assert!(!map.contains_key("l2"));
    }
}
