use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

use crate::features::{FeatureVector, FEATURE_COLUMNS, N_FEATURES};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("model feature list {found:?} does not match encoder columns {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("unexpected model shape: {0}")]
    ShapeMismatch(String),
    #[error("model produced a non-finite prediction ({0})")]
    NonFinite(f64),
    #[error("{0}")]
    Unsupported(String),
    #[cfg(feature = "torch")]
    #[error("torch: {0}")]
    Torch(#[from] tch::TchError),
}

/// A fitted regressor over the fixed feature schema.
pub trait Regressor: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Feature names the artifact was fit on.
    fn feature_names(&self) -> &[String];

    fn predict(&self, row: &FeatureVector) -> Result<f64, ModelError>;
}

/// Where the artifact lives on disk and how to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Linear { path: PathBuf },
    TorchScript { model_path: PathBuf, meta_path: PathBuf },
}

impl ModelSource {
    /// `.pt` / `.ts` is TorchScript (with a `meta.json` next to it unless
    /// given), everything else is a linear JSON export.
    pub fn from_paths(model_path: impl Into<PathBuf>, meta_path: Option<PathBuf>) -> Self {
        let model_path = model_path.into();
        let is_torch = matches!(
            model_path.extension().and_then(|e| e.to_str()),
            Some("pt") | Some("ts")
        );
        if is_torch {
            let meta_path = meta_path.unwrap_or_else(|| {
                model_path
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join("meta.json")
            });
            ModelSource::TorchScript {
                model_path,
                meta_path,
            }
        } else {
            ModelSource::Linear { path: model_path }
        }
    }
}

pub fn load(source: &ModelSource) -> Result<Arc<dyn Regressor>, ModelError> {
    match source {
        ModelSource::Linear { path } => Ok(Arc::new(LinearRegressor::load(path)?)),
        #[cfg(feature = "torch")]
        ModelSource::TorchScript {
            model_path,
            meta_path,
        } => Ok(Arc::new(torch::TorchRegressor::load(model_path, meta_path)?)),
        #[cfg(not(feature = "torch"))]
        ModelSource::TorchScript { model_path, .. } => Err(ModelError::Unsupported(format!(
            "{} is a TorchScript model; rebuild with `--features torch`",
            model_path.display()
        ))),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let txt = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&txt).map_err(|source| ModelError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// The artifact must list exactly our columns, in our order.
pub fn check_schema(names: &[String]) -> Result<(), ModelError> {
    if names.iter().map(String::as_str).eq(FEATURE_COLUMNS.iter().copied()) {
        Ok(())
    } else {
        Err(ModelError::SchemaMismatch {
            expected: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            found: names.to_vec(),
        })
    }
}

fn finite(value: f64) -> Result<f64, ModelError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::NonFinite(value))
    }
}

#[derive(Debug, Deserialize)]
struct LinearJson {
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

/// `intercept + Σ coefᵢ·xᵢ`, read from a JSON export of a fitted linear model.
#[derive(Debug, Clone)]
pub struct LinearRegressor {
    feature_names: Vec<String>,
    coefficients: [f64; N_FEATURES],
    intercept: f64,
}

impl LinearRegressor {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let json: LinearJson = read_json(path)?;
        check_schema(&json.feature_names)?;
        let coefficients: [f64; N_FEATURES] =
            json.coefficients.as_slice().try_into().map_err(|_| {
                ModelError::ShapeMismatch(format!(
                    "{} coefficients for {} features",
                    json.coefficients.len(),
                    N_FEATURES
                ))
            })?;
        Ok(Self {
            feature_names: json.feature_names,
            coefficients,
            intercept: json.intercept,
        })
    }
}

impl Regressor for LinearRegressor {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, row: &FeatureVector) -> Result<f64, ModelError> {
        let y = row
            .to_row()
            .iter()
            .zip(self.coefficients.iter())
            .fold(self.intercept, |acc, (x, c)| acc + x * c);
        finite(y)
    }
}

#[cfg(feature = "torch")]
mod torch {
    use super::*;
    use tch::{kind::Kind, CModule, Device, Tensor};

    #[derive(Deserialize)]
    struct MetaJson {
        feat_list: Vec<String>,
        in_dim: Option<usize>,
    }

    pub struct TorchRegressor {
        model: CModule,
        device: Device,
        feat_list: Vec<String>,
    }

    impl TorchRegressor {
        pub fn load(model_path: &Path, meta_path: &Path) -> Result<Self, ModelError> {
            let device = Device::Cpu;

            // meta.json carries the feature ordering the module was traced with
            let meta: MetaJson = read_json(meta_path)?;
            check_schema(&meta.feat_list)?;
            let in_dim = meta.in_dim.unwrap_or(meta.feat_list.len());
            if in_dim != N_FEATURES {
                return Err(ModelError::ShapeMismatch(format!(
                    "meta.in_dim is {}, encoder produces {}",
                    in_dim, N_FEATURES
                )));
            }

            let model = CModule::load_on_device(model_path, device)?;
            let mdl = Self {
                model,
                device,
                feat_list: meta.feat_list,
            };

            // Probe output shape with a dummy forward; expect a single value
            let dummy = Tensor::zeros([1, N_FEATURES as i64], (Kind::Float, device));
            mdl.forward_scalar(dummy)?;
            Ok(mdl)
        }

        fn forward_scalar(&self, input: Tensor) -> Result<f64, ModelError> {
            let t = self.model.forward_ts(&[input])?;
            if t.numel() != 1 {
                return Err(ModelError::ShapeMismatch(format!(
                    "output size {:?}, expected one value",
                    t.size()
                )));
            }
            Ok(t.flatten(0, -1).to_kind(Kind::Double).double_value(&[0]))
        }
    }

    impl Regressor for TorchRegressor {
        fn kind(&self) -> &'static str {
            "torchscript"
        }

        fn feature_names(&self) -> &[String] {
            &self.feat_list
        }

        fn predict(&self, row: &FeatureVector) -> Result<f64, ModelError> {
            let x: Vec<f32> = row.to_row().iter().map(|&v| v as f32).collect();
            let input = Tensor::from_slice(&x)
                .reshape([1, N_FEATURES as i64])
                .to_device(self.device);
            finite(self.forward_scalar(input)?)
        }
    }
}
