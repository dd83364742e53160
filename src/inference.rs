//! Model lifecycle and forward inference.
//!
//! The trained artifact is located on disk (first match among the
//! configured candidate paths), loaded at most once per process, and
//! cached for the remainder of the process lifetime. Loading is
//! idempotent and side-effect-free, so the cache needs no coordination
//! beyond the initialize-once cell.

use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn_ndarray::{NdArray, NdArrayDevice};
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::{DigitError, Result};
use crate::model::{Classifier, ClassifierConfig, INPUT_DIM};
use crate::preprocess::DigitImage;

/// CPU backend used for serving
pub type InferenceBackend = NdArray<f32>;

/// Result of a single forward inference
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Argmax class index, 0-9
    pub digit: usize,
    /// Full probability vector over the 10 classes, sums to ~1
    pub probs: Vec<f32>,
}

/// Lazily-initialized model handle owned by the composition root.
pub struct Predictor {
    candidate_paths: Vec<PathBuf>,
    device: NdArrayDevice,
    model: OnceCell<Classifier<InferenceBackend>>,
}

impl Predictor {
    pub fn new(candidate_paths: Vec<PathBuf>) -> Self {
        Self {
            candidate_paths,
            device: NdArrayDevice::default(),
            model: OnceCell::new(),
        }
    }

    /// First existing candidate path, if any.
    pub fn locate_artifact(&self) -> Option<&Path> {
        self.candidate_paths
            .iter()
            .map(PathBuf::as_path)
            .find(|p| p.exists())
    }

    /// The cached model, loading it on first use.
    async fn model(&self) -> Result<&Classifier<InferenceBackend>> {
        self.model
            .get_or_try_init(|| async { self.load_model() })
            .await
    }

    fn load_model(&self) -> Result<Classifier<InferenceBackend>> {
        let path = self.locate_artifact().ok_or_else(|| {
            let searched = self
                .candidate_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            DigitError::ModelMissing { searched }
        })?;

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let model = ClassifierConfig::new()
            .init::<InferenceBackend>(&self.device)
            .load_file(path, &recorder, &self.device)
            .map_err(|e| {
                DigitError::ModelLoad(format!("{} (artifact: {})", e, path.display()))
            })?;

        info!(artifact = %path.display(), "loaded digit classifier");
        Ok(model)
    }

    /// Run a preprocessed sample through the cached model.
    pub async fn predict(&self, image: &DigitImage) -> Result<Prediction> {
        let model = self.model().await?;
        run_inference(model, image, &self.device)
    }
}

/// Forward a single sample and reduce the output to a prediction.
fn run_inference<B: Backend>(
    model: &Classifier<B>,
    image: &DigitImage,
    device: &B::Device,
) -> Result<Prediction> {
    let input = Tensor::<B, 2>::from_data(
        TensorData::new(image.pixels().to_vec(), [1, INPUT_DIM]),
        device,
    );

    let probs: Vec<f32> = model
        .forward_probs(input)
        .into_data()
        .to_vec()
        .map_err(|e| DigitError::Internal(format!("probability tensor conversion failed: {e:?}")))?;

    Ok(Prediction {
        digit: argmax(&probs),
        probs,
    })
}

/// Index of the maximum value in a probability vector.
pub fn argmax(probs: &[f32]) -> usize {
    probs
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
