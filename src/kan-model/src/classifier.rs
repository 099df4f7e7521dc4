use std::path::{Path, PathBuf};

use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::architecture::{build_kan_cnn, input_shape};
use crate::preprocess::preprocess_image;
use crate::{Error, Result, Sequential, Tensor, Timer};

/// Top class of a single image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Index of the most probable class
    pub class_index: usize,

    /// Softmax probability of that class
    pub confidence: f32,
}

/// Where the wrapped network came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Loaded(PathBuf),
    Created,
}

#[derive(Debug)]
pub struct KanModel {
    model: Option<Sequential>,
    source: Option<ModelSource>,
}

impl KanModel {
    /// Loads the saved model at `model_path` when it exists, otherwise builds
    /// a fresh untrained network.
    pub fn new(model_path: Option<&Path>) -> Result<Self> {
        match model_path {
            Some(path) if path.exists() => Self::load(path),
            _ => Self::create(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut t = Timer::new_start("Loading model");
        let model = Sequential::load(path)?;
        t.stop();

        check_input(&model)?;
        info!("Loaded model from {}", path.display());

        Ok(KanModel {
            model: Some(model),
            source: Some(ModelSource::Loaded(path.to_path_buf())),
        })
    }

    pub fn create() -> Result<Self> {
        Self::create_with_rng(&mut rand::thread_rng())
    }

    pub fn create_with_rng<R: Rng + ?Sized>(rng: &mut R) -> Result<Self> {
        let mut t = Timer::new_start("Building model");
        let model = build_kan_cnn(rng)?;
        t.stop();

        info!("Created new Kan AI model");

        Ok(KanModel {
            model: Some(model),
            source: Some(ModelSource::Created),
        })
    }

    /// Wraps an already-built network, which must accept a single
    /// 224x224 RGB image.
    pub fn from_sequential(model: Sequential) -> Result<Self> {
        check_input(&model)?;
        Ok(KanModel {
            model: Some(model),
            source: Some(ModelSource::Created),
        })
    }

    /// A wrapper without a network; every prediction fails with
    /// [`Error::NotInitialized`].
    pub fn uninitialized() -> Self {
        KanModel {
            model: None,
            source: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    pub fn source(&self) -> Option<&ModelSource> {
        self.source.as_ref()
    }

    pub fn network(&self) -> Option<&Sequential> {
        self.model.as_ref()
    }

    pub fn predict(&self, img_bytes: &[u8]) -> Result<Prediction> {
        let model = self.model.as_ref().ok_or(Error::NotInitialized)?;
        let input = preprocess_image(img_bytes)?;
        run(model, &input)
    }

    pub fn predict_tensor(&self, input: &Tensor) -> Result<Prediction> {
        let model = self.model.as_ref().ok_or(Error::NotInitialized)?;
        run(model, input)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let model = self.model.as_ref().ok_or(Error::NotInitialized)?;
        model.save(path)?;
        info!("Saved model to {}", path.display());
        Ok(())
    }
}

fn run(model: &Sequential, input: &Tensor) -> Result<Prediction> {
    let mut t = Timer::new_start("Running forward pass");
    let output = model.predict(input)?;
    t.stop();

    if output.is_empty() {
        return Err(Error::Layer("Model produced an empty output".to_string()));
    }

    let probs = first_row(&output)?;
    let (class_index, confidence) = top_class(&probs)
        .ok_or_else(|| Error::Layer("Model produced an empty output".to_string()))?;

    Ok(Prediction {
        class_index,
        confidence,
    })
}

/// Class scores of the first sample; the wrapper classifies one image at a time.
fn first_row(output: &Tensor) -> Result<Vec<f32>> {
    let data = output.data();
    if data.ndim() < 2 {
        return Ok(data.iter().copied().collect());
    }

    data.outer_iter()
        .next()
        .map(|row| row.iter().copied().collect())
        .ok_or_else(|| Error::Layer("Model produced an empty batch".to_string()))
}

/// Arg-max with the first index winning ties.
fn top_class(probs: &[f32]) -> Option<(usize, f32)> {
    probs
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (idx, p)| match best {
            Some((_, best_p)) if best_p >= p => best,
            _ => Some((idx, p)),
        })
}

fn check_input(model: &Sequential) -> Result<()> {
    let expected = input_shape();
    let output = model
        .output_shape(&expected)
        .map_err(|e| Error::ModelLoad(format!("model does not accept {:?}: {}", expected, e)))?;

    match *output {
        [1, classes] if classes > 0 => Ok(()),
        _ => Err(Error::ModelLoad(format!(
            "model maps {:?} to {:?}, expected [1, classes]",
            expected, output
        ))),
    }
}
