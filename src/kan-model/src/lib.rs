//! # kan-model
//!
//! Image classification model wrapper for the Kan AI backend.
//!
//! The wrapper either loads a saved network from disk or builds the fixed
//! Kan CNN with random weights, turns uploaded image bytes into a
//! `[1, 224, 224, 3]` tensor and reports the most likely class.
//!
//! ```rust,ignore
//! use kan_model::KanModel;
//!
//! let model = KanModel::new(None)?;
//! let prediction = model.predict(&std::fs::read("leaf.jpg")?)?;
//! println!("{} ({:.3})", prediction.class_index, prediction.confidence);
//! ```

pub mod activations;
pub mod classifier;
pub mod error;
pub mod layers;
pub mod model;
pub mod preprocess;
pub mod tensor;
pub mod timer;

pub use classifier::{KanModel, ModelSource, Prediction};
pub use error::{Error, Result};
pub use model::Sequential;
pub use tensor::Tensor;
pub use timer::Timer;
