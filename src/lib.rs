pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod inference;
pub mod model;
pub mod preprocess;
pub mod server;
pub mod training;

pub use config::AppConfig;
pub use error::{DigitError, Result};
pub use inference::{Prediction, Predictor};
pub use model::{Classifier, ClassifierConfig};
pub use preprocess::{preprocess_bytes, DigitImage};
