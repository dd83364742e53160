//! MLP digit classifier.
//!
//! Flatten(28x28) -> Linear(784, 128) + ReLU -> Linear(128, 10).
//! The network outputs raw logits; softmax is applied at the loss and
//! inference boundaries.

use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Side length of an input image
pub const IMAGE_SIDE: usize = 28;
/// Flattened input dimension
pub const INPUT_DIM: usize = IMAGE_SIDE * IMAGE_SIDE;
/// Number of digit classes
pub const NUM_CLASSES: usize = 10;

/// Classifier configuration
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    /// Hidden dimension
    #[config(default = "128")]
    pub hidden_dim: usize,
}

/// Feed-forward digit classifier
#[derive(Module, Debug)]
pub struct Classifier<B: Backend> {
    hidden: Linear<B>,
    output: Linear<B>,
    activation: Relu,
}

impl ClassifierConfig {
    /// Initialize the classifier with fresh weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> Classifier<B> {
        let hidden = LinearConfig::new(INPUT_DIM, self.hidden_dim).init(device);
        let output = LinearConfig::new(self.hidden_dim, NUM_CLASSES).init(device);

        Classifier {
            hidden,
            output,
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> Classifier<B> {
    /// Forward pass returning class logits `[batch, 10]`
    pub fn forward(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        let hidden = self.hidden.forward(images);
        let hidden = self.activation.forward(hidden);
        self.output.forward(hidden)
    }

    /// Class probabilities (softmax over logits) `[batch, 10]`
    pub fn forward_probs(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        let logits = self.forward(images);
        burn::tensor::activation::softmax(logits, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn forward_produces_one_logit_per_class() {
        let device = NdArrayDevice::default();
        let model = ClassifierConfig::new().init::<NdArray>(&device);

        let input = Tensor::<NdArray, 2>::zeros([3, INPUT_DIM], &device);
        let logits = model.forward(input);

        assert_eq!(logits.dims(), [3, NUM_CLASSES]);
    }

    #[test]
    fn probabilities_sum_to_one_per_row() {
        let device = NdArrayDevice::default();
        let model = ClassifierConfig::new().init::<NdArray>(&device);

        let input = Tensor::<NdArray, 2>::ones([2, INPUT_DIM], &device);
        let probs = model.forward_probs(input);
        let sums: Vec<f32> = probs.sum_dim(1).into_data().to_vec().unwrap();

        for sum in sums {
            assert!((sum - 1.0).abs() < 1e-5, "row sum was {sum}");
        }
    }
}
