//! Batching for the MNIST dataset.
//!
//! Pixel intensities are normalized to [0,1] and labels are one-hot
//! encoded into length-10 target vectors. The integer labels are kept
//! alongside the one-hot targets for accuracy computation.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::vision::MnistItem;
use burn::prelude::*;

use crate::model::{INPUT_DIM, NUM_CLASSES};

#[derive(Clone)]
pub struct MnistBatcher<B: Backend> {
    device: B::Device,
}

#[derive(Clone, Debug)]
pub struct MnistBatch<B: Backend> {
    /// Normalized images `[batch, 784]`
    pub images: Tensor<B, 2>,
    /// One-hot targets `[batch, 10]`
    pub targets: Tensor<B, 2>,
    /// Integer labels `[batch]`
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> MnistBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<MnistItem, MnistBatch<B>> for MnistBatcher<B> {
    fn batch(&self, items: Vec<MnistItem>) -> MnistBatch<B> {
        let batch = items.len();

        let mut images = Vec::with_capacity(batch * INPUT_DIM);
        let mut targets = vec![0.0f32; batch * NUM_CLASSES];
        let mut labels = Vec::with_capacity(batch);

        for (i, item) in items.iter().enumerate() {
            for row in item.image.iter() {
                for pixel in row.iter() {
                    images.push(pixel / 255.0);
                }
            }
            targets[i * NUM_CLASSES + item.label as usize] = 1.0;
            labels.push(item.label as i64);
        }

        let images = Tensor::from_data(TensorData::new(images, [batch, INPUT_DIM]), &self.device);
        let targets = Tensor::from_data(TensorData::new(targets, [batch, NUM_CLASSES]), &self.device);
        let labels = Tensor::from_data(TensorData::new(labels, [batch]), &self.device);

        MnistBatch {
            images,
            targets,
            labels,
        }
    }
}
