//! One-shot training run for the digit classifier.
//!
//! Sequential pipeline mirroring the reference script: load MNIST,
//! normalize, one-hot encode, train the MLP with Adam, evaluate on the
//! held-out test split, export the artifact, and optionally render a
//! few test predictions. No checkpointing, no early stopping.

use std::fs;

use burn::backend::Autodiff;
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataloader::DataLoaderBuilder;
use burn::data::dataset::transform::PartialDataset;
use burn::data::dataset::vision::{MnistDataset, MnistItem};
use burn::data::dataset::Dataset;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::activation::log_softmax;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use burn_ndarray::{NdArray, NdArrayDevice};
use tracing::info;

use crate::config::AppConfig;
use crate::data::{MnistBatch, MnistBatcher};
use crate::error::{DigitError, Result};
use crate::model::{Classifier, ClassifierConfig};

type TrainSplit = PartialDataset<MnistDataset, MnistItem>;

/// Train on the CPU ndarray backend and export the artifact to the
/// first configured candidate path.
pub fn train(app: &AppConfig) -> Result<()> {
    run::<Autodiff<NdArray>>(app, NdArrayDevice::default())
}

fn run<B: AutodiffBackend>(app: &AppConfig, device: B::Device) -> Result<()> {
    let cfg = &app.training;
    B::seed(cfg.seed);

    // MNIST downloads on first use; subsequent runs hit the local cache.
    let full_len = MnistDataset::train().len();
    let n_valid = (full_len as f64 * cfg.valid_split) as usize;
    let n_train = full_len - n_valid;

    let train_split: TrainSplit = PartialDataset::new(MnistDataset::train(), 0, n_train);
    let valid_split: TrainSplit = PartialDataset::new(MnistDataset::train(), n_train, full_len);

    info!(
        train = n_train,
        valid = n_valid,
        epochs = cfg.epochs,
        batch_size = cfg.batch_size,
        "starting training"
    );

    let dataloader_train = DataLoaderBuilder::new(MnistBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_split);

    let dataloader_valid =
        DataLoaderBuilder::new(MnistBatcher::<B::InnerBackend>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .num_workers(cfg.num_workers)
            .build(valid_split);

    let mut model = ClassifierConfig::new().init::<B>(&device);
    let mut optim = AdamConfig::new().init();

    for epoch in 1..=cfg.epochs {
        let mut train_loss = 0.0;
        let mut batches = 0usize;

        for batch in dataloader_train.iter() {
            let logits = model.forward(batch.images);
            let loss = cross_entropy(logits, batch.targets);
            train_loss += loss.clone().into_scalar().elem::<f32>();
            batches += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        let (valid_loss, valid_accuracy) =
            evaluate(&model.valid(), dataloader_valid.iter());

        info!(
            epoch,
            train_loss = train_loss / batches.max(1) as f32,
            valid_loss,
            valid_accuracy,
            "epoch complete"
        );
    }

    let model = model.valid();

    let dataloader_test =
        DataLoaderBuilder::new(MnistBatcher::<B::InnerBackend>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .build(MnistDataset::test());
    let (test_loss, test_accuracy) = evaluate(&model, dataloader_test.iter());
    info!(test_loss, test_accuracy, "evaluation complete");
    println!("Test accuracy: {test_accuracy:.4}");

    export_artifact(app, &model)?;

    if cfg.show_predictions > 0 {
        show_predictions(&model, &device, cfg.show_predictions)?;
    }

    Ok(())
}

/// Categorical cross-entropy against one-hot targets.
fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let log_probs = log_softmax(logits, 1);
    (targets * log_probs).sum_dim(1).mean().neg()
}

/// Mean loss and accuracy over a full pass of the given loader.
fn evaluate<B: Backend>(
    model: &Classifier<B>,
    batches: impl Iterator<Item = MnistBatch<B>>,
) -> (f32, f32) {
    let mut loss_sum = 0.0;
    let mut num_batches = 0usize;
    let mut correct = 0usize;
    let mut total = 0usize;

    for batch in batches {
        let count = batch.labels.dims()[0];
        let logits = model.forward(batch.images);

        correct += num_correct(logits.clone(), batch.labels);
        total += count;

        loss_sum += cross_entropy(logits, batch.targets)
            .into_scalar()
            .elem::<f32>();
        num_batches += 1;
    }

    (
        loss_sum / num_batches.max(1) as f32,
        correct as f32 / total.max(1) as f32,
    )
}

fn num_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    logits
        .argmax(1)
        .squeeze::<1>(1)
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

fn export_artifact<B: Backend>(app: &AppConfig, model: &Classifier<B>) -> Result<()> {
    let path = app
        .model
        .candidate_paths
        .first()
        .ok_or_else(|| DigitError::Config("no candidate artifact path configured".to_string()))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(path, &recorder)
        .map_err(|e| DigitError::Internal(format!("failed to save artifact: {e}")))?;

    info!(artifact = %path.display(), "exported trained model");
    Ok(())
}

/// Render a handful of test predictions to stdout as intensity grids.
fn show_predictions<B: Backend>(
    model: &Classifier<B>,
    device: &B::Device,
    count: usize,
) -> Result<()> {
    let test = MnistDataset::test();
    let batcher = MnistBatcher::<B>::new(device.clone());

    for i in 0..count.min(test.len()) {
        let Some(item) = test.get(i) else { break };
        let image = item.image;
        let label = item.label;

        let batch = batcher.batch(vec![item]);
        let probs: Vec<f32> = model
            .forward_probs(batch.images)
            .into_data()
            .to_vec()
            .map_err(|e| {
                DigitError::Internal(format!("probability tensor conversion failed: {e:?}"))
            })?;
        let predicted = crate::inference::argmax(&probs);

        println!("Predicted: {predicted}, Actual: {label}");
        print_digit(&image);
        println!();
    }

    Ok(())
}

fn print_digit(image: &[[f32; 28]; 28]) {
    const CHARS: [char; 5] = [' ', '░', '▒', '▓', '█'];

    for row in image {
        for pixel in row {
            let idx = (*pixel as usize * (CHARS.len() - 1)) / 255;
            print!("{}", CHARS[idx.min(CHARS.len() - 1)]);
        }
        println!();
    }
}
