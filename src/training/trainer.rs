// Copyright 2019-present, the HuggingFace Inc. team, The Google AI Language Team and Facebook, Inc.
// Copyright 2019 Guillaume Becquin
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::classification::StanceClassifier;
use crate::common::error::StanceError;
use crate::dataset::{DatasetSplit, FeatureBatcher};
use crate::evaluation::{evaluate, EvaluationReport};
use crate::training::schedule::LinearScheduleWithWarmup;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::time::{Duration, Instant};
use tch::nn;
use tch::nn::OptimizerConfig;

/// # Configuration for fine-tuning runs
///
/// Defaults follow the standard BERT fine-tuning recipe: learning rate 5e-5
/// with AdamW (epsilon at the optimizer default 1e-8), weight decay 0.01,
/// gradient norms clipped at 1.0, 4 epochs of batches of 16, no warmup,
/// and a five-seed sweep for variance estimation.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Peak learning rate
    pub learning_rate: f64,
    /// AdamW weight decay
    pub weight_decay: f64,
    /// Ceiling applied to the global gradient norm before each update
    pub max_grad_norm: f64,
    /// Number of passes over the train partition
    pub num_epochs: usize,
    /// Examples per batch (training and validation)
    pub batch_size: usize,
    /// Warmup steps of the linear learning-rate schedule
    pub warmup_steps: usize,
    /// Emit a progress line every this many batches
    pub logging_steps: usize,
    /// Seeds of the sweep; each seed retrains from a fresh classifier
    pub seeds: Vec<u64>,
}

impl Default for TrainerConfig {
    fn default() -> TrainerConfig {
        TrainerConfig {
            learning_rate: 5e-5,
            weight_decay: 0.01,
            max_grad_norm: 1.0,
            num_epochs: 4,
            batch_size: 16,
            warmup_steps: 0,
            logging_steps: 40,
            seeds: vec![42, 60, 100, 200, 500],
        }
    }
}

/// Record of one training epoch.
#[derive(Debug, Clone)]
pub struct EpochRecord {
    /// Epoch number, starting at 1
    pub epoch: usize,
    /// Mean training loss over the epoch's batches
    pub train_loss: f64,
    /// Wall-clock duration of the training phase
    pub elapsed: Duration,
    /// Validation metrics measured after the epoch
    pub validation: EvaluationReport,
}

/// Record of one full training run under a single seed.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub seed: u64,
    pub epochs: Vec<EpochRecord>,
}

impl TrainingReport {
    /// Validation metrics of the final epoch.
    pub fn final_validation(&self) -> Option<&EvaluationReport> {
        self.epochs.last().map(|record| &record.validation)
    }
}

/// Final-epoch metrics aggregated over the seeds of a sweep (mean and
/// population standard deviation).
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSummary {
    pub accuracy_mean: f64,
    pub accuracy_std: f64,
    pub f1_macro_mean: f64,
    pub f1_macro_std: f64,
    pub matthews_mean: f64,
    pub matthews_std: f64,
    /// Number of runs aggregated
    pub runs: usize,
}

impl SweepSummary {
    fn from_runs(runs: &[TrainingReport]) -> SweepSummary {
        let finals = runs
            .iter()
            .filter_map(|run| run.final_validation())
            .collect::<Vec<&EvaluationReport>>();
        let collect = |f: fn(&EvaluationReport) -> f64| {
            finals.iter().map(|report| f(report)).collect::<Vec<f64>>()
        };
        let (accuracy_mean, accuracy_std) = mean_std(&collect(|report| report.accuracy));
        let (f1_macro_mean, f1_macro_std) = mean_std(&collect(|report| report.f1_macro));
        let (matthews_mean, matthews_std) = mean_std(&collect(|report| report.matthews));
        SweepSummary {
            accuracy_mean,
            accuracy_std,
            f1_macro_mean,
            f1_macro_std,
            matthews_mean,
            matthews_std,
            runs: finals.len(),
        }
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} seeds | accuracy: {:.4} (±{:.4}) | macro F1: {:.4} (±{:.4}) | MCC: {:.4} (±{:.4})",
            self.runs,
            self.accuracy_mean,
            self.accuracy_std,
            self.f1_macro_mean,
            self.f1_macro_std,
            self.matthews_mean,
            self.matthews_std
        )
    }
}

/// Result of a seed sweep: one report per seed, the cross-seed aggregate and
/// the classifier trained in the final run (kept for persistence).
pub struct SweepOutcome {
    pub runs: Vec<TrainingReport>,
    pub summary: SweepSummary,
    pub classifier: StanceClassifier,
}

/// # Fine-tuning loop for a stance classifier
///
/// Per batch: zero accumulated gradients, forward pass producing the loss
/// conditioned on the batch labels, backward pass, clip the global gradient
/// norm, apply the AdamW update, advance the learning-rate schedule. Per
/// epoch: mean training loss, elapsed wall-clock time and a validation pass.
pub struct StanceTrainer {
    config: TrainerConfig,
}

impl StanceTrainer {
    pub fn new(config: TrainerConfig) -> Result<StanceTrainer, StanceError> {
        if config.num_epochs == 0 {
            return Err(StanceError::InvalidConfigurationError(
                "At least one epoch is required".to_string(),
            ));
        }
        if config.batch_size == 0 {
            return Err(StanceError::InvalidConfigurationError(
                "Batch size must be at least 1".to_string(),
            ));
        }
        if config.seeds.is_empty() {
            return Err(StanceError::InvalidConfigurationError(
                "At least one seed is required".to_string(),
            ));
        }
        if config.logging_steps == 0 {
            return Err(StanceError::InvalidConfigurationError(
                "Logging interval must be at least 1".to_string(),
            ));
        }
        Ok(StanceTrainer { config })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Runs the full fine-tuning loop once under the given seed.
    ///
    /// Both the tch RNG and the batch-shuffle RNG are seeded, so a run is
    /// reproducible for a fixed `(classifier initialization, dataset, seed)`.
    pub fn train(
        &self,
        classifier: &StanceClassifier,
        dataset: &DatasetSplit,
        seed: u64,
    ) -> Result<TrainingReport, StanceError> {
        tch::manual_seed(seed as i64);
        let mut rng = StdRng::seed_from_u64(seed);
        let device = classifier.device();

        let mut optimizer = nn::AdamW {
            wd: self.config.weight_decay,
            ..Default::default()
        }
        .build(classifier.var_store(), self.config.learning_rate)?;

        let batcher = FeatureBatcher::new(&dataset.train, self.config.batch_size)?;
        let num_batches = batcher.num_batches();
        if num_batches == 0 {
            return Err(StanceError::InvalidDatasetError(
                "Train partition is empty".to_string(),
            ));
        }
        let mut schedule = LinearScheduleWithWarmup::new(
            self.config.learning_rate,
            self.config.warmup_steps,
            num_batches * self.config.num_epochs,
        );

        let mut epochs = Vec::with_capacity(self.config.num_epochs);
        for epoch in 1..=self.config.num_epochs {
            let epoch_start = Instant::now();
            let mut total_loss = 0.0;
            for (step, batch) in batcher.shuffled(&mut rng).enumerate() {
                if step > 0 && step % self.config.logging_steps == 0 {
                    log::info!(
                        "Epoch {}: batch {:>5} of {:>5}. Elapsed: {}.",
                        epoch,
                        step,
                        num_batches,
                        format_elapsed(epoch_start.elapsed())
                    );
                }
                let batch = batch.to_device(device);
                optimizer.zero_grad();
                let loss = classifier.forward_loss(&batch);
                total_loss += loss.double_value(&[]);
                loss.backward();
                optimizer.clip_grad_norm(self.config.max_grad_norm);
                optimizer.set_lr(schedule.learning_rate());
                optimizer.step();
                schedule.step();
            }
            let train_loss = total_loss / num_batches as f64;
            let elapsed = epoch_start.elapsed();
            log::info!(
                "Epoch {} of {}: average training loss {:.4}, took {}",
                epoch,
                self.config.num_epochs,
                train_loss,
                format_elapsed(elapsed)
            );

            let validation = evaluate(classifier, &dataset.validation, self.config.batch_size)?;
            log::info!("Validation after epoch {}: {}", epoch, validation);
            epochs.push(EpochRecord {
                epoch,
                train_loss,
                elapsed,
                validation,
            });
        }
        Ok(TrainingReport { seed, epochs })
    }

    /// Repeats the full training loop once per configured seed, each time on
    /// a freshly built classifier, and aggregates the final-epoch validation
    /// metrics across seeds.
    pub fn sweep<F>(
        &self,
        dataset: &DatasetSplit,
        mut build_classifier: F,
    ) -> Result<SweepOutcome, StanceError>
    where
        F: FnMut() -> Result<StanceClassifier, StanceError>,
    {
        let mut runs = Vec::with_capacity(self.config.seeds.len());
        let mut last_classifier = None;
        for seed in &self.config.seeds {
            log::info!("Starting training run with seed {}", seed);
            let classifier = build_classifier()?;
            let report = self.train(&classifier, dataset, *seed)?;
            runs.push(report);
            last_classifier = Some(classifier);
        }
        let summary = SweepSummary::from_runs(&runs);
        log::info!("Aggregate over seeds: {}", summary);
        Ok(SweepOutcome {
            runs,
            summary,
            classifier: last_classifier.expect("seed list validated as non-empty"),
        })
    }
}

/// Mean and population standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
        / values.len() as f64;
    (mean, variance.sqrt())
}

/// Formats a duration as hh:mm:ss, rounded to the nearest second.
fn format_elapsed(elapsed: Duration) -> String {
    let mut seconds = elapsed.as_secs();
    if elapsed.subsec_millis() >= 500 {
        seconds += 1;
    }
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_follow_the_fine_tuning_recipe() {
        let config = TrainerConfig::default();
        assert_eq!(config.learning_rate, 5e-5);
        assert_eq!(config.num_epochs, 4);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.max_grad_norm, 1.0);
        assert_eq!(config.warmup_steps, 0);
        assert_eq!(config.seeds, vec![42, 60, 100, 200, 500]);
    }

    #[test]
    fn degenerate_configurations_are_rejected() {
        let mut config = TrainerConfig::default();
        config.num_epochs = 0;
        assert!(StanceTrainer::new(config).is_err());

        let mut config = TrainerConfig::default();
        config.batch_size = 0;
        assert!(StanceTrainer::new(config).is_err());

        let mut config = TrainerConfig::default();
        config.seeds.clear();
        assert!(StanceTrainer::new(config).is_err());
    }

    #[test]
    fn mean_std_matches_hand_computed_values() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - 2.0).abs() < 1e-12);
        assert_eq!(mean_std(&[]), (0.0, 0.0));
    }

    #[test]
    fn elapsed_time_formats_as_hh_mm_ss() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(75)), "00:01:15");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "01:02:05");
        assert_eq!(format_elapsed(Duration::from_millis(1600)), "00:00:02");
    }
}
