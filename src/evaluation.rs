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

//! # Evaluation and classification metrics
//!
//! One consolidated evaluation routine shared by the trainer and any caller
//! wanting validation/test figures. The model runs in inference mode with
//! gradient tracking disabled; the predicted class is the argmax over the
//! class scores. Metrics are computed per batch and averaged across batches.
//!
//! The metric functions operate on plain prediction/label slices and are
//! usable standalone.

use crate::classification::StanceClassifier;
use crate::common::error::StanceError;
use crate::dataset::{FeatureBatcher, InputFeature};
use std::fmt;
use tch::{no_grad, Device};

/// F1 averaging strategy, mirroring the usual binary/micro/macro variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum F1Average {
    /// F1 of the positive class only
    Binary,
    /// Global counts over both classes
    Micro,
    /// Unweighted mean of the per-class F1 scores
    Macro,
}

/// Fraction of predictions exactly matching the labels. Empty input yields 0.
pub fn accuracy(predictions: &[i64], labels: &[i64]) -> f64 {
    assert_eq!(predictions.len(), labels.len());
    if predictions.is_empty() {
        return 0.0;
    }
    let matches = predictions
        .iter()
        .zip(labels)
        .filter(|(prediction, label)| prediction == label)
        .count();
    matches as f64 / predictions.len() as f64
}

/// F1 score under the requested averaging strategy. Degenerate denominators
/// (no predicted or no actual members of a class) contribute 0, following
/// the scikit-learn convention.
pub fn f1_score(predictions: &[i64], labels: &[i64], average: F1Average) -> f64 {
    assert_eq!(predictions.len(), labels.len());
    match average {
        F1Average::Binary => class_f1(predictions, labels, 1),
        F1Average::Macro => {
            (class_f1(predictions, labels, 0) + class_f1(predictions, labels, 1)) / 2.0
        }
        F1Average::Micro => {
            let mut true_positives = 0.0;
            let mut false_positives = 0.0;
            let mut false_negatives = 0.0;
            for class in &[0i64, 1] {
                let (tp, fp, fn_) = class_counts(predictions, labels, *class);
                true_positives += tp;
                false_positives += fp;
                false_negatives += fn_;
            }
            harmonic_f1(true_positives, false_positives, false_negatives)
        }
    }
}

/// Matthews correlation coefficient of binary predictions. Returns 0 when a
/// confusion-matrix margin is empty (scikit-learn convention).
pub fn matthews_correlation(predictions: &[i64], labels: &[i64]) -> f64 {
    assert_eq!(predictions.len(), labels.len());
    let mut true_positives = 0.0;
    let mut true_negatives = 0.0;
    let mut false_positives = 0.0;
    let mut false_negatives = 0.0;
    for (prediction, label) in predictions.iter().zip(labels) {
        match (*prediction, *label) {
            (1, 1) => true_positives += 1.0,
            (0, 0) => true_negatives += 1.0,
            (1, 0) => false_positives += 1.0,
            _ => false_negatives += 1.0,
        }
    }
    let denominator = ((true_positives + false_positives)
        * (true_positives + false_negatives)
        * (true_negatives + false_positives)
        * (true_negatives + false_negatives))
        .sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    (true_positives * true_negatives - false_positives * false_negatives) / denominator
}

fn class_counts(predictions: &[i64], labels: &[i64], class: i64) -> (f64, f64, f64) {
    let mut true_positives = 0.0;
    let mut false_positives = 0.0;
    let mut false_negatives = 0.0;
    for (prediction, label) in predictions.iter().zip(labels) {
        if *prediction == class && *label == class {
            true_positives += 1.0;
        } else if *prediction == class {
            false_positives += 1.0;
        } else if *label == class {
            false_negatives += 1.0;
        }
    }
    (true_positives, false_positives, false_negatives)
}

fn class_f1(predictions: &[i64], labels: &[i64], class: i64) -> f64 {
    let (true_positives, false_positives, false_negatives) =
        class_counts(predictions, labels, class);
    harmonic_f1(true_positives, false_positives, false_negatives)
}

fn harmonic_f1(true_positives: f64, false_positives: f64, false_negatives: f64) -> f64 {
    let predicted = true_positives + false_positives;
    let actual = true_positives + false_negatives;
    if predicted == 0.0 || actual == 0.0 {
        return 0.0;
    }
    let precision = true_positives / predicted;
    let recall = true_positives / actual;
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

/// Metrics of one evaluation pass, averaged over its batches.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub f1_binary: f64,
    pub f1_micro: f64,
    pub f1_macro: f64,
    pub matthews: f64,
    /// Number of batches the averages were taken over
    pub batches: usize,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "accuracy: {:.4} | F1 (binary/micro/macro): {:.4}/{:.4}/{:.4} | MCC: {:.4}",
            self.accuracy, self.f1_binary, self.f1_micro, self.f1_macro, self.matthews
        )
    }
}

/// Evaluates the classifier over a partition.
///
/// Batches are visited sequentially, gradients are never computed and no
/// parameter is mutated. Per-batch metrics are averaged across batches, so
/// the figures match a run of the training-loop validation phase.
pub fn evaluate(
    classifier: &StanceClassifier,
    features: &[InputFeature],
    batch_size: usize,
) -> Result<EvaluationReport, StanceError> {
    let batcher = FeatureBatcher::new(features, batch_size)?;
    let mut sums = [0.0f64; 5];
    let mut batches = 0usize;
    for batch in batcher.sequential() {
        let batch = batch.to_device(classifier.device());
        let logits = no_grad(|| classifier.forward_logits(&batch, false));
        let predictions =
            Vec::<i64>::try_from(&logits.argmax(-1, false).to_device(Device::Cpu))?;
        let labels = Vec::<i64>::try_from(&batch.labels.to_device(Device::Cpu))?;
        sums[0] += accuracy(&predictions, &labels);
        sums[1] += f1_score(&predictions, &labels, F1Average::Binary);
        sums[2] += f1_score(&predictions, &labels, F1Average::Micro);
        sums[3] += f1_score(&predictions, &labels, F1Average::Macro);
        sums[4] += matthews_correlation(&predictions, &labels);
        batches += 1;
    }
    let scale = if batches > 0 { batches as f64 } else { 1.0 };
    Ok(EvaluationReport {
        accuracy: sums[0] / scale,
        f1_binary: sums[1] / scale,
        f1_micro: sums[2] / scale,
        f1_macro: sums[3] / scale,
        matthews: sums[4] / scale,
        batches,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exact_match_accuracy_is_one() {
        let labels = [1, 0, 1, 1, 0];
        assert_eq!(accuracy(&labels, &labels), 1.0);
        assert_eq!(f1_score(&labels, &labels, F1Average::Binary), 1.0);
        assert_eq!(matthews_correlation(&labels, &labels), 1.0);
    }

    #[test]
    fn inverted_predictions_give_matthews_minus_one() {
        let labels = [1, 0, 1, 0, 1, 1];
        let inverted = labels.iter().map(|label| 1 - label).collect::<Vec<i64>>();
        let mcc = matthews_correlation(&inverted, &labels);
        assert!((mcc + 1.0).abs() < 1e-12);
    }

    #[test]
    fn f1_variants_match_hand_computed_values() {
        let predictions = [1, 0, 1, 1];
        let labels = [1, 1, 0, 1];
        // positive class: tp=2, fp=1, fn=1
        assert!((f1_score(&predictions, &labels, F1Average::Binary) - 2.0 / 3.0).abs() < 1e-12);
        // micro-F1 collapses to accuracy for single-label tasks
        assert!(
            (f1_score(&predictions, &labels, F1Average::Micro) - accuracy(&predictions, &labels))
                .abs()
                < 1e-12
        );
        // class 0 scores 0, macro averages it with the positive class
        assert!((f1_score(&predictions, &labels, F1Average::Macro) - 1.0 / 3.0).abs() < 1e-12);
        assert!((matthews_correlation(&predictions, &labels) + 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_margins_yield_zero() {
        // model predicts a single class: one MCC margin is empty
        let predictions = [1, 1, 1, 1];
        let labels = [1, 0, 1, 0];
        assert_eq!(matthews_correlation(&predictions, &labels), 0.0);
        assert_eq!(f1_score(&predictions, &labels, F1Average::Binary), 2.0 / 3.0);
        // no positive predictions and no positive labels
        let zeros = [0, 0];
        assert_eq!(f1_score(&zeros, &zeros, F1Average::Binary), 0.0);
    }

    #[test]
    fn empty_input_yields_zero_accuracy() {
        assert_eq!(accuracy(&[], &[]), 0.0);
    }
}
