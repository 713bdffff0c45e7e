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

use crate::common::error::StanceError;
use crate::dataset::encoding::InputFeature;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Disjoint train/validation partitions of an encoded dataset.
///
/// Partitions are produced once per run and never reshuffled; only
/// `oversample_minority` may extend the train partition before training
/// starts, and it never touches the validation partition.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Vec<InputFeature>,
    pub validation: Vec<InputFeature>,
}

/// Splits encoded features into train and validation partitions.
///
/// The shuffle is driven by a dedicated RNG seeded with `seed`, so an
/// identical `(features, validation_fraction, seed)` triple reproduces
/// identical partitions across runs.
///
/// # Arguments
///
/// * `features` - the full encoded dataset.
/// * `validation_fraction` - share held out for validation, in (0, 1).
/// * `seed` - shuffle seed.
pub fn train_validation_split(
    features: Vec<InputFeature>,
    validation_fraction: f64,
    seed: u64,
) -> Result<DatasetSplit, StanceError> {
    if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
        return Err(StanceError::InvalidConfigurationError(format!(
            "Validation fraction must lie in (0, 1), got {}",
            validation_fraction
        )));
    }
    if features.len() < 2 {
        return Err(StanceError::InvalidDatasetError(format!(
            "At least 2 examples are required to split, got {}",
            features.len()
        )));
    }

    let mut order = (0..features.len()).collect::<Vec<usize>>();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut validation_size = (features.len() as f64 * validation_fraction).round() as usize;
    validation_size = validation_size.max(1).min(features.len() - 1);

    Ok(partition_by_order(features, &order, validation_size))
}

/// Splits encoded features by selecting one of `folds` shuffled folds as the
/// validation partition.
///
/// Folds are contiguous chunks of the shuffled order with sizes differing by
/// at most one; over all `fold_index` values (with identical seed) every
/// feature lands in the validation partition exactly once.
pub fn kfold_split(
    features: Vec<InputFeature>,
    folds: usize,
    fold_index: usize,
    seed: u64,
) -> Result<DatasetSplit, StanceError> {
    if folds < 2 {
        return Err(StanceError::InvalidConfigurationError(format!(
            "At least 2 folds are required, got {}",
            folds
        )));
    }
    if fold_index >= folds {
        return Err(StanceError::InvalidConfigurationError(format!(
            "Fold index {} is out of range for {} folds",
            fold_index, folds
        )));
    }
    if features.len() < folds {
        return Err(StanceError::InvalidDatasetError(format!(
            "Cannot build {} folds from {} examples",
            folds,
            features.len()
        )));
    }

    let mut order = (0..features.len()).collect::<Vec<usize>>();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let base_size = features.len() / folds;
    let remainder = features.len() % folds;
    let fold_size = |index: usize| base_size + usize::from(index < remainder);
    let fold_start = (0..fold_index).map(|index| fold_size(index)).sum::<usize>();

    // rotate the chosen fold to the front so the partition helper can peel it off
    order.rotate_left(fold_start);
    Ok(partition_by_order(features, &order, fold_size(fold_index)))
}

fn partition_by_order(
    features: Vec<InputFeature>,
    order: &[usize],
    validation_size: usize,
) -> DatasetSplit {
    let mut slots = features.into_iter().map(Some).collect::<Vec<_>>();
    let mut validation = Vec::with_capacity(validation_size);
    let mut train = Vec::with_capacity(slots.len() - validation_size);
    for (position, index) in order.iter().enumerate() {
        let feature = slots[*index].take().expect("index visited twice");
        if position < validation_size {
            validation.push(feature);
        } else {
            train.push(feature);
        }
    }
    DatasetSplit { train, validation }
}

/// Duplicates minority-label train features (drawn with replacement, seeded)
/// until both labels are equally represented.
///
/// Only the train partition is extended, so oversampled duplicates can never
/// leak into validation. A train partition that is already balanced, or that
/// is missing one of the labels entirely, is left unchanged.
pub fn oversample_minority(split: &mut DatasetSplit, seed: u64) {
    let mut counts = [0usize; 2];
    for feature in &split.train {
        counts[feature.label as usize] += 1;
    }
    if counts[0] == 0 || counts[1] == 0 {
        log::warn!("Train partition is missing one label entirely, skipping oversampling");
        return;
    }
    if counts[0] == counts[1] {
        return;
    }

    let minority_label = if counts[0] < counts[1] { 0i64 } else { 1i64 };
    let deficit = counts[0].max(counts[1]) - counts[0].min(counts[1]);
    let minority_indices = split
        .train
        .iter()
        .enumerate()
        .filter(|(_, feature)| feature.label == minority_label)
        .map(|(index, _)| index)
        .collect::<Vec<usize>>();

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..deficit {
        let index = minority_indices[rng.gen_range(0..minority_indices.len())];
        let duplicate = split.train[index].clone();
        split.train.push(duplicate);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn feature(marker: i64, label: i64) -> InputFeature {
        InputFeature {
            input_ids: vec![marker],
            attention_mask: vec![1],
            label,
        }
    }

    fn corpus(size: usize) -> Vec<InputFeature> {
        (0..size)
            .map(|index| feature(index as i64, (index % 2) as i64))
            .collect()
    }

    #[test]
    fn split_is_deterministic_for_a_fixed_seed() {
        let first = train_validation_split(corpus(25), 0.2, 2020).unwrap();
        let second = train_validation_split(corpus(25), 0.2, 2020).unwrap();
        assert_eq!(first.train, second.train);
        assert_eq!(first.validation, second.validation);
    }

    #[test]
    fn split_partitions_are_disjoint_and_exhaustive() {
        let split = train_validation_split(corpus(25), 0.2, 2020).unwrap();
        assert_eq!(split.validation.len(), 5);
        assert_eq!(split.train.len(), 20);
        let mut markers = split
            .train
            .iter()
            .chain(&split.validation)
            .map(|feature| feature.input_ids[0])
            .collect::<Vec<i64>>();
        markers.sort_unstable();
        assert_eq!(markers, (0..25).collect::<Vec<i64>>());
    }

    #[test]
    fn split_rejects_degenerate_fractions() {
        assert!(train_validation_split(corpus(10), 0.0, 1).is_err());
        assert!(train_validation_split(corpus(10), 1.0, 1).is_err());
    }

    #[test]
    fn kfold_visits_every_example_exactly_once() {
        let mut seen = Vec::new();
        for fold_index in 0..5 {
            let split = kfold_split(corpus(23), 5, fold_index, 7).unwrap();
            assert_eq!(split.train.len() + split.validation.len(), 23);
            seen.extend(split.validation.iter().map(|feature| feature.input_ids[0]));
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<i64>>());
    }

    #[test]
    fn kfold_rejects_out_of_range_indices() {
        assert!(kfold_split(corpus(10), 5, 5, 7).is_err());
        assert!(kfold_split(corpus(10), 1, 0, 7).is_err());
    }

    #[test]
    fn oversampling_balances_train_without_touching_validation() {
        // 2 against / 8 favor in train, distinct markers in validation
        let mut train = vec![feature(100, 0), feature(101, 0)];
        train.extend((0..8).map(|marker| feature(marker, 1)));
        let validation = vec![feature(200, 0), feature(201, 1)];
        let mut split = DatasetSplit {
            train,
            validation: validation.clone(),
        };

        oversample_minority(&mut split, 3);

        let mut counts = [0usize; 2];
        for feature in &split.train {
            counts[feature.label as usize] += 1;
        }
        assert_eq!(counts[0], counts[1]);
        assert_eq!(split.train.len(), 16);
        assert_eq!(split.validation, validation);

        // every duplicate is a copy of a minority train feature
        for feature in &split.train[10..] {
            assert_eq!(feature.label, 0);
            assert!(feature.input_ids[0] == 100 || feature.input_ids[0] == 101);
        }
    }

    #[test]
    fn oversampling_is_a_no_op_on_balanced_data() {
        let mut split = DatasetSplit {
            train: vec![feature(0, 0), feature(1, 1), feature(2, 0), feature(3, 1)],
            validation: vec![feature(4, 0), feature(5, 1)],
        };
        let train_before = split.train.clone();
        oversample_minority(&mut split, 11);
        assert_eq!(split.train, train_before);
    }

    #[test]
    fn oversampling_skips_single_class_partitions() {
        let mut split = DatasetSplit {
            train: vec![feature(0, 1), feature(1, 1)],
            validation: vec![feature(2, 0)],
        };
        oversample_minority(&mut split, 5);
        assert_eq!(split.train.len(), 2);
    }
}
