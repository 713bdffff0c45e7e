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

use crate::common::error::StanceError;
use crate::dataset::encoding::InputFeature;
use rand::seq::SliceRandom;
use rand::Rng;
use tch::{Device, Tensor};

/// A fixed-size group of encoded examples bundled as three aligned tensors.
///
/// Batches are ephemeral views over the dataset: the training iterator
/// rebuilds them every epoch, the validation iterator once.
#[derive(Debug)]
pub struct FeatureBatch {
    /// Token ids, shape (batch size, max length)
    pub input_ids: Tensor,
    /// Attention masks, shape (batch size, max length)
    pub attention_mask: Tensor,
    /// Labels, shape (batch size)
    pub labels: Tensor,
}

impl FeatureBatch {
    fn from_features(features: &[InputFeature], order: &[usize]) -> FeatureBatch {
        let input_ids = order
            .iter()
            .map(|index| Tensor::from_slice(&features[*index].input_ids))
            .collect::<Vec<Tensor>>();
        let attention_mask = order
            .iter()
            .map(|index| Tensor::from_slice(&features[*index].attention_mask))
            .collect::<Vec<Tensor>>();
        let labels = order
            .iter()
            .map(|index| features[*index].label)
            .collect::<Vec<i64>>();
        FeatureBatch {
            input_ids: Tensor::stack(&input_ids, 0),
            attention_mask: Tensor::stack(&attention_mask, 0),
            labels: Tensor::from_slice(&labels),
        }
    }

    /// Copies the batch to the target device.
    pub fn to_device(&self, device: Device) -> FeatureBatch {
        FeatureBatch {
            input_ids: self.input_ids.to_device(device),
            attention_mask: self.attention_mask.to_device(device),
            labels: self.labels.to_device(device),
        }
    }

    /// Number of examples in the batch.
    pub fn size(&self) -> i64 {
        self.labels.size()[0]
    }
}

/// Wraps an encoded partition into batch iterators: shuffled for training,
/// sequential for validation.
pub struct FeatureBatcher<'a> {
    features: &'a [InputFeature],
    batch_size: usize,
}

impl<'a> FeatureBatcher<'a> {
    pub fn new(
        features: &'a [InputFeature],
        batch_size: usize,
    ) -> Result<FeatureBatcher<'a>, StanceError> {
        if batch_size == 0 {
            return Err(StanceError::InvalidConfigurationError(
                "Batch size must be at least 1".to_string(),
            ));
        }
        Ok(FeatureBatcher {
            features,
            batch_size,
        })
    }

    /// Number of batches per pass, the final batch possibly being smaller.
    pub fn num_batches(&self) -> usize {
        (self.features.len() + self.batch_size - 1) / self.batch_size
    }

    /// Batches in dataset order.
    pub fn sequential(&self) -> FeatureBatches<'a> {
        FeatureBatches {
            features: self.features,
            order: (0..self.features.len()).collect(),
            batch_size: self.batch_size,
            cursor: 0,
        }
    }

    /// Batches in a freshly shuffled order drawn from `rng`.
    pub fn shuffled<R: Rng>(&self, rng: &mut R) -> FeatureBatches<'a> {
        let mut order = (0..self.features.len()).collect::<Vec<usize>>();
        order.shuffle(rng);
        FeatureBatches {
            features: self.features,
            order,
            batch_size: self.batch_size,
            cursor: 0,
        }
    }
}

/// Iterator over `FeatureBatch`es, materializing tensors lazily per batch.
pub struct FeatureBatches<'a> {
    features: &'a [InputFeature],
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> Iterator for FeatureBatches<'a> {
    type Item = FeatureBatch;

    fn next(&mut self) -> Option<FeatureBatch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = FeatureBatch::from_features(self.features, &self.order[self.cursor..end]);
        self.cursor = end;
        Some(batch)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn features(size: usize) -> Vec<InputFeature> {
        (0..size)
            .map(|index| InputFeature {
                input_ids: vec![index as i64, 0, 0],
                attention_mask: vec![1, 0, 0],
                label: (index % 2) as i64,
            })
            .collect()
    }

    fn batch_markers(batch: &FeatureBatch) -> Vec<i64> {
        Vec::<i64>::try_from(&batch.input_ids.select(1, 0)).unwrap()
    }

    #[test]
    fn batches_have_aligned_shapes() {
        let features = features(5);
        let batcher = FeatureBatcher::new(&features, 2).unwrap();
        assert_eq!(batcher.num_batches(), 3);
        let sizes = batcher
            .sequential()
            .map(|batch| {
                assert_eq!(batch.input_ids.size(), batch.attention_mask.size());
                assert_eq!(batch.input_ids.size()[0], batch.labels.size()[0]);
                batch.size()
            })
            .collect::<Vec<i64>>();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn sequential_batches_preserve_dataset_order() {
        let features = features(6);
        let batcher = FeatureBatcher::new(&features, 4).unwrap();
        let markers = batcher
            .sequential()
            .flat_map(|batch| batch_markers(&batch))
            .collect::<Vec<i64>>();
        assert_eq!(markers, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn shuffled_batches_are_deterministic_per_seed() {
        let features = features(10);
        let batcher = FeatureBatcher::new(&features, 3).unwrap();
        let first = batcher
            .shuffled(&mut StdRng::seed_from_u64(42))
            .flat_map(|batch| batch_markers(&batch))
            .collect::<Vec<i64>>();
        let second = batcher
            .shuffled(&mut StdRng::seed_from_u64(42))
            .flat_map(|batch| batch_markers(&batch))
            .collect::<Vec<i64>>();
        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<i64>>());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let features = features(3);
        assert!(FeatureBatcher::new(&features, 0).is_err());
    }
}
