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
use crate::dataset::corpus::StanceExample;
use rust_bert::pipelines::common::TokenizerOption;
use rust_tokenizers::tokenizer::TruncationStrategy;

/// An example encoded to the fixed-length representation consumed by the
/// model: token ids padded/truncated to the configured maximum length, an
/// attention mask of identical length (1 at real-token positions, 0 at
/// padding) and the label.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFeature {
    /// Token ids, always exactly `max_len` long
    pub input_ids: Vec<i64>,
    /// Attention mask aligned with `input_ids`
    pub attention_mask: Vec<i64>,
    /// Binary stance label
    pub label: i64,
}

/// Encodes raw examples into fixed-length `InputFeature`s.
///
/// The tokenizer adds the model's boundary markers and truncates sequences
/// longer than `max_len`; shorter sequences are right-padded with the
/// tokenizer's padding id. An empty sentence encodes to the boundary markers
/// alone, followed by padding.
///
/// The attention mask is derived from the sequence length before padding
/// rather than from a padding-id comparison: RoBERTa pads with id 1, so a
/// `id > 0` test would mark its padding as real tokens.
///
/// # Arguments
///
/// * `tokenizer` - `TokenizerOption` matching the target model.
/// * `examples` - raw annotated sentences.
/// * `max_len` - fixed output length (boundary markers included).
///
/// # Returns
///
/// * `Vec<InputFeature>` with `input_ids.len() == max_len` for every entry.
pub fn encode_examples(
    tokenizer: &TokenizerOption,
    examples: &[StanceExample],
    max_len: usize,
) -> Result<Vec<InputFeature>, StanceError> {
    let texts = examples
        .iter()
        .map(|example| example.sentence.as_str())
        .collect::<Vec<&str>>();
    let mut features = encode_sentences(tokenizer, &texts, max_len)?;
    for (feature, example) in features.iter_mut().zip(examples) {
        feature.label = example.label;
    }
    Ok(features)
}

/// Encodes bare sentences for inference. Labels are set to 0 and ignored by
/// logit-only consumers.
pub fn encode_sentences(
    tokenizer: &TokenizerOption,
    sentences: &[&str],
    max_len: usize,
) -> Result<Vec<InputFeature>, StanceError> {
    let tokenized = tokenizer.encode_list(sentences, max_len, &TruncationStrategy::LongestFirst, 0);
    let pad_id = tokenizer.get_pad_id().ok_or_else(|| {
        StanceError::InvalidConfigurationError(
            "Only tokenizers with a padding id can be used for stance classification".to_string(),
        )
    })?;

    let mut features = Vec::with_capacity(sentences.len());
    for tokenized_input in tokenized {
        let mut input_ids = tokenized_input.token_ids;
        let sequence_length = input_ids.len();
        input_ids.resize(max_len, pad_id);
        let mut attention_mask = vec![1i64; sequence_length];
        attention_mask.resize(max_len, 0);
        features.push(InputFeature {
            input_ids,
            attention_mask,
            label: 0,
        });
    }
    Ok(features)
}
