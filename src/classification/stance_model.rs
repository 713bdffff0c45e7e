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
use crate::dataset::{encode_sentences, FeatureBatch, FeatureBatcher};
use rust_bert::bert::{
    BertConfig, BertConfigResources, BertForSequenceClassification, BertModelResources,
    BertVocabResources,
};
use rust_bert::pipelines::common::{ModelType, TokenizerOption};
use rust_bert::resources::{LocalResource, RemoteResource, ResourceProvider};
use rust_bert::roberta::RobertaForSequenceClassification;
use rust_bert::Config;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tch::{nn, no_grad, Device, Kind, Tensor};

/// Weights file name inside a saved snapshot directory
pub const WEIGHTS_FILE: &str = "rust_model.ot";
/// Model configuration file name inside a saved snapshot directory
pub const CONFIG_FILE: &str = "config.json";
/// Merges file name inside a saved snapshot directory (BPE tokenizers)
pub const MERGES_FILE: &str = "merges.txt";

/// Default label names written into configurations that carry none
pub const STANCE_LABELS: [&str; 2] = ["AGAINST", "FAVOR"];

const DEFAULT_MAX_LENGTH: usize = 256;
const PREDICT_BATCH_SIZE: usize = 64;

fn vocab_file_name(model_type: ModelType) -> &'static str {
    match model_type {
        ModelType::Roberta => "vocab.json",
        _ => "vocab.txt",
    }
}

/// # Configuration for a stance classifier
///
/// Resource-based configuration in the pipeline style: weights, model
/// configuration and vocabulary are referenced through `ResourceProvider`s
/// and can point to remote pretrained files or a local snapshot.
pub struct StanceConfig {
    /// Model type (`Bert` or `Roberta`)
    pub model_type: ModelType,
    /// Pretrained weights resource. `None` starts from random initialization.
    pub model_weights_resource: Option<Box<dyn ResourceProvider + Send>>,
    /// Model configuration resource (expected to follow the Transformers library structure)
    pub config_resource: Box<dyn ResourceProvider + Send>,
    /// Vocabulary resource
    pub vocab_resource: Box<dyn ResourceProvider + Send>,
    /// Merges resource (BPE tokenizers only)
    pub merges_resource: Option<Box<dyn ResourceProvider + Send>>,
    /// Lower-case all input before tokenization
    pub lower_case: bool,
    /// Strip accents (BERT-style tokenizers)
    pub strip_accents: Option<bool>,
    /// Add an initial space before tokenization (BPE tokenizers)
    pub add_prefix_space: Option<bool>,
    /// Fixed encoded sequence length (boundary markers included)
    pub max_length: usize,
    /// Device placement for the model
    pub device: Device,
}

impl StanceConfig {
    /// Instantiate a new stance classifier configuration.
    ///
    /// # Arguments
    ///
    /// * `model_type` - `ModelType` indicating the model architecture
    /// * `model_weights_resource` - `Option<ResourceProvider>` pointing to the pretrained weights
    /// * `config_resource` - `ResourceProvider` pointing to the model configuration
    /// * `vocab_resource` - `ResourceProvider` pointing to the tokenizer vocabulary
    /// * `merges_resource` - Optional `ResourceProvider` pointing to the tokenizer merges
    pub fn new<RC, RV>(
        model_type: ModelType,
        model_weights_resource: Option<Box<dyn ResourceProvider + Send>>,
        config_resource: RC,
        vocab_resource: RV,
        merges_resource: Option<Box<dyn ResourceProvider + Send>>,
    ) -> StanceConfig
    where
        RC: ResourceProvider + Send + 'static,
        RV: ResourceProvider + Send + 'static,
    {
        StanceConfig {
            model_type,
            model_weights_resource,
            config_resource: Box::new(config_resource),
            vocab_resource: Box::new(vocab_resource),
            merges_resource,
            lower_case: matches!(model_type, ModelType::Bert),
            strip_accents: None,
            add_prefix_space: None,
            max_length: DEFAULT_MAX_LENGTH,
            device: Device::cuda_if_available(),
        }
    }

    /// Configuration pointing at a snapshot directory written by
    /// `StanceClassifier::save`.
    pub fn from_dir<P: AsRef<Path>>(dir: P, model_type: ModelType, device: Device) -> StanceConfig {
        let dir = dir.as_ref();
        let merges_resource: Option<Box<dyn ResourceProvider + Send>> = match model_type {
            ModelType::Roberta => Some(Box::new(LocalResource {
                local_path: dir.join(MERGES_FILE),
            })),
            _ => None,
        };
        let mut config = StanceConfig::new(
            model_type,
            Some(Box::new(LocalResource {
                local_path: dir.join(WEIGHTS_FILE),
            })),
            LocalResource {
                local_path: dir.join(CONFIG_FILE),
            },
            LocalResource {
                local_path: dir.join(vocab_file_name(model_type)),
            },
            merges_resource,
        );
        config.device = device;
        config
    }
}

impl Default for StanceConfig {
    /// Provides a configuration fine-tuning `bert-base-uncased`
    fn default() -> StanceConfig {
        StanceConfig::new(
            ModelType::Bert,
            Some(Box::new(RemoteResource::from_pretrained(
                BertModelResources::BERT,
            ))),
            RemoteResource::from_pretrained(BertConfigResources::BERT),
            RemoteResource::from_pretrained(BertVocabResources::BERT),
            None,
        )
    }
}

/// # Abstraction over the supported sequence classification heads
pub enum StanceModelOption {
    /// BERT with a sequence classification head
    Bert(BertForSequenceClassification),
    /// RoBERTa with a sequence classification head
    Roberta(RobertaForSequenceClassification),
}

impl StanceModelOption {
    pub fn new(
        model_type: ModelType,
        p: &nn::Path,
        config: &BertConfig,
    ) -> Result<Self, StanceError> {
        match model_type {
            ModelType::Bert => Ok(StanceModelOption::Bert(BertForSequenceClassification::new(
                p, config,
            )?)),
            ModelType::Roberta => Ok(StanceModelOption::Roberta(
                RobertaForSequenceClassification::new(p, config)?,
            )),
            _ => Err(StanceError::InvalidConfigurationError(format!(
                "Stance classification is not implemented for {:?}",
                model_type
            ))),
        }
    }

    /// Returns the model type
    pub fn model_type(&self) -> ModelType {
        match *self {
            StanceModelOption::Bert(_) => ModelType::Bert,
            StanceModelOption::Roberta(_) => ModelType::Roberta,
        }
    }

    /// Interface method to forward_t() of the particular model
    pub fn forward_t(
        &self,
        input_ids: Option<&Tensor>,
        mask: Option<&Tensor>,
        train: bool,
    ) -> Tensor {
        match *self {
            StanceModelOption::Bert(ref model) => {
                model
                    .forward_t(input_ids, mask, None, None, None, train)
                    .logits
            }
            StanceModelOption::Roberta(ref model) => {
                model
                    .forward_t(input_ids, mask, None, None, None, train)
                    .logits
            }
        }
    }
}

/// Stance predicted for a single sentence.
#[derive(Debug, Clone)]
pub struct StancePrediction {
    /// Predicted label name
    pub label: String,
    /// Predicted label id
    pub id: i64,
    /// Softmax score of the predicted label
    pub score: f64,
    /// Index of the sentence in the input
    pub sentence: usize,
}

/// # Transformer model with a binary stance classification head
///
/// Wraps the tokenizer, the model configuration and the classification model
/// in a single fine-tunable unit. Pretrained encoder weights are loaded
/// partially: variables absent from the weights file (the classification
/// head) keep their fresh initialization.
pub struct StanceClassifier {
    tokenizer: TokenizerOption,
    model: StanceModelOption,
    var_store: nn::VarStore,
    model_config: BertConfig,
    label_mapping: HashMap<i64, String>,
    max_length: usize,
    vocab_path: PathBuf,
    merges_path: Option<PathBuf>,
}

impl StanceClassifier {
    /// Build a new `StanceClassifier`
    ///
    /// # Arguments
    ///
    /// * `config` - `StanceConfig` object containing the resource references
    ///   (model, vocabulary, configuration) and device placement (CPU/GPU)
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use rust_stance::classification::StanceClassifier;
    ///
    /// let classifier = StanceClassifier::new(Default::default())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: StanceConfig) -> Result<StanceClassifier, StanceError> {
        let vocab_path = config.vocab_resource.get_local_path()?;
        let merges_path = config
            .merges_resource
            .as_ref()
            .map(|resource| resource.get_local_path())
            .transpose()?;

        let tokenizer = TokenizerOption::from_file(
            config.model_type,
            vocab_path.to_str().unwrap(),
            merges_path.as_deref().map(|path| path.to_str().unwrap()),
            config.lower_case,
            config.strip_accents,
            config.add_prefix_space,
        )?;
        Self::new_with_tokenizer(config, tokenizer)
    }

    /// Build a new `StanceClassifier` with a provided tokenizer.
    pub fn new_with_tokenizer(
        config: StanceConfig,
        tokenizer: TokenizerOption,
    ) -> Result<StanceClassifier, StanceError> {
        let config_path = config.config_resource.get_local_path()?;
        let mut model_config = BertConfig::from_file(config_path);
        let label_mapping = binary_label_mapping(&mut model_config)?;

        if config.max_length > model_config.max_position_embeddings as usize {
            return Err(StanceError::InvalidConfigurationError(format!(
                "Maximum length {} exceeds the model's {} position embeddings",
                config.max_length, model_config.max_position_embeddings
            )));
        }

        let mut var_store = nn::VarStore::new(config.device);
        let model = StanceModelOption::new(config.model_type, &var_store.root(), &model_config)?;

        match &config.model_weights_resource {
            Some(weights_resource) => {
                let weights_path = weights_resource.get_local_path()?;
                let missing = var_store.load_partial(weights_path)?;
                if !missing.is_empty() {
                    log::info!(
                        "{} variables have no pretrained value and keep their fresh initialization",
                        missing.len()
                    );
                    log::debug!("Freshly initialized variables: {:?}", missing);
                }
            }
            None => {
                log::warn!("No weights resource provided, the model starts from random initialization");
            }
        }

        let vocab_path = config.vocab_resource.get_local_path()?;
        let merges_path = config
            .merges_resource
            .as_ref()
            .map(|resource| resource.get_local_path())
            .transpose()?;

        Ok(StanceClassifier {
            tokenizer,
            model,
            var_store,
            model_config,
            label_mapping,
            max_length: config.max_length,
            vocab_path,
            merges_path,
        })
    }

    /// Get a reference to the classifier tokenizer.
    pub fn get_tokenizer(&self) -> &TokenizerOption {
        &self.tokenizer
    }

    /// Variable store holding the trainable parameters.
    pub fn var_store(&self) -> &nn::VarStore {
        &self.var_store
    }

    /// Device the model lives on.
    pub fn device(&self) -> Device {
        self.var_store.device()
    }

    /// Label id to label name mapping.
    pub fn label_mapping(&self) -> &HashMap<i64, String> {
        &self.label_mapping
    }

    /// Fixed encoded sequence length.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Training-mode forward pass returning the mean cross-entropy loss of
    /// the batch, conditioned on the batch labels.
    pub fn forward_loss(&self, batch: &FeatureBatch) -> Tensor {
        let logits = self.forward_logits(batch, true);
        logits.cross_entropy_for_logits(&batch.labels)
    }

    /// Forward pass returning per-example class logits.
    pub fn forward_logits(&self, batch: &FeatureBatch, train: bool) -> Tensor {
        self.model
            .forward_t(Some(&batch.input_ids), Some(&batch.attention_mask), train)
    }

    /// Predict the stance of sentences.
    ///
    /// Runs in inference mode with gradient tracking disabled; the predicted
    /// class is the argmax of the softmax scores.
    ///
    /// # Arguments
    ///
    /// * `input` - `&[&str]` Array of sentences to classify.
    ///
    /// # Returns
    ///
    /// * `Vec<StancePrediction>` Predictions, one per input sentence.
    pub fn predict<'a, S>(&self, input: S) -> Result<Vec<StancePrediction>, StanceError>
    where
        S: AsRef<[&'a str]>,
    {
        let features = encode_sentences(&self.tokenizer, input.as_ref(), self.max_length)?;
        let batcher = FeatureBatcher::new(&features, PREDICT_BATCH_SIZE)?;
        let mut predictions = Vec::with_capacity(features.len());
        for batch in batcher.sequential() {
            let batch = batch.to_device(self.device());
            let scores = no_grad(|| self.forward_logits(&batch, false)).softmax(-1, Kind::Float);
            let best = scores.argmax(-1, false);
            let label_ids = Vec::<i64>::try_from(&best.to_device(Device::Cpu))?;
            for (offset, label_id) in label_ids.into_iter().enumerate() {
                let score = scores.double_value(&[offset as i64, label_id]);
                let label = self
                    .label_mapping
                    .get(&label_id)
                    .cloned()
                    .unwrap_or_else(|| format!("LABEL_{}", label_id));
                predictions.push(StancePrediction {
                    label,
                    id: label_id,
                    score,
                    sentence: predictions.len(),
                });
            }
        }
        Ok(predictions)
    }

    /// Save the model weights, model configuration and tokenizer files to a
    /// snapshot directory readable by `StanceConfig::from_dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<(), StanceError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        self.var_store.save(dir.join(WEIGHTS_FILE))?;
        let config_file = fs::File::create(dir.join(CONFIG_FILE))?;
        serde_json::to_writer_pretty(config_file, &self.model_config)?;
        fs::copy(
            &self.vocab_path,
            dir.join(vocab_file_name(self.model.model_type())),
        )?;
        if let Some(merges_path) = &self.merges_path {
            fs::copy(merges_path, dir.join(MERGES_FILE))?;
        }
        log::info!("Model snapshot saved to {:?}", dir);
        Ok(())
    }
}

/// Forces a binary label mapping on the configuration: a missing or empty
/// `id2label` gets the default stance labels, anything other than two labels
/// is rejected.
fn binary_label_mapping(config: &mut BertConfig) -> Result<HashMap<i64, String>, StanceError> {
    let mapping = match &config.id2label {
        Some(mapping) if !mapping.is_empty() => {
            if mapping.len() != 2 {
                return Err(StanceError::InvalidConfigurationError(format!(
                    "Stance classification is binary but the configuration defines {} labels",
                    mapping.len()
                )));
            }
            mapping.clone()
        }
        _ => {
            let mut mapping = HashMap::new();
            for (id, label) in STANCE_LABELS.iter().enumerate() {
                mapping.insert(id as i64, label.to_string());
            }
            mapping
        }
    };
    config.id2label = Some(mapping.clone());
    config.label2id = Some(
        mapping
            .iter()
            .map(|(id, label)| (label.clone(), *id))
            .collect(),
    );
    Ok(mapping)
}
