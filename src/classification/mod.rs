//! # Stance classification model
//!
//! A transformer encoder (BERT or RoBERTa) with a binary sequence
//! classification head, set up for fine-tuning: pretrained encoder weights
//! are loaded partially and the classification head keeps its fresh
//! initialization until trained.
//!
//! All models expect the following resources:
//! - Configuration file expected to have a structure following the [Transformers library](https://github.com/huggingface/transformers)
//! - Model weights are expected to have a structure and parameter names following the [Transformers library](https://github.com/huggingface/transformers). A conversion using the Python utility scripts is required to convert the `.bin` weights to the `.ot` format.
//! - Vocabulary (and merges for BPE-based tokenizers) matching the model architecture
//!
//! Pretrained models are available and can be downloaded using RemoteResources;
//! `StanceConfig::default()` targets `bert-base-uncased`.

mod stance_model;

pub use stance_model::{
    StanceClassifier, StanceConfig, StanceModelOption, StancePrediction, CONFIG_FILE, MERGES_FILE,
    STANCE_LABELS, WEIGHTS_FILE,
};
