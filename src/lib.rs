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

//! # Fine-tuning pipeline for transformer-based stance classification
//!
//! This crate fine-tunes pretrained transformer encoders (BERT, RoBERTa) on
//! binary sentence classification tasks such as vaccine-stance annotation,
//! following the standard fine-tuning recipe: load a labeled CSV corpus,
//! tokenize and pad, split into train/validation partitions, fine-tune with
//! AdamW under a linear learning-rate schedule, evaluate (accuracy, F1,
//! Matthews correlation) and save the resulting model.
//!
//! Tokenization, model architectures and automatic differentiation are
//! provided by the [rust-bert](https://docs.rs/rust-bert),
//! [rust_tokenizers](https://docs.rs/rust_tokenizers) and
//! [tch](https://docs.rs/tch) crates; this crate owns the data preparation,
//! the training loop, the evaluation routine and model persistence.
//!
//! # Quick start
//!
//! ```no_run
//! use rust_stance::classification::{StanceClassifier, StanceConfig};
//! use rust_stance::dataset::{
//!     encode_examples, read_stance_csv, train_validation_split, CsvFormat,
//! };
//! use rust_stance::training::{StanceTrainer, TrainerConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let classifier = StanceClassifier::new(StanceConfig::default())?;
//!     let examples = read_stance_csv("attitude_annotation_labels.csv", &CsvFormat::default())?;
//!     let features =
//!         encode_examples(classifier.get_tokenizer(), &examples, classifier.max_length())?;
//!     let dataset = train_validation_split(features, 0.2, 2020)?;
//!
//!     let trainer = StanceTrainer::new(TrainerConfig::default())?;
//!     let report = trainer.train(&classifier, &dataset, 42)?;
//!     for epoch in &report.epochs {
//!         println!("epoch {}: {}", epoch.epoch, epoch.validation);
//!     }
//!     classifier.save("model_save")?;
//!     Ok(())
//! }
//! ```
//!
//! Multi-seed sweeps for variance estimation are available through
//! `StanceTrainer::sweep`, k-fold validation and minority-class oversampling
//! through the `dataset` module.
//!
//! Loading pretrained weights requires the conversion of the standard
//! Transformers `.bin` files to the C-array `.ot` format; converted weights
//! for the default resources are downloaded and cached automatically.

pub mod classification;
pub mod common;
pub mod dataset;
pub mod evaluation;
pub mod training;

pub use common::error::StanceError;
