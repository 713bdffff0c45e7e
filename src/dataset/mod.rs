//! # Dataset loading and preparation
//!
//! Turns an annotated CSV corpus into the fixed-length tensor batches
//! consumed by the classifier:
//! - corpus reading and label validation: `corpus::read_stance_csv`
//! - tokenization, truncation and padding: `encoding::encode_examples`
//! - seeded train/validation partitioning, k-fold selection and minority
//!   oversampling: `split`
//! - shuffled / sequential batch iteration: `batching::FeatureBatcher`
//!
//! Partitions are created once per run and are immutable thereafter; batches
//! are ephemeral views rebuilt every epoch (training) or once (validation).

mod batching;
mod corpus;
mod encoding;
mod split;

pub use batching::{FeatureBatch, FeatureBatcher, FeatureBatches};
pub use corpus::{label_distribution, read_stance_csv, CsvFormat, StanceExample};
pub use encoding::{encode_examples, encode_sentences, InputFeature};
pub use split::{kfold_split, oversample_minority, train_validation_split, DatasetSplit};
