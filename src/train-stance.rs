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

//! End-to-end fine-tuning job: reads the annotated corpus, fine-tunes
//! `bert-base-uncased` under the configured seed sweep, prints the
//! cross-seed aggregate and saves the final model.
//!
//! Paths come from the environment (`STANCE_DATA_PATH`, optional
//! `STANCE_OUTPUT_DIR`); hyperparameters are the constants below.

use log::LevelFilter;
use rust_bert::bert::BertVocabResources;
use rust_bert::pipelines::common::{ModelType, TokenizerOption};
use rust_bert::resources::{RemoteResource, ResourceProvider};
use rust_stance::classification::{StanceClassifier, StanceConfig};
use rust_stance::dataset::{
    encode_examples, label_distribution, oversample_minority, read_stance_csv,
    train_validation_split, CsvFormat,
};
use rust_stance::training::{StanceTrainer, TrainerConfig};
use rust_stance::StanceError;
use std::env;
use std::path::PathBuf;
use tch::Device;

const MAX_LENGTH: usize = 256;
const VALIDATION_FRACTION: f64 = 0.2;
const SPLIT_SEED: u64 = 2020;
const OVERSAMPLE: bool = false;
const LABEL_COLUMN: &str = "Best_label_attitude";

fn main() -> Result<(), StanceError> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .init();

    let data_path = PathBuf::from(env::var("STANCE_DATA_PATH").expect(
        "Please set the \"STANCE_DATA_PATH\" environment variable pointing to the annotated stance CSV file",
    ));
    let output_dir = env::var("STANCE_OUTPUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
            dir.push("rust-stance");
            dir.push("model_save");
            dir
        });

    let device = Device::cuda_if_available();
    if device.is_cuda() {
        log::info!("Using the GPU");
    } else {
        log::info!("No GPU available, using the CPU instead");
    }

    //    Load the corpus
    let format = CsvFormat {
        label_column: LABEL_COLUMN.to_string(),
        ..Default::default()
    };
    let examples = read_stance_csv(&data_path, &format)?;
    let counts = label_distribution(&examples);
    println!(
        "Number of annotated sentences: {} ({} against, {} favor)",
        examples.len(),
        counts[0],
        counts[1]
    );

    //    Tokenize, encode and split
    let vocab_resource = RemoteResource::from_pretrained(BertVocabResources::BERT);
    let tokenizer = TokenizerOption::from_file(
        ModelType::Bert,
        vocab_resource.get_local_path()?.to_str().unwrap(),
        None,
        true,
        None,
        None,
    )?;
    let features = encode_examples(&tokenizer, &examples, MAX_LENGTH)?;
    let mut dataset = train_validation_split(features, VALIDATION_FRACTION, SPLIT_SEED)?;
    if OVERSAMPLE {
        oversample_minority(&mut dataset, SPLIT_SEED);
    }
    println!(
        "{} training examples, {} validation examples",
        dataset.train.len(),
        dataset.validation.len()
    );

    //    Fine-tune under the seed sweep
    let trainer = StanceTrainer::new(TrainerConfig::default())?;
    let outcome = trainer.sweep(&dataset, || {
        let mut config = StanceConfig::default();
        config.device = device;
        config.max_length = MAX_LENGTH;
        StanceClassifier::new(config)
    })?;

    println!("Aggregate over seeds: {}", outcome.summary);
    for run in &outcome.runs {
        if let Some(validation) = run.final_validation() {
            println!("  seed {:>4}: {}", run.seed, validation);
        }
    }

    //    Persist and verify the snapshot round-trip
    outcome.classifier.save(&output_dir)?;
    println!("Model saved to {:?}", output_dir);

    let reloaded = StanceClassifier::new(StanceConfig::from_dir(
        &output_dir,
        ModelType::Bert,
        device,
    ))?;
    let sample = "I got my shot and encourage everyone to do the same";
    let predictions = reloaded.predict([sample])?;
    println!(
        "{} -> {} ({:.3})",
        sample, predictions[0].label, predictions[0].score
    );

    Ok(())
}
