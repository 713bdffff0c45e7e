use rust_bert::bert::BertConfig;
use rust_bert::pipelines::common::ModelType;
use rust_bert::resources::LocalResource;
use rust_stance::classification::{StanceClassifier, StanceConfig};
use rust_stance::dataset::{encode_examples, train_validation_split, StanceExample};
use rust_stance::evaluation::evaluate;
use rust_stance::training::{StanceTrainer, TrainerConfig};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tch::Device;

const MAX_LENGTH: usize = 16;

fn write_fixture(dir: &Path) -> anyhow::Result<()> {
    let mut vocab_file = File::create(dir.join("vocab.txt"))?;
    write!(
        vocab_file,
        "[PAD]\n[UNK]\n[CLS]\n[SEP]\n[MASK]\nhello\nworld\nvaccines\nare\nsafe\n"
    )?;

    let mut model_config = BertConfig::default();
    model_config.vocab_size = 10;
    model_config.hidden_size = 16;
    model_config.num_attention_heads = 2;
    model_config.num_hidden_layers = 1;
    model_config.intermediate_size = 32;
    model_config.max_position_embeddings = 32;
    serde_json::to_writer(File::create(dir.join("config.json"))?, &model_config)?;
    Ok(())
}

fn tiny_classifier(dir: &Path) -> Result<StanceClassifier, rust_stance::StanceError> {
    let mut config = StanceConfig::new(
        ModelType::Bert,
        None,
        LocalResource {
            local_path: dir.join("config.json"),
        },
        LocalResource {
            local_path: dir.join("vocab.txt"),
        },
        None,
    );
    config.device = Device::Cpu;
    config.max_length = MAX_LENGTH;
    StanceClassifier::new(config)
}

fn synthetic_corpus() -> Vec<StanceExample> {
    let sentences = [
        "vaccines are safe",
        "hello world",
        "vaccines are hello",
        "world hello world",
        "safe safe safe",
        "hello hello",
        "are vaccines safe",
        "world world",
        "vaccines safe",
        "hello world hello",
        "safe vaccines are safe",
        "world",
    ];
    sentences
        .iter()
        .enumerate()
        .map(|(index, sentence)| StanceExample {
            sentence: sentence.to_string(),
            label: (index % 2) as i64,
        })
        .collect()
}

#[test]
fn fine_tunes_a_tiny_model_end_to_end() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_fixture(dir.path())?;
    let classifier = tiny_classifier(dir.path())?;

    let examples = synthetic_corpus();
    let features = encode_examples(classifier.get_tokenizer(), &examples, MAX_LENGTH)?;
    for feature in &features {
        assert_eq!(feature.input_ids.len(), MAX_LENGTH);
    }
    let dataset = train_validation_split(features, 0.25, 2020)?;

    let trainer_config = TrainerConfig {
        num_epochs: 2,
        batch_size: 4,
        seeds: vec![42],
        ..Default::default()
    };
    let trainer = StanceTrainer::new(trainer_config)?;
    let report = trainer.train(&classifier, &dataset, 42)?;

    assert_eq!(report.epochs.len(), 2);
    for epoch in &report.epochs {
        assert!(epoch.train_loss.is_finite());
        assert!(epoch.validation.batches > 0);
        assert!((0.0..=1.0).contains(&epoch.validation.accuracy));
        assert!((-1.0..=1.0).contains(&epoch.validation.matthews));
    }

    let validation = evaluate(&classifier, &dataset.validation, 4)?;
    assert_eq!(validation.batches, 1);
    Ok(())
}

#[test]
fn saved_snapshots_reload_with_identical_predictions() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_fixture(dir.path())?;
    let classifier = tiny_classifier(dir.path())?;

    let inputs = ["vaccines are safe", "hello world"];
    let before = classifier.predict(inputs)?;
    assert_eq!(before.len(), 2);
    for prediction in &before {
        assert!(prediction.score > 0.0 && prediction.score <= 1.0);
        assert!(["AGAINST", "FAVOR"].contains(&prediction.label.as_str()));
    }

    let snapshot = dir.path().join("snapshot");
    classifier.save(&snapshot)?;

    let mut reload_config = StanceConfig::from_dir(&snapshot, ModelType::Bert, Device::Cpu);
    reload_config.max_length = MAX_LENGTH;
    let reloaded = StanceClassifier::new(reload_config)?;
    let after = reloaded.predict(inputs)?;

    for (before, after) in before.iter().zip(&after) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.label, after.label);
        assert!((before.score - after.score).abs() < 1e-6);
    }
    Ok(())
}

#[test]
fn seed_sweep_aggregates_across_runs() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_fixture(dir.path())?;

    let examples = synthetic_corpus();
    let probe = tiny_classifier(dir.path())?;
    let features = encode_examples(probe.get_tokenizer(), &examples, MAX_LENGTH)?;
    let dataset = train_validation_split(features, 0.25, 2020)?;

    let trainer_config = TrainerConfig {
        num_epochs: 1,
        batch_size: 4,
        seeds: vec![42, 60],
        ..Default::default()
    };
    let trainer = StanceTrainer::new(trainer_config)?;
    let outcome = trainer.sweep(&dataset, || tiny_classifier(dir.path()))?;

    assert_eq!(outcome.runs.len(), 2);
    assert_eq!(outcome.summary.runs, 2);
    assert!((0.0..=1.0).contains(&outcome.summary.accuracy_mean));
    assert!(outcome.summary.accuracy_std >= 0.0);
    Ok(())
}
