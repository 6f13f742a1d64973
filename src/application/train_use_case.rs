// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load JSONL corpora           (Layer 4 - data)
//   Step 2: Load the lemma → frames table (Layer 3 - domain)
//   Step 3: Build tokenizer              (Layer 6 - infra)
//   Step 4: Build label vocabulary       (Layer 4 - data)
//   Step 5: Encode samples               (Layer 4 - data)
//   Step 6: Split train/validation       (Layer 4 - data)
//   Step 7: Save config + vocabulary     (Layer 6 - infra)
//   Step 8: Run training loop            (Layer 5 - ml)
//
// The vocabulary is built from training and validation
// instances together so every gold label has an index.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{build_samples, SrlDataset},
    loader::JsonlLoader,
    splitter::split_train_val,
    vocabulary::{Vocabulary, FRAMES, LABELS},
    wordpiece::WordpieceAligner,
};
use crate::domain::lemma_frames::{LemmaFrameTable, DEFAULT_LEMMA_FRAMES_PATH};
use crate::domain::srl_instance::SrlInstance;
use crate::domain::traits::InstanceSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::EpochMetrics,
    tokenizer_store::{embedding_size, TokenizerStore},
};
use crate::ml::encoder::EncoderConfig;
use crate::ml::model::SrlModelConfig;
use crate::ml::trainer::{run_training, TrainingContext};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters and paths for a training run.
// Saved next to the checkpoints so inference can rebuild the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_path:         String,
    pub validation_path:    Option<String>,
    pub checkpoint_dir:     String,
    pub lemma_frames_path:  String,
    /// HuggingFace tokenizer.json; a word-level one is built if absent
    pub tokenizer_path:     Option<String>,
    /// Model record whose encoder weights seed the new model
    pub encoder_init:       Option<String>,
    pub max_seq_len:        usize,
    pub batch_size:         usize,
    pub epochs:             usize,
    pub lr:                 f64,
    pub d_model:            usize,
    pub num_heads:          usize,
    pub num_layers:         usize,
    pub d_ff:               usize,
    pub dropout:            f64,
    pub embedding_dropout:  f64,
    pub label_smoothing:    Option<f64>,
    pub span_metric:        bool,
    pub ignore_span_metric: bool,
    pub vocab_size:         usize,
    /// Used only when no validation file is given
    pub train_fraction:     f64,
    pub seed:               u64,
    pub num_workers:        usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_path:         "data/train.jsonl".to_string(),
            validation_path:    None,
            checkpoint_dir:     "checkpoints".to_string(),
            lemma_frames_path:  DEFAULT_LEMMA_FRAMES_PATH.to_string(),
            tokenizer_path:     None,
            encoder_init:       None,
            max_seq_len:        512,
            batch_size:         8,
            epochs:             10,
            lr:                 5e-5,
            d_model:            256,
            num_heads:          8,
            num_layers:         6,
            d_ff:               1024,
            dropout:            0.1,
            embedding_dropout:  0.0,
            label_smoothing:    None,
            span_metric:        true,
            ignore_span_metric: false,
            vocab_size:         30522,
            train_fraction:     0.9,
            seed:               42,
            num_workers:        1,
        }
    }
}

impl TrainConfig {
    /// Model architecture for a tokenizer emitting ids below
    /// `token_vocab_size` and the label sets of `vocab`.
    pub fn model_config(&self, token_vocab_size: usize, vocab: &Vocabulary) -> SrlModelConfig {
        let encoder = EncoderConfig::new(token_vocab_size)
            .with_max_seq_len(self.max_seq_len)
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_num_layers(self.num_layers)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout);

        let mut model = SrlModelConfig::new(encoder, vocab.size(LABELS), vocab.size(FRAMES))
            .with_embedding_dropout(self.embedding_dropout);
        model.label_smoothing = self.label_smoothing;
        model
    }
}

/// Datasets and model inputs ready for the training loop.
pub struct PreparedTraining {
    pub context:       TrainingContext,
    pub train_dataset: SrlDataset,
    pub val_dataset:   SrlDataset,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        let prepared = self.prepare()?;
        run_training(
            &self.config,
            prepared.context,
            prepared.train_dataset,
            prepared.val_dataset,
        )
    }

    /// Steps 1 to 7: everything before the training loop.
    pub fn prepare(&self) -> Result<PreparedTraining> {
        let cfg = &self.config;

        // ── Step 1: Load corpora ──────────────────────────────────────────────
        let train_instances = labelled_only(
            JsonlLoader::new(&cfg.train_path).load_all()?,
            &cfg.train_path,
        );
        let val_instances = match &cfg.validation_path {
            Some(path) => labelled_only(JsonlLoader::new(path).load_all()?, path),
            None       => Vec::new(),
        };
        if train_instances.is_empty() {
            bail!("No labelled training instances found in '{}'", cfg.train_path);
        }

        // ── Step 2: Lemma → frames table ──────────────────────────────────────
        let lemma_frames = LemmaFrameTable::from_path(&cfg.lemma_frames_path)?;

        // ── Step 3: Build / load tokenizer ────────────────────────────────────
        let tok_store = TokenizerStore::new(&cfg.checkpoint_dir);
        let words = train_instances
            .iter()
            .flat_map(|inst| inst.words.iter().map(String::as_str));
        let tokenizer = tok_store.load_or_build(cfg.tokenizer_path.as_deref(), words, cfg.vocab_size)?;
        let token_vocab_size = embedding_size(&tokenizer);

        // ── Step 4: Label vocabulary ──────────────────────────────────────────
        let vocab = Vocabulary::from_instances(train_instances.iter().chain(&val_instances));
        if vocab.size(FRAMES) == 0 {
            bail!("The training data has no frame labels");
        }
        tracing::info!(
            "Vocabulary: {} role labels, {} frames",
            vocab.size(LABELS),
            vocab.size(FRAMES),
        );

        // ── Step 5: Encode samples ────────────────────────────────────────────
        let aligner = WordpieceAligner::new(tokenizer);
        let train_samples = build_samples(&train_instances, &aligner, &vocab, cfg.max_seq_len);
        let val_samples   = build_samples(&val_instances, &aligner, &vocab, cfg.max_seq_len);

        // ── Step 6: Train / validation split ──────────────────────────────────
        let (train_samples, val_samples) = if cfg.validation_path.is_some() {
            (train_samples, val_samples)
        } else {
            split_train_val(train_samples, cfg.train_fraction, cfg.seed)
        };
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );
        if train_samples.is_empty() {
            bail!("No trainable instances left after encoding");
        }

        // ── Step 7: Save config + vocabulary for inference ────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_vocabulary(&vocab)?;

        Ok(PreparedTraining {
            context: TrainingContext {
                model_config: cfg.model_config(token_vocab_size, &vocab),
                vocab,
                lemma_frames,
                ckpt_manager,
            },
            train_dataset: SrlDataset::new(train_samples),
            val_dataset:   SrlDataset::new(val_samples),
        })
    }
}

/// Drop instances without gold frame and tags; a batch needs every
/// example labelled to carry gold tensors.
fn labelled_only(instances: Vec<SrlInstance>, source: &str) -> Vec<SrlInstance> {
    let total = instances.len();
    let labelled: Vec<SrlInstance> = instances.into_iter().filter(SrlInstance::is_labelled).collect();
    if labelled.len() < total {
        tracing::warn!(
            "Dropped {} unlabelled instances from '{}'",
            total - labelled.len(),
            source,
        );
    }
    labelled
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CORPUS: &str = r#"{"words":["the","cat","ate","fish"],"lemma":"eat","verb_index":2,"frame":"Ingestion","tags":["B-ARG0","I-ARG0","B-V","B-ARG1"]}
{"words":["she","ran","home"],"lemma":"run","verb_index":1,"frame":"Self_motion","tags":["B-ARG0","B-V","B-ARGM-DIR"]}
{"words":["he","ran","the","shop"],"lemma":"run","verb_index":1,"frame":"Operating_a_system","tags":["B-ARG0","B-V","B-ARG1","I-ARG1"]}
{"words":["dogs","eat","bones"],"lemma":"eat","verb_index":1,"frame":"Ingestion","tags":["B-ARG0","B-V","B-ARG1"]}
"#;

    fn config(dir: &std::path::Path) -> TrainConfig {
        let train = dir.join("train.jsonl");
        let table = dir.join("lemma2frame.csv");
        fs::write(&train, CORPUS).unwrap();
        fs::write(&table, "eat Ingestion\nrun Self_motion Operating_a_system\n").unwrap();
        TrainConfig {
            train_path:        train.to_string_lossy().to_string(),
            checkpoint_dir:    dir.join("ckpt").to_string_lossy().to_string(),
            lemma_frames_path: table.to_string_lossy().to_string(),
            max_seq_len:       16,
            train_fraction:    0.5,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_prepare_splits_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let prepared = TrainUseCase::new(cfg.clone()).prepare().unwrap();

        use burn::data::dataset::Dataset;
        assert_eq!(prepared.train_dataset.len(), 2);
        assert_eq!(prepared.val_dataset.len(), 2);
        assert_eq!(prepared.context.model_config.num_frames, 3);
        assert_eq!(prepared.context.lemma_frames.candidates("run").len(), 2);

        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir).unwrap();
        assert_eq!(ckpt.load_config().unwrap().train_path, cfg.train_path);
        assert_eq!(ckpt.load_vocabulary().unwrap().size(FRAMES), 3);
        assert!(dir.path().join("ckpt").join("tokenizer.json").exists());
    }

    #[test]
    fn test_validation_file_disables_split() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        let val = dir.path().join("dev.jsonl");
        fs::write(
            &val,
            r#"{"words":["birds","fly"],"lemma":"fly","verb_index":1,"frame":"Motion","tags":["B-ARG0","B-V"]}"#,
        )
        .unwrap();
        cfg.validation_path = Some(val.to_string_lossy().to_string());

        let prepared = TrainUseCase::new(cfg).prepare().unwrap();
        use burn::data::dataset::Dataset;
        assert_eq!(prepared.train_dataset.len(), 4);
        assert_eq!(prepared.val_dataset.len(), 1);
        // validation-only frame is still indexed
        assert_eq!(prepared.context.model_config.num_frames, 4);
    }

    #[test]
    fn test_unlabelled_lines_are_dropped_before_batching() {
        use burn::backend::NdArray;
        use burn::data::dataloader::batcher::Batcher;
        use burn::data::dataset::Dataset;
        use crate::data::batcher::SrlBatcher;

        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        let mixed = format!(
            "{}{}\n",
            CORPUS,
            r#"{"words":["birds","fly"],"lemma":"fly","verb_index":1}"#,
        );
        fs::write(&cfg.train_path, mixed).unwrap();
        cfg.train_fraction = 1.0;

        let prepared = TrainUseCase::new(cfg).prepare().unwrap();
        let train = prepared.train_dataset;
        assert_eq!(train.len(), 4);

        let items: Vec<_> = (0..train.len()).filter_map(|i| train.get(i)).collect();
        let batch = SrlBatcher::<NdArray>::new(Default::default()).batch(items);
        assert!(batch.tags.is_some());
        assert_eq!(batch.frame_tags.unwrap().dims(), [4]);
    }

    #[test]
    fn test_model_config_follows_vocabulary() {
        let cfg = TrainConfig { label_smoothing: Some(0.1), ..TrainConfig::default() };
        let vocab = Vocabulary::from_instances(&Vec::<SrlInstance>::new());
        let model = cfg.model_config(120, &vocab);
        assert_eq!(model.encoder.vocab_size, 120);
        assert_eq!(model.num_labels, 1);
        assert_eq!(model.label_smoothing, Some(0.1));
    }
}
