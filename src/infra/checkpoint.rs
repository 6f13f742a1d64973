// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything inference needs to rebuild
// the model exactly as it was trained:
//
//   checkpoints/
//     model_epoch_1.mpk.gz   ← weights after epoch 1 (CompactRecorder)
//     model_epoch_2.mpk.gz
//     latest_epoch.json      ← number of the latest epoch
//     train_config.json      ← hyperparameters and paths
//     vocabulary.json        ← role tag and frame label indices
//     tokenizer.json         ← written by TokenizerStore
//
// A model record from an earlier run can also seed the encoder
// of a new model (--encoder-init); its heads are left untouched
// since the label sets may differ.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde_json;

use crate::application::train_use_case::TrainConfig;
use crate::data::vocabulary::Vocabulary;
use crate::ml::model::{SrlFrameModel, SrlFrameModelRecord};

const LATEST_EPOCH_FILE: &str = "latest_epoch.json";
const CONFIG_FILE:       &str = "train_config.json";
const VOCABULARY_FILE:   &str = "vocabulary.json";

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Write {dir}/model_epoch_{epoch}.mpk.gz and point
    /// latest_epoch.json at it.
    pub fn save_model<B: Backend>(
        &self,
        model: &SrlFrameModel<B>,
        epoch: usize,
    ) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        let latest_path = self.dir.join(LATEST_EPOCH_FILE);
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {LATEST_EPOCH_FILE}"))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the weights of the latest epoch into `model`, which must
    /// have the architecture the checkpoint was saved with.
    pub fn load_model<B: Backend>(
        &self,
        model:  SrlFrameModel<B>,
        device: &B::Device,
    ) -> Result<SrlFrameModel<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Replace the encoder of `model` with the encoder stored in a
    /// model record file (path without the `.mpk.gz` extension).
    pub fn load_encoder<B: Backend>(
        &self,
        mut model: SrlFrameModel<B>,
        record_path: &str,
        device:      &B::Device,
    ) -> Result<SrlFrameModel<B>> {
        let path = PathBuf::from(record_path);
        let record: SrlFrameModelRecord<B> = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load encoder weights from '{}'", path.display()))?;

        model.encoder = model.encoder.load_record(record.encoder);
        tracing::info!("Encoder initialised from '{}'", path.display());
        Ok(model)
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| {
                format!("Cannot write config to '{}'", path.display())
            })?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' first.",
                    path.display()
                )
            })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_vocabulary(&self, vocab: &Vocabulary) -> Result<()> {
        vocab.save(self.dir.join(VOCABULARY_FILE))
    }

    pub fn load_vocabulary(&self) -> Result<Vocabulary> {
        Vocabulary::load(self.dir.join(VOCABULARY_FILE))
    }

    fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_EPOCH_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| {
                format!("Cannot find '{LATEST_EPOCH_FILE}'. Have you run 'train' first?")
            })?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
