// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds a trained model from its checkpoint directory and
// labels new predicates:
//
//   train_config.json → architecture
//   vocabulary.json   → role tag / frame label indices
//   tokenizer.json    → wordpiece alignment
//   model_epoch_N     → weights of the latest epoch
//
// Gold annotations on the input are dropped before labelling,
// so a labelled file can be predicted as-is.

use anyhow::{Context, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::{
    batcher::{SrlBatch, SrlBatcher},
    dataset::{build_samples, SrlSample},
    wordpiece::WordpieceAligner,
};
use crate::domain::lemma_frames::LemmaFrameTable;
use crate::domain::srl_instance::{SrlInstance, SrlPrediction};
use crate::domain::traits::RoleLabeler;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::tokenizer_store::{embedding_size, TokenizerStore};
use crate::ml::decoder::SrlDecoder;
use crate::ml::evaluator::evaluate_batches;
use crate::ml::model::SrlFrameModel;
use crate::ml::scorer::SrlMetrics;

pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend = InferBackend> {
    model:        SrlFrameModel<B>,
    aligner:      WordpieceAligner,
    decoder:      SrlDecoder,
    lemma_frames: LemmaFrameTable,
    batcher:      SrlBatcher<B>,
    max_seq_len:  usize,
    batch_size:   usize,
}

impl Inferencer<InferBackend> {
    /// Load onto the default WGPU device.
    pub fn from_checkpoint_default(
        ckpt_manager: &CheckpointManager,
        lemma_frames: LemmaFrameTable,
    ) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        Self::from_checkpoint(ckpt_manager, lemma_frames, device)
    }
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        lemma_frames: LemmaFrameTable,
        device:       B::Device,
    ) -> Result<Self> {
        let cfg   = ckpt_manager.load_config()?;
        let vocab = ckpt_manager.load_vocabulary()?;
        let tokenizer = TokenizerStore::new(ckpt_manager.dir().to_string_lossy().to_string())
            .load()?;

        let model_cfg = cfg
            .model_config(embedding_size(&tokenizer), &vocab)
            .with_embedding_dropout(0.0);
        let model: SrlFrameModel<B> = model_cfg.init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!(
            "Model loaded from checkpoint ({} role labels, {} frames)",
            model_cfg.num_labels,
            model_cfg.num_frames,
        );

        Ok(Self {
            model,
            aligner:     WordpieceAligner::new(tokenizer),
            decoder:     SrlDecoder::new(vocab),
            lemma_frames,
            batcher:     SrlBatcher::new(device),
            max_seq_len: cfg.max_seq_len,
            batch_size:  cfg.batch_size.max(1),
        })
    }

    /// Label every instance, in input order.
    pub fn predict(&self, instances: &[SrlInstance]) -> Result<Vec<SrlPrediction>> {
        let vocab = self.decoder.vocab();
        let samples = instances
            .iter()
            .enumerate()
            .map(|(i, inst)| {
                let unlabelled = SrlInstance::new(inst.words.clone(), inst.lemma.clone(), inst.verb_index);
                SrlSample::build(&unlabelled, &self.aligner, vocab, self.max_seq_len)
                    .with_context(|| format!("Cannot encode instance {i}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut predictions = Vec::with_capacity(samples.len());
        for batch in self.batches(samples) {
            let output = self.model.forward(
                batch.input_ids,
                batch.verb_indicator,
                batch.attention_mask,
                batch.frame_positions,
            );
            predictions.extend(self.decoder.make_output_human_readable(
                &output,
                &batch.metadata,
                &self.lemma_frames,
            )?);
        }
        Ok(predictions)
    }

    /// Score labelled instances into `metrics`; returns the mean loss.
    /// Instances that cannot be encoded are skipped with a warning.
    pub fn evaluate(&self, instances: &[SrlInstance], metrics: &mut SrlMetrics) -> Result<f64> {
        let samples = build_samples(instances, &self.aligner, self.decoder.vocab(), self.max_seq_len);
        tracing::info!("Evaluating {} of {} instances", samples.len(), instances.len());
        evaluate_batches(
            &self.model,
            self.batches(samples),
            &self.decoder,
            &self.lemma_frames,
            metrics,
        )
    }

    fn batches(&self, samples: Vec<SrlSample>) -> Vec<SrlBatch<B>> {
        samples
            .chunks(self.batch_size)
            .map(|chunk| self.batcher.batch(chunk.to_vec()))
            .collect()
    }
}

impl<B: Backend> RoleLabeler for Inferencer<B> {
    fn label(&self, instance: &SrlInstance) -> Result<SrlPrediction> {
        self.predict(std::slice::from_ref(instance))?
            .pop()
            .context("No prediction produced")
    }

    fn label_all(&self, instances: &[SrlInstance]) -> Result<Vec<SrlPrediction>> {
        self.predict(instances)
    }
}
