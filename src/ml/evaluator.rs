// ============================================================
// Layer 5 — Evaluation Pass
// ============================================================
// Shared by the per-epoch validation in the trainer and by the
// `evaluate` command: run labelled batches through the model,
// decode them and feed the metrics.
//
// The frame metric scores the unrestricted argmax of the frame
// logits; candidate restriction only applies to decoded output.

use anyhow::Result;
use burn::prelude::*;

use crate::data::batcher::SrlBatch;
use crate::domain::bio::bio_to_conll;
use crate::domain::lemma_frames::LemmaFrameTable;
use crate::ml::decoder::{int_data, SrlDecoder};
use crate::ml::model::SrlFrameModel;
use crate::ml::scorer::SrlMetrics;

/// Argmax frame id per example.
pub fn frame_argmax<B: Backend>(frame_logits: Tensor<B, 2>) -> Result<Vec<usize>> {
    Ok(int_data(frame_logits.argmax(1))?
        .into_iter()
        .map(|i| i.max(0) as usize)
        .collect())
}

/// Gold frame ids of a batch, empty when the batch is unlabelled.
pub fn gold_frames<B: Backend>(batch: &SrlBatch<B>) -> Result<Vec<usize>> {
    match &batch.frame_tags {
        Some(t) => Ok(int_data(t.clone())?.into_iter().map(|i| i.max(0) as usize).collect()),
        None    => Ok(Vec::new()),
    }
}

/// Evaluate labelled batches; returns the mean joint loss.
/// Unlabelled batches are skipped.
pub fn evaluate_batches<B: Backend>(
    model:        &SrlFrameModel<B>,
    batches:      impl IntoIterator<Item = SrlBatch<B>>,
    decoder:      &SrlDecoder,
    lemma_frames: &LemmaFrameTable,
    metrics:      &mut SrlMetrics,
) -> Result<f64> {
    let mut loss_sum = 0.0f64;
    let mut count    = 0usize;

    for batch in batches {
        let gold = gold_frames(&batch)?;
        let (Some(tags), Some(frame_tags)) = (batch.tags.clone(), batch.frame_tags.clone()) else {
            tracing::warn!("Skipping unlabelled batch of {} examples", batch.metadata.len());
            continue;
        };

        let losses = model.forward_loss(
            batch.input_ids,
            batch.verb_indicator,
            batch.attention_mask,
            batch.frame_positions,
            tags,
            frame_tags,
        );
        loss_sum += losses.loss.clone().into_scalar().elem::<f64>();
        count    += 1;

        let predictions = decoder.make_output_human_readable(
            &losses.output,
            &batch.metadata,
            lemma_frames,
        )?;
        let predicted_conll: Vec<Vec<String>> =
            predictions.into_iter().map(|p| p.conll_tags).collect();
        let gold_conll: Vec<Vec<String>> = batch
            .metadata
            .iter()
            .map(|m| m.gold_tags.as_deref().map(|t| bio_to_conll(t)).unwrap_or_default())
            .collect();

        let predicted_frames = frame_argmax(losses.output.frame_logits)?;
        metrics.observe(&predicted_conll, &gold_conll, &predicted_frames, &gold, false);
    }

    Ok(if count > 0 { loss_sum / count as f64 } else { f64::NAN })
}
