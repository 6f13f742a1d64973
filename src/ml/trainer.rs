// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on an AutodiffBackend (Autodiff<Wgpu> from
//     the CLI) so loss.backward() can produce gradients
//   - model.valid() returns the model on the inner backend with
//     dropout disabled; the validation batcher uses that backend
//   - Training batches only feed the frame metric; role spans
//     are decoded and scored on validation batches
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::SrlBatcher, dataset::SrlDataset, vocabulary::Vocabulary};
use crate::domain::lemma_frames::LemmaFrameTable;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::decoder::SrlDecoder;
use crate::ml::evaluator::{evaluate_batches, frame_argmax, gold_frames};
use crate::ml::model::{SrlFrameModel, SrlModelConfig};
use crate::ml::scorer::SrlMetrics;

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Everything the loop needs besides the data.
pub struct TrainingContext {
    pub model_config: SrlModelConfig,
    pub vocab:        Vocabulary,
    pub lemma_frames: LemmaFrameTable,
    pub ckpt_manager: CheckpointManager,
}

pub fn run_training(
    cfg:           &TrainConfig,
    ctx:           TrainingContext,
    train_dataset: SrlDataset,
    val_dataset:   SrlDataset,
) -> Result<Vec<EpochMetrics>> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, ctx, train_dataset, val_dataset, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    ctx:           TrainingContext,
    train_dataset: SrlDataset,
    val_dataset:   SrlDataset,
    device:        B::Device,
) -> Result<Vec<EpochMetrics>> {
    let TrainingContext { model_config, vocab, lemma_frames, ckpt_manager } = ctx;

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: SrlFrameModel<B> = model_config.init(&device);
    if let Some(path) = &cfg.encoder_init {
        model = ckpt_manager.load_encoder(model, path, &device)?;
    }
    tracing::info!(
        "Model ready: {} layers, d_model={}, {} role labels, {} frames",
        cfg.num_layers, cfg.d_model, model_config.num_labels, model_config.num_frames,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .init::<B, SrlFrameModel<B>>();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(SrlBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_dataset);

    let val_loader = DataLoaderBuilder::new(SrlBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(val_dataset);

    let decoder = SrlDecoder::new(vocab);
    let metrics_logger = MetricsLogger::new(ckpt_manager.dir().to_string_lossy().to_string())?;
    let mut metrics = SrlMetrics::new(cfg.span_metric, cfg.ignore_span_metric);
    let mut history = Vec::with_capacity(cfg.epochs);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let gold = gold_frames(&batch)?;
            let (Some(tags), Some(frame_tags)) = (batch.tags, batch.frame_tags) else {
                tracing::warn!("Skipping unlabelled training batch");
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

            train_loss_sum += losses.loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let predicted = frame_argmax(losses.output.frame_logits.clone())?;
            let no_spans: Vec<Vec<String>> = Vec::new();
            metrics.observe(&no_spans, &no_spans, &predicted, &gold, true);

            // Backward pass + Adam update
            let grads = losses.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };
        let train_metrics = metrics.get_metrics(true);
        tracing::debug!("Epoch {} training metrics: {:?}", epoch, train_metrics);

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid  = model.valid();
        let avg_val_loss = evaluate_batches(
            &model_valid,
            val_loader.iter(),
            &decoder,
            &lemma_frames,
            &mut metrics,
        )?;
        let val_metrics = metrics.get_metrics(true);

        let row = EpochMetrics::from_metric_map(epoch, avg_train_loss, avg_val_loss, &val_metrics);
        let percent = |v: Option<f64>| {
            v.map(|f| format!("{:.1}%", f * 100.0)).unwrap_or_else(|| "-".to_string())
        };
        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | role_f1={} | frame_f1={}",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss,
            percent(row.role_f1), percent(row.frame_f1),
        );

        ckpt_manager.save_model(&model, epoch)?;
        metrics_logger.log(&row)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
        history.push(row);
    }

    tracing::info!("Training complete! Metrics in '{}'", metrics_logger.csv_path().display());
    Ok(history)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{dataset::build_samples, wordpiece::WordpieceAligner};
    use crate::domain::srl_instance::SrlInstance;
    use crate::infra::tokenizer_store::{embedding_size, word_level_tokenizer};
    use crate::ml::encoder::EncoderConfig;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn split(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_train_loop_runs_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let instances = vec![
            SrlInstance::new(split("the cat ate fish"), "eat", 2)
                .with_gold("Ingestion", split("B-ARG0 I-ARG0 B-V B-ARG1")),
            SrlInstance::new(split("she ran home"), "run", 1)
                .with_gold("Self_motion", split("B-ARG0 B-V B-ARGM-DIR")),
        ];
        let words     = instances.iter().flat_map(|i| i.words.iter().map(String::as_str));
        let tokenizer = word_level_tokenizer(words, 200).unwrap();
        let token_vocab_size = embedding_size(&tokenizer);
        let aligner   = WordpieceAligner::new(tokenizer);
        let vocab     = Vocabulary::from_instances(&instances);
        let samples   = build_samples(&instances, &aligner, &vocab, 16);
        assert_eq!(samples.len(), 2);

        let cfg = TrainConfig {
            checkpoint_dir: dir.path().to_string_lossy().to_string(),
            batch_size:     2,
            epochs:         2,
            num_workers:    1,
            ..TrainConfig::default()
        };
        let encoder = EncoderConfig::new(token_vocab_size)
            .with_max_seq_len(16)
            .with_d_model(8)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(16);
        let ctx = TrainingContext {
            model_config: SrlModelConfig::new(
                encoder,
                vocab.size(crate::data::vocabulary::LABELS),
                vocab.size(crate::data::vocabulary::FRAMES),
            ),
            vocab,
            lemma_frames: LemmaFrameTable::parse("eat Ingestion\nrun Self_motion"),
            ckpt_manager: CheckpointManager::new(cfg.checkpoint_dir.clone()).unwrap(),
        };

        let history = train_loop::<TestBackend>(
            &cfg,
            ctx,
            SrlDataset::new(samples.clone()),
            SrlDataset::new(samples),
            Default::default(),
        )
        .unwrap();

        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| m.train_loss.is_finite() && m.val_loss.is_finite()));
        assert!(history[0].role_f1.is_some());
        assert!(dir.path().join("model_epoch_2.mpk.gz").exists());
        assert!(dir.path().join("metrics.csv").exists());
    }
}
