// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a labelled JSONL file with a trained checkpoint and
// reports the same metrics as the per-epoch validation.

use anyhow::{bail, Result};
use std::collections::BTreeMap;

use crate::data::loader::JsonlLoader;
use crate::domain::lemma_frames::LemmaFrameTable;
use crate::domain::traits::InstanceSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::Inferencer;
use crate::ml::scorer::SrlMetrics;

pub struct EvaluateUseCase {
    checkpoint_dir:    String,
    lemma_frames_path: String,
}

/// Mean loss plus the flat metrics map.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub loss:    f64,
    pub metrics: BTreeMap<String, f64>,
}

impl EvaluationReport {
    /// `name: value` lines, loss first.
    pub fn lines(&self) -> Vec<String> {
        std::iter::once(format!("loss: {:.4}", self.loss))
            .chain(self.metrics.iter().map(|(k, v)| format!("{k}: {v:.4}")))
            .collect()
    }
}

impl EvaluateUseCase {
    pub fn new(checkpoint_dir: impl Into<String>, lemma_frames_path: impl Into<String>) -> Self {
        Self {
            checkpoint_dir:    checkpoint_dir.into(),
            lemma_frames_path: lemma_frames_path.into(),
        }
    }

    pub fn execute(&self, data_path: &str) -> Result<EvaluationReport> {
        let instances = JsonlLoader::new(data_path).load_all()?;
        let labelled: Vec<_> = instances.into_iter().filter(|i| i.is_labelled()).collect();
        if labelled.is_empty() {
            bail!("'{}' contains no labelled instances", data_path);
        }

        let ckpt_manager = CheckpointManager::new(&self.checkpoint_dir)?;
        let cfg          = ckpt_manager.load_config()?;
        let lemma_frames = LemmaFrameTable::from_path(&self.lemma_frames_path)?;
        let inferencer   = Inferencer::from_checkpoint_default(&ckpt_manager, lemma_frames)?;

        let mut metrics = SrlMetrics::new(cfg.span_metric, cfg.ignore_span_metric);
        let loss = inferencer.evaluate(&labelled, &mut metrics)?;
        Ok(EvaluationReport { loss, metrics: metrics.get_metrics(true) })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lines() {
        let report = EvaluationReport {
            loss:    1.5,
            metrics: BTreeMap::from([
                ("f1_role".to_string(), 0.25),
                ("fscore_frame".to_string(), 0.5),
            ]),
        };
        assert_eq!(report.lines(), ["loss: 1.5000", "f1_role: 0.2500", "fscore_frame: 0.5000"]);
    }

    #[test]
    fn test_unlabelled_file_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.jsonl");
        std::fs::write(&path, "{\"words\":[\"a\"],\"lemma\":\"a\",\"verb_index\":0}\n").unwrap();
        let use_case = EvaluateUseCase::new(dir.path().to_string_lossy(), "missing.csv");
        assert!(use_case.execute(&path.to_string_lossy()).is_err());
    }
}
