// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: average joint loss on the training set
//   - val_loss:   average joint loss on the validation set
//   - role_f1:    overall span F1 of the role labels (V excluded)
//   - frame_f1:   micro F1 of the frame predictions
//
// Output file: checkpoints/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_loss,role_f1,frame_f1
//   1,2.412000,2.301500,0.081000,0.412000
//   2,1.870100,1.802300,0.214000,0.577000
//
// role_f1 and frame_f1 are blank for runs that ignore the span
// metric, since nothing is reported then.

use anyhow::Result;
use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "epoch,train_loss,val_loss,role_f1,frame_f1";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    pub val_loss:   f64,
    /// None when span scoring is switched off
    pub role_f1:    Option<f64>,
    /// None when metrics are computed but not reported
    pub frame_f1:   Option<f64>,
}

impl EpochMetrics {
    /// Build a row from the flat map returned by `SrlMetrics::get_metrics`.
    pub fn from_metric_map(
        epoch:      usize,
        train_loss: f64,
        val_loss:   f64,
        metrics:    &BTreeMap<String, f64>,
    ) -> Self {
        Self {
            epoch,
            train_loss,
            val_loss,
            role_f1:  metrics.get("f1_role").copied(),
            frame_f1: metrics.get("fscore_frame").copied(),
        }
    }

    fn csv_row(&self) -> String {
        let cell  = |v: Option<f64>| v.map(|f| format!("{f:.6}")).unwrap_or_default();
        format!(
            "{},{:.6},{:.6},{},{}",
            self.epoch, self.train_loss, self.val_loss, cell(self.role_f1), cell(self.frame_f1),
        )
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so
    /// repeated runs append to the same log.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;
        writeln!(f, "{}", m.csv_row())?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
