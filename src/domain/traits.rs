// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to data sources and labelers
// through these traits only:
//
//   InstanceSource  ← JsonlLoader (data layer)
//   RoleLabeler     ← Inferencer  (ml layer)

use anyhow::Result;

use crate::domain::srl_instance::{SrlInstance, SrlPrediction};

// ─── InstanceSource ───────────────────────────────────────────────────────────
/// Any component that can produce predicate-annotated sentences.
pub trait InstanceSource {
    /// Load every instance available from this source.
    fn load_all(&self) -> Result<Vec<SrlInstance>>;
}

// ─── RoleLabeler ──────────────────────────────────────────────────────────────
/// Any component that assigns role tags and a frame to a predicate.
pub trait RoleLabeler {
    /// Label a single instance. Gold annotations, if present, are ignored.
    fn label(&self, instance: &SrlInstance) -> Result<SrlPrediction>;

    /// Label several instances. The default labels them one by one.
    fn label_all(&self, instances: &[SrlInstance]) -> Result<Vec<SrlPrediction>> {
        instances.iter().map(|inst| self.label(inst)).collect()
    }
}
