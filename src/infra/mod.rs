// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs      — model weights (Burn CompactRecorder),
//                        training config and label vocabulary
//                        persisted next to them as JSON so
//                        inference can rebuild the model.
//
//   tokenizer_store.rs — wordpiece tokenizer persistence.
//                        Copies a supplied tokenizer.json, or
//                        builds a word-level one from the
//                        training words, so training and
//                        inference share one vocabulary.
//
//   metrics.rs         — per-epoch loss and F1 written to CSV.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
