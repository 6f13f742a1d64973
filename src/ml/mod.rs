// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Model architecture, training, decoding and scoring:
//
//   encoder.rs    — BERT-style transformer encoder; the
//                   predicate indicator is fed as token type
//
//   model.rs      — role tag head over every wordpiece, frame
//                   head over the predicate's first wordpiece,
//                   joint loss
//
//   decoder.rs    — viterbi under BIO constraints, wordpiece →
//                   word tags, lemma-restricted frame choice
//
//   scorer.rs     — span F1 over roles, micro F1 over frames
//
//   evaluator.rs  — loss + decoding + metrics over batches
//
//   trainer.rs    — Adam training loop with per-epoch
//                   validation and checkpointing
//
//   inferencer.rs — loads a checkpoint and labels predicates
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Devlin et al. (2019) BERT
//            Shi & Lin (2019) Simple BERT Models for Relation
//            Extraction and Semantic Role Labeling

/// Transformer encoder
pub mod encoder;

/// SRL + frame identification model
pub mod model;

/// Output decoding into word-level predictions
pub mod decoder;

/// Role span F1 and frame F1
pub mod scorer;

/// Shared evaluation pass
pub mod evaluator;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads a checkpoint and labels predicates
pub mod inferencer;
