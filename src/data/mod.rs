// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From a JSON-lines corpus to padded tensor batches:
//
//   train.jsonl
//       │
//       ▼
//   JsonlLoader        → SrlInstance (words, lemma, predicate, gold)
//       │
//       ▼
//   WordpieceAligner   → wordpiece ids, word offsets, indicators
//       │
//       ▼
//   Vocabulary         → role tag ids, frame ids
//       │
//       ▼
//   SrlDataset         → implements Burn's Dataset trait
//       │
//       ▼
//   SrlBatcher         → dynamically padded SrlBatch
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop

/// Reads JSON-lines instance files
pub mod loader;

/// Label namespaces: role tags and frames
pub mod vocabulary;

/// Word ↔ wordpiece alignment
pub mod wordpiece;

/// Implements Burn's Dataset trait for SRL samples
pub mod dataset;

/// Implements Burn's Batcher trait with per-batch padding
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
