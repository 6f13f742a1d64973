// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits describing what the system
// works with: predicate-annotated sentences, frame inventories
// and BIO tag sequences.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO tokenizer or tensor code
//   - File I/O only for the static lemma → frames resource
//
// Everything here is testable without a GPU.

// One sentence with one indicated predicate, plus its prediction type
pub mod srl_instance;

// The lemma → candidate frames inventory
pub mod lemma_frames;

// BIO / CoNLL tag conversion, span extraction and viterbi decoding
pub mod bio;

// Core abstractions (traits) that other layers implement
pub mod traits;
