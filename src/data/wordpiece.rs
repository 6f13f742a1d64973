// ============================================================
// Layer 4 — Wordpiece Alignment
// ============================================================
// The encoder sees wordpieces, the annotation is over words.
// For every sentence we keep the mapping between the two:
//
//   words:       The   cat   ate   the   ##fish-like
//   wordpieces:  [CLS] the cat ate the fish - like [SEP]
//   offsets:           1   2   3   4   5            (first piece of each word)
//
// Per wordpiece we also build:
//   verb indicator  1 on every piece of the predicate word
//   frame position  index of the first piece of the predicate
//
// Decoding later keeps only the tag at each offset to get back
// one tag per word.

use anyhow::{bail, Result};
use tokenizers::Tokenizer;

const CLS_TOKEN: &str = "[CLS]";
const SEP_TOKEN: &str = "[SEP]";
const UNK_TOKEN: &str = "[UNK]";

/// Wordpiece view of one sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// [CLS] pieces… [SEP]
    pub input_ids: Vec<u32>,

    /// Index of the first piece of each word
    pub offsets: Vec<usize>,

    /// Number of pieces of each word
    pub piece_counts: Vec<usize>,

    /// 1 on the predicate's pieces, 0 elsewhere
    pub verb_indicator: Vec<u32>,

    /// First piece of the predicate
    pub frame_position: usize,
}

/// Splits words into wordpieces with a `tokenizers::Tokenizer`.
#[derive(Clone)]
pub struct WordpieceAligner {
    tokenizer: Tokenizer,
    cls_id:    u32,
    sep_id:    u32,
    unk_id:    u32,
}

impl WordpieceAligner {
    pub fn new(tokenizer: Tokenizer) -> Self {
        // BERT ids when the tokenizer does not define the specials
        let cls_id = tokenizer.token_to_id(CLS_TOKEN).unwrap_or(101);
        let sep_id = tokenizer.token_to_id(SEP_TOKEN).unwrap_or(102);
        let unk_id = tokenizer.token_to_id(UNK_TOKEN).unwrap_or(100);
        Self { tokenizer, cls_id, sep_id, unk_id }
    }

    /// Wordpiece ids of a single word; never empty.
    fn word_pieces(&self, word: &str) -> Result<Vec<u32>> {
        let enc = self
            .tokenizer
            .encode(word, false)
            .map_err(|e| anyhow::anyhow!("Cannot tokenise '{word}': {e}"))?;
        let ids = enc.get_ids();
        if ids.is_empty() {
            Ok(vec![self.unk_id])
        } else {
            Ok(ids.to_vec())
        }
    }

    /// Align a sentence whose predicate is at `verb_index`.
    pub fn align<S: AsRef<str>>(&self, words: &[S], verb_index: usize) -> Result<Alignment> {
        if verb_index >= words.len() {
            bail!(
                "verb_index {} out of range for {} words",
                verb_index,
                words.len()
            );
        }

        let mut input_ids      = vec![self.cls_id];
        let mut verb_indicator = vec![0u32];
        let mut offsets        = Vec::with_capacity(words.len());
        let mut piece_counts   = Vec::with_capacity(words.len());

        for (i, word) in words.iter().enumerate() {
            let pieces = self.word_pieces(word.as_ref())?;
            offsets.push(input_ids.len());
            piece_counts.push(pieces.len());
            let flag = u32::from(i == verb_index);
            verb_indicator.extend(std::iter::repeat(flag).take(pieces.len()));
            input_ids.extend(pieces);
        }

        input_ids.push(self.sep_id);
        verb_indicator.push(0);

        Ok(Alignment {
            frame_position: offsets[verb_index],
            input_ids,
            offsets,
            piece_counts,
            verb_indicator,
        })
    }
}
