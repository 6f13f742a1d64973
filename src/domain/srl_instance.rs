// ============================================================
// Layer 3 — SrlInstance Domain Type
// ============================================================
// One sentence annotated for a single predicate:
//   - the original words
//   - the index of the predicate (verb) word
//   - the predicate lemma, used to look up candidate frames
//   - optionally the gold frame and gold BIO role tags
//
// Example:
//   words:      ["The", "cat", "ate", "the", "fish"]
//   verb_index: 2
//   lemma:      "eat"
//   frame:      "EAT_BITE"
//   tags:       ["B-ARG0", "I-ARG0", "B-V", "B-ARG1", "I-ARG1"]
//
// A sentence with several predicates becomes several instances.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A predicate-annotated sentence. `frame` and `tags` are absent
/// for unlabelled input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrlInstance {
    /// Whitespace-level words of the sentence
    pub words: Vec<String>,

    /// Lemma of the predicate word
    pub lemma: String,

    /// Position of the predicate inside `words`
    pub verb_index: usize,

    /// Gold frame label of the predicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,

    /// Gold word-level BIO role tags, one per word
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl SrlInstance {
    /// Create an unlabelled instance.
    pub fn new(
        words:      Vec<String>,
        lemma:      impl Into<String>,
        verb_index: usize,
    ) -> Self {
        Self {
            words,
            lemma: lemma.into(),
            verb_index,
            frame: None,
            tags:  None,
        }
    }

    /// Attach gold annotations.
    #[cfg(test)]
    pub fn with_gold(mut self, frame: impl Into<String>, tags: Vec<String>) -> Self {
        self.frame = Some(frame.into());
        self.tags  = Some(tags);
        self
    }

    /// The predicate word itself.
    pub fn verb(&self) -> &str {
        self.words.get(self.verb_index).map(String::as_str).unwrap_or("")
    }

    /// True when both gold frame and gold tags are present.
    pub fn is_labelled(&self) -> bool {
        self.frame.is_some() && self.tags.is_some()
    }

    /// Check structural consistency.
    pub fn validate(&self) -> Result<()> {
        if self.words.is_empty() {
            bail!("instance has no words");
        }
        if self.verb_index >= self.words.len() {
            bail!(
                "verb_index {} out of range for a sentence of {} words",
                self.verb_index,
                self.words.len()
            );
        }
        if let Some(tags) = &self.tags {
            if tags.len() != self.words.len() {
                bail!(
                    "tag count ({}) != word count ({})",
                    tags.len(),
                    self.words.len()
                );
            }
        }
        Ok(())
    }
}

/// The decoded, human-readable output for one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrlPrediction {
    pub words:      Vec<String>,
    pub verb:       String,
    pub verb_index: usize,
    pub lemma:      String,

    /// Word-level BIO tags
    pub tags: Vec<String>,

    /// The same tags in CoNLL bracket format
    pub conll_tags: Vec<String>,

    /// Predicted frame label
    pub frame: String,
}
