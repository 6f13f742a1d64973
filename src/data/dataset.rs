use anyhow::{bail, Context, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::vocabulary::{Vocabulary, FRAMES, LABELS};
use crate::data::wordpiece::WordpieceAligner;
use crate::domain::bio::wordpiece_tags;
use crate::domain::srl_instance::SrlInstance;

/// Per-example information that is not fed to the encoder but is
/// needed to turn wordpiece predictions back into word-level output
/// and to score them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrlMetadata {
    pub words:      Vec<String>,
    pub lemma:      String,
    pub verb_index: usize,
    /// Start offset of each word in the wordpiece sequence
    pub offsets:    Vec<usize>,
    pub gold_tags:  Option<Vec<String>>,
    pub gold_frame: Option<String>,
}

impl SrlMetadata {
    pub fn verb(&self) -> &str {
        self.words.get(self.verb_index).map(String::as_str).unwrap_or("")
    }
}

/// One tokenised instance. Sequence format: [CLS] pieces… [SEP]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrlSample {
    pub input_ids:      Vec<u32>,
    pub verb_indicator: Vec<u32>,
    pub frame_position: usize,
    /// Wordpiece-level role tag ids, when labelled
    pub tag_ids:        Option<Vec<usize>>,
    /// Gold frame id, when labelled
    pub frame_id:       Option<usize>,
    pub metadata:       SrlMetadata,
}

impl SrlSample {
    /// Tokenise and index one instance.
    pub fn build(
        instance:    &SrlInstance,
        aligner:     &WordpieceAligner,
        vocab:       &Vocabulary,
        max_seq_len: usize,
    ) -> Result<Self> {
        instance.validate()?;
        let alignment = aligner.align(&instance.words, instance.verb_index)?;
        if alignment.input_ids.len() > max_seq_len {
            bail!(
                "sentence needs {} wordpieces, more than max_seq_len {}",
                alignment.input_ids.len(),
                max_seq_len
            );
        }

        let tag_ids = match &instance.tags {
            Some(tags) => {
                let mut piece_tags = vec!["O".to_string()];
                for (tag, &n) in tags.iter().zip(&alignment.piece_counts) {
                    piece_tags.extend(wordpiece_tags(tag, n));
                }
                piece_tags.push("O".to_string());

                let ids = piece_tags
                    .iter()
                    .map(|t| {
                        vocab
                            .token_index(LABELS, t)
                            .with_context(|| format!("unknown role label '{t}'"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Some(ids)
            }
            None => None,
        };

        let frame_id = match &instance.frame {
            Some(frame) => Some(
                vocab
                    .token_index(FRAMES, frame)
                    .with_context(|| format!("unknown frame label '{frame}'"))?,
            ),
            None => None,
        };

        Ok(Self {
            input_ids:      alignment.input_ids,
            verb_indicator: alignment.verb_indicator,
            frame_position: alignment.frame_position,
            tag_ids,
            frame_id,
            metadata: SrlMetadata {
                words:      instance.words.clone(),
                lemma:      instance.lemma.clone(),
                verb_index: instance.verb_index,
                offsets:    alignment.offsets,
                gold_tags:  instance.tags.clone(),
                gold_frame: instance.frame.clone(),
            },
        })
    }

    pub fn seq_len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_labelled(&self) -> bool {
        self.tag_ids.is_some() && self.frame_id.is_some()
    }
}

/// Build samples for every instance, skipping (and logging) the
/// ones that cannot be encoded.
pub fn build_samples(
    instances:   &[SrlInstance],
    aligner:     &WordpieceAligner,
    vocab:       &Vocabulary,
    max_seq_len: usize,
) -> Vec<SrlSample> {
    let mut samples = Vec::with_capacity(instances.len());
    for (i, inst) in instances.iter().enumerate() {
        match SrlSample::build(inst, aligner, vocab, max_seq_len) {
            Ok(sample) => samples.push(sample),
            Err(e) => tracing::warn!("Skipping instance {}: {:#}", i, e),
        }
    }
    samples
}

pub struct SrlDataset {
    samples: Vec<SrlSample>,
}

impl SrlDataset {
    pub fn new(samples: Vec<SrlSample>) -> Self { Self { samples } }
}

impl Dataset<SrlSample> for SrlDataset {
    fn get(&self, index: usize) -> Option<SrlSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::word_level_tokenizer;

    fn split(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn labelled() -> SrlInstance {
        SrlInstance::new(split("cat ate, fish"), "eat", 1)
            .with_gold("EAT_BITE", split("B-ARG0 B-V B-ARG1"))
    }

    fn fixtures() -> (WordpieceAligner, Vocabulary) {
        let tok = word_level_tokenizer(["cat", "ate", "fish"], 100).unwrap();
        (WordpieceAligner::new(tok), Vocabulary::from_instances(&[labelled()]))
    }

    #[test]
    fn test_build_expands_tags_over_pieces() {
        let (aligner, vocab) = fixtures();
        let sample = SrlSample::build(&labelled(), &aligner, &vocab, 32).unwrap();
        let tags: Vec<&str> = sample
            .tag_ids
            .as_ref()
            .unwrap()
            .iter()
            .map(|&i| vocab.token(LABELS, i).unwrap())
            .collect();
        assert_eq!(tags, ["O", "B-ARG0", "B-V", "I-V", "B-ARG1", "O"]);
        assert_eq!(sample.frame_position, 2);
        assert_eq!(sample.frame_id, Some(0));
        assert_eq!(sample.metadata.offsets, vec![1, 2, 4]);
        assert_eq!(sample.metadata.verb(), "ate,");
    }

    #[test]
    fn test_unlabelled_instance() {
        let (aligner, vocab) = fixtures();
        let inst = SrlInstance::new(split("cat ate"), "eat", 1);
        let sample = SrlSample::build(&inst, &aligner, &vocab, 32).unwrap();
        assert!(!sample.is_labelled());
        assert_eq!(sample.seq_len(), 4);
    }

    #[test]
    fn test_too_long_rejected() {
        let (aligner, vocab) = fixtures();
        assert!(SrlSample::build(&labelled(), &aligner, &vocab, 4).is_err());
    }

    #[test]
    fn test_unknown_frame_rejected_and_skipped() {
        let (aligner, vocab) = fixtures();
        let inst = SrlInstance::new(split("cat ran"), "run", 1)
            .with_gold("RUN", split("B-ARG0 B-V"));
        assert!(SrlSample::build(&inst, &aligner, &vocab, 32).is_err());
        let samples = build_samples(&[inst, labelled()], &aligner, &vocab, 32);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_dataset_access() {
        let (aligner, vocab) = fixtures();
        let sample  = SrlSample::build(&labelled(), &aligner, &vocab, 32).unwrap();
        let dataset = SrlDataset::new(vec![sample]);
        assert_eq!(dataset.len(), 1);
        assert!(dataset.get(0).is_some());
        assert!(dataset.get(1).is_none());
    }
}
