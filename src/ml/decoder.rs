// ============================================================
// Layer 5 — Output Decoding
// ============================================================
// Turns model outputs into word-level predictions:
//
//   role tags:  crop padding → viterbi over wordpiece class
//               probabilities under BIO constraints → keep the
//               tag at each word's first wordpiece
//
//   frame:      keep only the lemma's candidate frames from the
//               inventory and take the most probable one; fall
//               back to the full distribution when the lemma has
//               no candidate the model knows
//
// Viterbi runs on plain Vec<f32> data, so this module only
// touches Burn to read tensors back to the host.

use anyhow::{bail, Result};
use burn::prelude::*;

use crate::data::dataset::SrlMetadata;
use crate::data::vocabulary::{Vocabulary, FRAMES, LABELS};
use crate::domain::bio::{allowed_transitions, bio_to_conll, viterbi_decode};
use crate::domain::lemma_frames::LemmaFrameTable;
use crate::domain::srl_instance::SrlPrediction;
use crate::ml::model::SrlOutput;

pub struct SrlDecoder {
    vocab:    Vocabulary,
    pairwise: Vec<Vec<f32>>,
    start:    Vec<f32>,
}

impl SrlDecoder {
    pub fn new(vocab: Vocabulary) -> Self {
        let (pairwise, start) = allowed_transitions(vocab.tokens(LABELS));
        Self { vocab, pairwise, start }
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// `scores`: [length][num_labels] for the unpadded wordpieces.
    /// Returns one BIO tag per word.
    pub fn decode_tags(&self, scores: &[Vec<f32>], offsets: &[usize]) -> Result<Vec<String>> {
        let path = viterbi_decode(scores, &self.pairwise, &self.start);
        offsets
            .iter()
            .map(|&i| {
                let label = path
                    .get(i)
                    .and_then(|&l| self.vocab.token(LABELS, l))
                    .ok_or_else(|| anyhow::anyhow!("no decoded tag at wordpiece {i}"))?;
                Ok(label.to_string())
            })
            .collect()
    }

    /// Most probable frame among `candidates`, or overall when none of
    /// them is in the frame vocabulary.
    pub fn decode_frame(&self, probabilities: &[f32], candidates: &[String]) -> Result<String> {
        let candidate_ids: Vec<usize> = candidates
            .iter()
            .filter_map(|f| self.vocab.token_index(FRAMES, f))
            .filter(|&id| id < probabilities.len())
            .collect();

        let best = if candidate_ids.is_empty() {
            argmax(probabilities.iter().copied().enumerate())
        } else {
            argmax(candidate_ids.iter().map(|&id| (id, probabilities[id])))
        };

        let best = best.ok_or_else(|| anyhow::anyhow!("empty frame distribution"))?;
        self.vocab
            .token(FRAMES, best)
            .map(String::from)
            .ok_or_else(|| anyhow::anyhow!("frame index {best} not in vocabulary"))
    }

    /// Decode a whole batch of model outputs.
    pub fn make_output_human_readable<B: Backend>(
        &self,
        output:       &SrlOutput<B>,
        metadata:     &[SrlMetadata],
        lemma_frames: &LemmaFrameTable,
    ) -> Result<Vec<SrlPrediction>> {
        let [batch_size, seq_len, num_labels] = output.class_probabilities.dims();
        let [_, num_frames] = output.frame_probabilities.dims();
        if batch_size != metadata.len() {
            bail!("{} outputs for {} metadata entries", batch_size, metadata.len());
        }

        let class_probs = float_data(output.class_probabilities.clone())?;
        let frame_probs = float_data(output.frame_probabilities.clone())?;
        let lengths: Vec<usize> = int_data(output.mask.clone().sum_dim(1))?
            .into_iter()
            .map(|l| l.max(0) as usize)
            .collect();

        let mut predictions = Vec::with_capacity(batch_size);
        for (b, meta) in metadata.iter().enumerate() {
            let length = lengths[b].min(seq_len);
            let scores: Vec<Vec<f32>> = (0..length)
                .map(|t| {
                    let from = (b * seq_len + t) * num_labels;
                    class_probs[from..from + num_labels].to_vec()
                })
                .collect();
            let tags = self.decode_tags(&scores, &meta.offsets)?;

            let probs = &frame_probs[b * num_frames..(b + 1) * num_frames];
            let frame = self.decode_frame(probs, lemma_frames.candidates(&meta.lemma))?;

            predictions.push(SrlPrediction {
                words:      meta.words.clone(),
                verb:       meta.verb().to_string(),
                verb_index: meta.verb_index,
                lemma:      meta.lemma.clone(),
                conll_tags: bio_to_conll(&tags),
                tags,
                frame,
            });
        }
        Ok(predictions)
    }
}

/// Index of the largest value; the first one on ties.
fn argmax(values: impl Iterator<Item = (usize, f32)>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, v) in values {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

pub(crate) fn float_data<B: Backend, const D: usize>(t: Tensor<B, D>) -> Result<Vec<f32>> {
    t.into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read tensor data: {e:?}"))
}

pub(crate) fn int_data<B: Backend, const D: usize>(t: Tensor<B, D, Int>) -> Result<Vec<i64>> {
    t.into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow::anyhow!("Cannot read tensor data: {e:?}"))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::srl_instance::SrlInstance;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn split(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    /// labels: B-ARG0 B-V I-ARG0 I-V O ; frames: EAT_BITE GIVE RUN
    fn decoder() -> SrlDecoder {
        let instances = [
            SrlInstance::new(split("a b"), "eat", 1).with_gold("EAT_BITE", split("B-ARG0 B-V")),
            SrlInstance::new(split("a b"), "give", 1).with_gold("GIVE", split("B-ARG0 B-V")),
            SrlInstance::new(split("a b"), "run", 1).with_gold("RUN", split("B-ARG0 B-V")),
        ];
        SrlDecoder::new(Vocabulary::from_instances(&instances))
    }

    #[test]
    fn test_decode_frame_restricted_to_candidates() {
        let d = decoder();
        let probs = [0.2, 0.7, 0.1];
        // GIVE is most probable overall but not a candidate
        let frame = d
            .decode_frame(&probs, &split("RUN EAT_BITE"))
            .unwrap();
        assert_eq!(frame, "EAT_BITE");
    }

    #[test]
    fn test_decode_frame_falls_back_without_candidates() {
        let d = decoder();
        let probs = [0.2, 0.7, 0.1];
        assert_eq!(d.decode_frame(&probs, &[]).unwrap(), "GIVE");
        // candidates unknown to the vocabulary are ignored
        assert_eq!(d.decode_frame(&probs, &split("DRINK")).unwrap(), "GIVE");
    }

    #[test]
    fn test_decode_tags_reads_word_offsets() {
        let d = decoder();
        // wordpieces: [CLS] the ca ##t ate [SEP] → words at 1, 2, 4
        let row = |hot: usize| {
            let mut v = vec![0.0f32; 5];
            v[hot] = 1.0;
            v
        };
        let scores = vec![row(4), row(0), row(2), row(2), row(1), row(4)];
        let tags = d.decode_tags(&scores, &[1, 2, 4]).unwrap();
        assert_eq!(tags, split("B-ARG0 I-ARG0 B-V"));
    }

    #[test]
    fn test_decode_tags_fixes_invalid_inside_tag() {
        let d = decoder();
        // I-V directly after O is forbidden; viterbi must avoid it
        let scores = vec![
            vec![0.0, 0.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.3, 0.0, 0.6, 0.1],
        ];
        let tags = d.decode_tags(&scores, &[0, 1]).unwrap();
        assert_eq!(tags, split("O B-V"));
    }

    #[test]
    fn test_make_output_human_readable() {
        let d = decoder();
        let device = Default::default();
        // one example, 4 wordpieces of which 3 are real
        let mut class = vec![0.0f32; 4 * 5];
        for (t, hot) in [(0, 4), (1, 0), (2, 1), (3, 4)] {
            class[t * 5 + hot] = 1.0;
        }
        let output = SrlOutput::<TestBackend> {
            logits:              Tensor::zeros([1, 4, 5], &device),
            frame_logits:        Tensor::zeros([1, 3], &device),
            class_probabilities: Tensor::<TestBackend, 1>::from_floats(class.as_slice(), &device)
                .reshape([1, 4, 5]),
            frame_probabilities: Tensor::<TestBackend, 1>::from_floats([0.1, 0.3, 0.6], &device)
                .reshape([1, 3]),
            mask: Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 1, 0], &device).reshape([1, 4]),
        };
        let meta = SrlMetadata {
            words:      split("cats ate"),
            lemma:      "eat".into(),
            verb_index: 1,
            offsets:    vec![1, 2],
            gold_tags:  None,
            gold_frame: None,
        };
        let table = LemmaFrameTable::parse("eat EAT_BITE GIVE");
        let preds = d.make_output_human_readable(&output, &[meta], &table).unwrap();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].tags, split("B-ARG0 B-V"));
        assert_eq!(preds[0].conll_tags, split("(ARG0*) (V*)"));
        assert_eq!(preds[0].verb, "ate");
        assert_eq!(preds[0].frame, "GIVE");
    }
}
