// ============================================================
// Layer 3 — BIO Tags, CoNLL Brackets and Viterbi Decoding
// ============================================================
// Role tags follow the BIO scheme, one tag per word:
//
//   The    cat    ate  the    fish
//   B-ARG0 I-ARG0 B-V  B-ARG1 I-ARG1
//
// The CoNLL bracket format used by SRL scorers writes the same
// spans as opening / closing brackets:
//
//   (ARG0* *)     (V*) (ARG1* *)
//
// Decoding a wordpiece tag distribution must respect BIO:
//   - I-X may only follow B-X or I-X
//   - I-X may not start a sequence
// Those constraints are expressed as transition potentials of
// 0.0 (allowed) or -inf (forbidden) and enforced by viterbi.

use serde::{Deserialize, Serialize};

/// A labelled span over word positions, `end` inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledSpan {
    pub label: String,
    pub start: usize,
    pub end:   usize,
}

impl LabeledSpan {
    pub fn new(label: impl Into<String>, start: usize, end: usize) -> Self {
        Self { label: label.into(), start, end }
    }
}

/// Label without its BIO prefix: "B-ARG0" → "ARG0", "O" → "".
fn bare_label(tag: &str) -> &str {
    tag.get(2..).unwrap_or("")
}

/// "-ARG0" for both "B-ARG0" and "I-ARG0"; "" for "O".
fn label_suffix(tag: &str) -> &str {
    tag.get(1..).unwrap_or("")
}

/// Expand one word tag over the wordpieces of that word.
pub fn wordpiece_tags(tag: &str, n_pieces: usize) -> Vec<String> {
    let mut tags = Vec::with_capacity(n_pieces);
    if n_pieces == 0 {
        return tags;
    }
    tags.push(tag.to_string());
    let continuation = if tag.starts_with("B-") {
        format!("I-{}", bare_label(tag))
    } else {
        tag.to_string()
    };
    tags.extend(std::iter::repeat(continuation).take(n_pieces - 1));
    tags
}

/// Convert BIO tags to CoNLL bracket format.
/// An I- tag whose label differs from the previous tag opens a new span.
pub fn bio_to_conll<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let n = tags.len();
    let mut conll = Vec::with_capacity(n);

    for i in 0..n {
        let tag = tags[i].as_ref();
        if tag == "O" {
            conll.push("*".to_string());
            continue;
        }
        let mut out = "*".to_string();

        let opens = tag.starts_with('B')
            || i == 0
            || label_suffix(tag) != label_suffix(tags[i - 1].as_ref());
        if opens {
            out = format!("({}{}", bare_label(tag), out);
        }

        let closes = i == n - 1
            || tags[i + 1].as_ref().starts_with('B')
            || label_suffix(tag) != label_suffix(tags[i + 1].as_ref());
        if closes {
            out.push(')');
        }
        conll.push(out);
    }
    conll
}

/// Read labelled spans back out of CoNLL bracket tags.
/// Unclosed spans are closed at the end of the sentence.
pub fn conll_to_spans<S: AsRef<str>>(conll: &[S]) -> Vec<LabeledSpan> {
    let mut spans = Vec::new();
    let mut open: Option<(String, usize)> = None;

    for (i, tag) in conll.iter().enumerate() {
        let tag = tag.as_ref();
        if let Some(rest) = tag.strip_prefix('(') {
            if let Some((label, start)) = open.take() {
                spans.push(LabeledSpan::new(label, start, i.saturating_sub(1)));
            }
            let label = rest.split('*').next().unwrap_or("");
            open = Some((label.to_string(), i));
        }
        if tag.ends_with(')') {
            if let Some((label, start)) = open.take() {
                spans.push(LabeledSpan::new(label, start, i));
            }
        }
    }
    if let Some((label, start)) = open {
        spans.push(LabeledSpan::new(label, start, conll.len() - 1));
    }
    spans
}

/// BIO transition potentials for a label inventory.
///
/// Returns `(pairwise, start)` where `pairwise[i][j]` scores the
/// transition from label `i` to label `j`.
pub fn allowed_transitions<S: AsRef<str>>(labels: &[S]) -> (Vec<Vec<f32>>, Vec<f32>) {
    let n = labels.len();
    let mut pairwise = vec![vec![0.0f32; n]; n];
    let mut start    = vec![0.0f32; n];

    for (j, label) in labels.iter().enumerate() {
        let label = label.as_ref();
        if !label.starts_with('I') {
            continue;
        }
        start[j] = f32::NEG_INFINITY;
        let matching_begin = format!("B{}", label_suffix(label));
        for (i, previous) in labels.iter().enumerate() {
            if i != j && previous.as_ref() != matching_begin {
                pairwise[i][j] = f32::NEG_INFINITY;
            }
        }
    }
    (pairwise, start)
}

/// Most likely label sequence under per-position scores and
/// transition potentials. Ties resolve to the lowest label index.
pub fn viterbi_decode(
    scores:   &[Vec<f32>],
    pairwise: &[Vec<f32>],
    start:    &[f32],
) -> Vec<usize> {
    if scores.is_empty() {
        return Vec::new();
    }
    let n_labels = start.len();

    let mut path_scores: Vec<f32> = (0..n_labels)
        .map(|j| scores[0][j] + start[j])
        .collect();
    let mut backpointers: Vec<Vec<usize>> = Vec::with_capacity(scores.len());

    for step in &scores[1..] {
        let mut next    = vec![f32::NEG_INFINITY; n_labels];
        let mut pointer = vec![0usize; n_labels];
        for j in 0..n_labels {
            let mut best       = f32::NEG_INFINITY;
            let mut best_index = 0usize;
            for i in 0..n_labels {
                let candidate = path_scores[i] + pairwise[i][j];
                if candidate > best {
                    best       = candidate;
                    best_index = i;
                }
            }
            next[j]    = best + step[j];
            pointer[j] = best_index;
        }
        path_scores = next;
        backpointers.push(pointer);
    }

    let mut last = 0usize;
    for j in 1..n_labels {
        if path_scores[j] > path_scores[last] {
            last = j;
        }
    }

    let mut path = vec![last];
    for pointer in backpointers.iter().rev() {
        last = pointer[last];
        path.push(last);
    }
    path.reverse();
    path
}
