// ============================================================
// Layer 4 — Label Vocabulary
// ============================================================
// Maps output labels to contiguous indices, per namespace:
//
//   "labels"         wordpiece-level BIO role tags
//   "frames_labels"  predicate frame labels
//
// Both namespaces are non-padded: index 0 is a real label.
// For every B-X tag the matching I-X is also registered, since
// a multi-piece word continues its span with I-X pieces.
//
// Persisted as JSON next to the checkpoints so inference
// decodes with exactly the indices the model was trained on.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    path::Path,
};

use crate::domain::srl_instance::SrlInstance;

pub const LABELS: &str = "labels";
pub const FRAMES: &str = "frames_labels";

/// On-disk layout: namespace → labels in index order
#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    namespaces: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "VocabularyFile", into = "VocabularyFile")]
pub struct Vocabulary {
    tokens:  BTreeMap<String, Vec<String>>,
    indices: HashMap<String, HashMap<String, usize>>,
}

impl From<VocabularyFile> for Vocabulary {
    fn from(file: VocabularyFile) -> Self {
        Self::from_namespaces(file.namespaces)
    }
}

impl From<Vocabulary> for VocabularyFile {
    fn from(vocab: Vocabulary) -> Self {
        Self { namespaces: vocab.tokens }
    }
}

impl Vocabulary {
    pub fn from_namespaces(tokens: BTreeMap<String, Vec<String>>) -> Self {
        let indices = tokens
            .iter()
            .map(|(ns, list)| {
                let index = list
                    .iter()
                    .enumerate()
                    .map(|(i, t)| (t.clone(), i))
                    .collect();
                (ns.clone(), index)
            })
            .collect();
        Self { tokens, indices }
    }

    /// Build both namespaces from gold annotations.
    pub fn from_instances<'a>(instances: impl IntoIterator<Item = &'a SrlInstance>) -> Self {
        let mut labels: BTreeSet<String> = BTreeSet::new();
        let mut frames: BTreeSet<String> = BTreeSet::new();
        labels.insert("O".to_string());

        for inst in instances {
            if let Some(tags) = &inst.tags {
                for tag in tags {
                    if let Some(bare) = tag.strip_prefix("B-") {
                        labels.insert(format!("I-{bare}"));
                    }
                    labels.insert(tag.clone());
                }
            }
            if let Some(frame) = &inst.frame {
                frames.insert(frame.clone());
            }
        }

        let mut tokens = BTreeMap::new();
        tokens.insert(LABELS.to_string(), labels.into_iter().collect());
        tokens.insert(FRAMES.to_string(), frames.into_iter().collect());
        Self::from_namespaces(tokens)
    }

    pub fn token_index(&self, namespace: &str, token: &str) -> Option<usize> {
        self.indices.get(namespace)?.get(token).copied()
    }

    pub fn token(&self, namespace: &str, index: usize) -> Option<&str> {
        self.tokens.get(namespace)?.get(index).map(String::as_str)
    }

    pub fn tokens(&self, namespace: &str) -> &[String] {
        self.tokens.get(namespace).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn size(&self, namespace: &str) -> usize {
        self.tokens(namespace).len()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read vocabulary from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn instance(tags: &str, frame: &str) -> SrlInstance {
        let tags: Vec<String> = tags.split_whitespace().map(String::from).collect();
        let words = vec!["w".to_string(); tags.len()];
        SrlInstance::new(words, "w", 0).with_gold(frame, tags)
    }

    #[test]
    fn test_labels_include_inside_variants() {
        let vocab = Vocabulary::from_instances(&[instance("B-ARG0 B-V", "EAT")]);
        assert_eq!(vocab.tokens(LABELS), ["B-ARG0", "B-V", "I-ARG0", "I-V", "O"]);
        assert_eq!(vocab.token_index(LABELS, "O"), Some(4));
        assert_eq!(vocab.token(LABELS, 0), Some("B-ARG0"));
    }

    #[test]
    fn test_frames_deduplicated_and_sorted() {
        let vocab = Vocabulary::from_instances(&[
            instance("B-V", "RUN"),
            instance("B-V", "EAT"),
            instance("B-V", "RUN"),
        ]);
        assert_eq!(vocab.tokens(FRAMES), ["EAT", "RUN"]);
        assert_eq!(vocab.size(FRAMES), 2);
    }

    #[test]
    fn test_unknown_lookups() {
        let vocab = Vocabulary::from_instances(&[instance("B-V", "EAT")]);
        assert_eq!(vocab.token_index(FRAMES, "DRINK"), None);
        assert_eq!(vocab.token_index("missing", "EAT"), None);
        assert_eq!(vocab.token(FRAMES, 9), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("vocabulary.json");
        let vocab = Vocabulary::from_instances(&[instance("B-ARG1 B-V", "GIVE")]);
        vocab.save(&path).unwrap();
        let loaded = Vocabulary::load(&path).unwrap();
        assert_eq!(loaded.tokens(LABELS), vocab.tokens(LABELS));
        assert_eq!(loaded.token_index(FRAMES, "GIVE"), Some(0));
    }
}
