// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Manages the wordpiece tokenizer shared by training and
// inference. Two ways to obtain one:
//
//   1. A HuggingFace `tokenizer.json` supplied with --tokenizer
//      (e.g. a BERT WordPiece tokenizer). It is copied into the
//      checkpoint directory so inference uses the same one.
//   2. Otherwise a word-level tokenizer is built from the words
//      of the training corpus and written in the same format.
//
// The word-level tokenizer JSON is written by hand instead of
// going through the `tokenizers` trainers, whose Trainer::Model
// type must equal ModelWrapper in tokenizers 0.15.

use anyhow::{Context, Result};
use std::{collections::HashMap, path::PathBuf, str::FromStr};
use tokenizers::Tokenizer;

const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    /// Use the supplied tokenizer if any, else the one already in
    /// the checkpoint directory, else build one from `words`.
    pub fn load_or_build<'a>(
        &self,
        pretrained: Option<&str>,
        words:      impl IntoIterator<Item = &'a str>,
        vocab_size: usize,
    ) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create tokenizer directory '{}'", self.dir.display()))?;
        let tok_path = self.dir.join(TOKENIZER_FILE);

        if let Some(src) = pretrained {
            tracing::info!("Using tokenizer from '{}'", src);
            let tokenizer = Tokenizer::from_file(src)
                .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", src, e))?;
            tokenizer
                .save(&tok_path, true)
                .map_err(|e| anyhow::anyhow!("Cannot copy tokenizer to '{}': {}", tok_path.display(), e))?;
            return Ok(tokenizer);
        }

        if tok_path.exists() {
            tracing::warn!(
                "Reusing existing tokenizer '{}'; it is not rebuilt from the current corpus. \
                 Delete it or pass --tokenizer to change it",
                tok_path.display()
            );
            return self.load();
        }

        tracing::info!("Building word-level tokenizer (vocab_size={})", vocab_size);
        let tokenizer = word_level_tokenizer(words, vocab_size)?;
        tokenizer
            .save(&tok_path, true)
            .map_err(|e| anyhow::anyhow!("Cannot write tokenizer JSON to '{}': {}", tok_path.display(), e))?;
        Ok(tokenizer)
    }

    /// Load the tokenizer saved in the checkpoint directory.
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.dir.join(TOKENIZER_FILE);
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load tokenizer from '{}': {}", path.display(), e
            ))
    }
}

/// Size the token embedding must have to cover every id the
/// tokenizer can emit. Word-level vocabularies leave gaps below
/// the special-token ids, so the largest id decides.
pub fn embedding_size(tokenizer: &Tokenizer) -> usize {
    tokenizer
        .get_vocab(true)
        .values()
        .copied()
        .max()
        .map(|id| id as usize + 1)
        .unwrap_or(0)
}

/// Build an in-memory word-level tokenizer over `words`.
pub fn word_level_tokenizer<'a>(
    words:      impl IntoIterator<Item = &'a str>,
    vocab_size: usize,
) -> Result<Tokenizer> {
    let json = word_level_tokenizer_json(words, vocab_size);
    Tokenizer::from_str(&json.to_string())
        .map_err(|e| anyhow::anyhow!("Cannot build word-level tokenizer: {e}"))
}

/// HuggingFace tokenizer JSON for a word-level model over the
/// `vocab_size - 5` most frequent words. Special tokens keep BERT ids.
fn word_level_tokenizer_json<'a>(
    words:      impl IntoIterator<Item = &'a str>,
    vocab_size: usize,
) -> serde_json::Value {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for word in words {
        let lower = word.to_lowercase();
        let trimmed = lower.trim_matches(|c: char| !c.is_alphanumeric());
        // punctuation-only words stay as they are
        let key = if trimmed.is_empty() { lower.as_str() } else { trimmed };
        if !key.is_empty() {
            *freq.entry(key.to_string()).or_insert(0) += 1;
        }
    }

    // frequency descending, then alphabetical for a stable vocabulary
    let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(vocab_size.saturating_sub(5));

    let mut vocab = serde_json::json!({
        "[PAD]":  0,
        "[UNK]":  1,
        "[CLS]":  101,
        "[SEP]":  102,
        "[MASK]": 103,
    });
    let mut next_id = 104usize;
    for (word, _) in &ranked {
        if vocab.get(word).is_none() {
            vocab[word] = serde_json::json!(next_id);
            next_id += 1;
        }
    }

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0,   "content": "[PAD]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 1,   "content": "[UNK]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 101, "content": "[CLS]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 102, "content": "[SEP]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 103, "content": "[MASK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": {
            "type": "Whitespace"
        },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_level_tokenizer_known_and_unknown() {
        let tok = word_level_tokenizer(["The", "cat", "ate", "the", "fish"], 100).unwrap();
        let the = tok.token_to_id("the").unwrap();
        // "the" is the most frequent word
        assert_eq!(the, 104);
        let enc = tok.encode("zebra", false).unwrap();
        assert_eq!(enc.get_ids(), &[1]);
    }

    #[test]
    fn test_vocab_size_limit() {
        let tok = word_level_tokenizer(["a", "b", "c", "d"], 7).unwrap();
        // 5 special tokens + 2 words
        assert_eq!(tok.get_vocab_size(false), 7);
    }

    #[test]
    fn test_embedding_size_covers_special_ids() {
        let tok = word_level_tokenizer(["x"], 10).unwrap();
        assert_eq!(embedding_size(&tok), 105);
    }

    #[test]
    fn test_load_or_build_writes_and_reloads() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path().to_string_lossy().to_string());
        let built = store.load_or_build(None, ["run", "ran"], 50).unwrap();
        assert!(dir.path().join(TOKENIZER_FILE).exists());
        let loaded = store.load().unwrap();
        assert_eq!(built.token_to_id("run"), loaded.token_to_id("run"));
    }

    #[test]
    fn test_existing_tokenizer_is_reused_not_rebuilt() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path().to_string_lossy().to_string());
        store.load_or_build(None, ["run"], 50).unwrap();

        let reused = store.load_or_build(None, ["swim"], 50).unwrap();
        assert!(reused.token_to_id("run").is_some());
        assert_eq!(reused.token_to_id("swim"), None);
    }

    #[test]
    fn test_directory_blocked_by_file_is_error() {
        let dir     = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("tok");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = TokenizerStore::new(blocker.to_string_lossy().to_string());
        assert!(store.load_or_build(None, ["run"], 50).is_err());
    }
}
