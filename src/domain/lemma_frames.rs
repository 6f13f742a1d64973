// ============================================================
// Layer 3 — Lemma → Frame Inventory
// ============================================================
// Maps a predicate lemma to the frames it may evoke.
// Loaded once from a flat text resource, one lemma per line:
//
//   eat   EAT_BITE
//   run   MOVE-BY_MEANS-OF-TRANSPORTATION  RUN
//   run   OPERATE
//
// A lemma listed on several lines accumulates all of its frames
// in file order ("run" above has three candidates).

use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::Path};

/// Default location of the inventory relative to the working directory
pub const DEFAULT_LEMMA_FRAMES_PATH: &str = "resources/lemma2frame.csv";

#[derive(Debug, Clone, Default)]
pub struct LemmaFrameTable {
    frames: HashMap<String, Vec<String>>,
}

impl LemmaFrameTable {
    /// Read the inventory from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read lemma/frame inventory '{}'", path.display()))?;
        let table = Self::parse(&text);
        tracing::info!(
            "Loaded frame candidates for {} lemmas from '{}'",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse inventory text. Blank lines are ignored.
    pub fn parse(text: &str) -> Self {
        let mut frames: HashMap<String, Vec<String>> = HashMap::new();
        for line in text.lines() {
            let mut fields = line.split_whitespace();
            if let Some(lemma) = fields.next() {
                frames
                    .entry(lemma.to_string())
                    .or_default()
                    .extend(fields.map(String::from));
            }
        }
        Self { frames }
    }

    /// Candidate frames for a lemma; empty when the lemma is unknown.
    pub fn candidates(&self, lemma: &str) -> &[String] {
        self.frames.get(lemma).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_single_line() {
        let table = LemmaFrameTable::parse("eat EAT_BITE\n");
        assert_eq!(table.candidates("eat"), ["EAT_BITE".to_string()]);
    }

    #[test]
    fn test_repeated_lemma_accumulates() {
        let table = LemmaFrameTable::parse("run RUN MOVE\n\nrun OPERATE\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.candidates("run"), ["RUN", "MOVE", "OPERATE"]);
    }

    #[test]
    fn test_unknown_lemma_is_empty() {
        let table = LemmaFrameTable::parse("eat EAT_BITE");
        assert!(table.candidates("drink").is_empty());
    }

    #[test]
    fn test_lemma_without_frames() {
        let table = LemmaFrameTable::parse("be\n");
        assert_eq!(table.len(), 1);
        assert!(table.candidates("be").is_empty());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "give GIVE_GIFT\ttransfer").unwrap();
        let table = LemmaFrameTable::from_path(file.path()).unwrap();
        assert_eq!(table.candidates("give"), ["GIVE_GIFT", "transfer"]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = LemmaFrameTable::from_path("/nonexistent/lemma2frame.csv").unwrap_err();
        assert!(err.to_string().contains("lemma2frame.csv"));
    }
}
