// ============================================================
// Layer 4 — JSON-lines Corpus Loader
// ============================================================
// Reads predicate-annotated sentences, one JSON object per line:
//
//   {"words": ["The","cat","ate"], "lemma": "eat", "verb_index": 2,
//    "frame": "EAT_BITE", "tags": ["B-ARG0","I-ARG0","B-V"]}
//
// "frame" and "tags" may be omitted for unlabelled input.
// Blank lines are skipped. A malformed line fails the whole
// load with the offending line number.

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::domain::srl_instance::SrlInstance;
use crate::domain::traits::InstanceSource;

/// Loads `SrlInstance`s from a `.jsonl` file.
pub struct JsonlLoader {
    path: String,
}

impl JsonlLoader {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl InstanceSource for JsonlLoader {
    fn load_all(&self) -> Result<Vec<SrlInstance>> {
        let path = Path::new(&self.path);
        let file = File::open(path)
            .with_context(|| format!("Cannot open corpus '{}'", path.display()))?;

        let instances = parse_jsonl(BufReader::new(file))
            .with_context(|| format!("Invalid corpus '{}'", path.display()))?;

        tracing::info!("Loaded {} instances from '{}'", instances.len(), path.display());
        Ok(instances)
    }
}

/// Parse JSON-lines instances from any buffered reader.
pub fn parse_jsonl(reader: impl BufRead) -> Result<Vec<SrlInstance>> {
    let mut instances = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.with_context(|| format!("Cannot read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let instance: SrlInstance = serde_json::from_str(&line)
            .with_context(|| format!("Line {line_no} is not a valid instance"))?;
        instance
            .validate()
            .with_context(|| format!("Line {line_no} is inconsistent"))?;
        instances.push(instance);
    }
    Ok(instances)
}
