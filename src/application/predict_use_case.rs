// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Labels predicates with a trained checkpoint. Input is either
// a JSONL file of instances or one sentence given on the
// command line; output is one JSON prediction per line.

use anyhow::{bail, Result};
use std::io::Write;

use crate::data::loader::JsonlLoader;
use crate::domain::lemma_frames::LemmaFrameTable;
use crate::domain::srl_instance::{SrlInstance, SrlPrediction};
use crate::domain::traits::{InstanceSource, RoleLabeler};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::Inferencer;

/// Where the instances to label come from.
#[derive(Debug, Clone)]
pub enum PredictInput {
    Jsonl(String),
    Sentence {
        sentence:   String,
        verb_index: usize,
        lemma:      String,
    },
}

impl PredictInput {
    pub fn instances(&self) -> Result<Vec<SrlInstance>> {
        match self {
            PredictInput::Jsonl(path) => JsonlLoader::new(path).load_all(),
            PredictInput::Sentence { sentence, verb_index, lemma } => {
                let words: Vec<String> = sentence.split_whitespace().map(String::from).collect();
                let instance = SrlInstance::new(words, lemma.clone(), *verb_index);
                instance.validate()?;
                Ok(vec![instance])
            }
        }
    }
}

pub struct PredictUseCase {
    labeler: Box<dyn RoleLabeler>,
}

impl PredictUseCase {
    pub fn new(checkpoint_dir: &str, lemma_frames_path: &str) -> Result<Self> {
        let ckpt_manager = CheckpointManager::new(checkpoint_dir)?;
        let lemma_frames = LemmaFrameTable::from_path(lemma_frames_path)?;
        let inferencer   = Inferencer::from_checkpoint_default(&ckpt_manager, lemma_frames)?;
        Ok(Self::with_labeler(Box::new(inferencer)))
    }

    pub fn with_labeler(labeler: Box<dyn RoleLabeler>) -> Self {
        Self { labeler }
    }

    pub fn predict(&self, input: &PredictInput) -> Result<Vec<SrlPrediction>> {
        let instances = input.instances()?;
        if instances.is_empty() {
            bail!("Nothing to label");
        }
        tracing::info!("Labelling {} predicates", instances.len());
        self.labeler.label_all(&instances)
    }

    /// Predict and write one JSON object per line to `out`.
    pub fn execute(&self, input: &PredictInput, mut out: impl Write) -> Result<()> {
        for prediction in self.predict(input)? {
            writeln!(out, "{}", serde_json::to_string(&prediction)?)?;
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// Tags every word O and echoes the lemma as frame.
    struct EchoLabeler;

    impl RoleLabeler for EchoLabeler {
        fn label(&self, inst: &SrlInstance) -> Result<SrlPrediction> {
            let tags = vec!["O".to_string(); inst.words.len()];
            Ok(SrlPrediction {
                words:      inst.words.clone(),
                verb:       inst.verb().to_string(),
                verb_index: inst.verb_index,
                lemma:      inst.lemma.clone(),
                conll_tags: vec!["*".to_string(); inst.words.len()],
                tags,
                frame:      inst.lemma.to_uppercase(),
            })
        }
    }

    #[test]
    fn test_sentence_input() {
        let use_case = PredictUseCase::with_labeler(Box::new(EchoLabeler));
        let input = PredictInput::Sentence {
            sentence:   "the cat ate fish".into(),
            verb_index: 2,
            lemma:      "eat".into(),
        };
        let mut out = Vec::new();
        use_case.execute(&input, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let pred: SrlPrediction = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(pred.verb, "ate");
        assert_eq!(pred.frame, "EAT");
    }

    #[test]
    fn test_sentence_with_bad_verb_index() {
        let use_case = PredictUseCase::with_labeler(Box::new(EchoLabeler));
        let input = PredictInput::Sentence {
            sentence:   "the cat".into(),
            verb_index: 4,
            lemma:      "eat".into(),
        };
        assert!(use_case.predict(&input).is_err());
    }

    #[test]
    fn test_jsonl_input_one_line_per_instance() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.jsonl");
        std::fs::write(
            &path,
            "{\"words\":[\"a\",\"b\"],\"lemma\":\"be\",\"verb_index\":1}\n\
             {\"words\":[\"c\"],\"lemma\":\"see\",\"verb_index\":0}\n",
        )
        .unwrap();

        let use_case = PredictUseCase::with_labeler(Box::new(EchoLabeler));
        let mut out = Vec::new();
        use_case
            .execute(&PredictInput::Jsonl(path.to_string_lossy().to_string()), &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }
}
