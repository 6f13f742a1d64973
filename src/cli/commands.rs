// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `predict` and `evaluate`
// and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::predict_use_case::PredictInput;
use crate::application::train_use_case::TrainConfig;
use crate::domain::lemma_frames::DEFAULT_LEMMA_FRAMES_PATH;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the role labelling and frame model on a JSONL corpus
    Train(TrainArgs),

    /// Label predicates with a trained checkpoint
    Predict(PredictArgs),

    /// Score a labelled JSONL corpus with a trained checkpoint
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training corpus, one JSON instance per line
    #[arg(long, default_value = "data/train.jsonl")]
    pub train_path: String,

    /// Validation corpus; without it part of the training data is held out
    #[arg(long)]
    pub validation_path: Option<String>,

    /// Directory to save model checkpoints, tokenizer and vocabulary
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Lemma → candidate frames inventory
    #[arg(long, default_value = DEFAULT_LEMMA_FRAMES_PATH)]
    pub lemma_frames: String,

    /// HuggingFace tokenizer.json to use instead of a word-level one
    #[arg(long)]
    pub tokenizer: Option<String>,

    /// Model record (without .mpk.gz) whose encoder weights seed training
    #[arg(long)]
    pub encoder_init: Option<String>,

    /// Maximum number of wordpieces per sentence, [CLS] and [SEP] included
    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 5e-5)]
    pub lr: f64,

    /// Hidden dimension of the transformer
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Dropout on the encoder output, before both heads
    #[arg(long, default_value_t = 0.0)]
    pub embedding_dropout: f64,

    /// Label smoothing for the role tag loss
    #[arg(long)]
    pub label_smoothing: Option<f64>,

    /// Do not compute role span metrics at all
    #[arg(long)]
    pub no_span_metric: bool,

    /// Compute but do not report metrics
    #[arg(long)]
    pub ignore_span_metric: bool,

    /// Vocabulary size of a newly built word-level tokenizer
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    /// Fraction kept for training when no validation file is given
    #[arg(long, default_value_t = 0.9)]
    pub train_fraction: f64,

    /// Seed for the train/validation split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_path:         a.train_path,
            validation_path:    a.validation_path,
            checkpoint_dir:     a.checkpoint_dir,
            lemma_frames_path:  a.lemma_frames,
            tokenizer_path:     a.tokenizer,
            encoder_init:       a.encoder_init,
            max_seq_len:        a.max_seq_len,
            batch_size:         a.batch_size,
            epochs:             a.epochs,
            lr:                 a.lr,
            d_model:            a.d_model,
            num_heads:          a.num_heads,
            num_layers:         a.num_layers,
            d_ff:               a.d_ff,
            dropout:            a.dropout,
            embedding_dropout:  a.embedding_dropout,
            label_smoothing:    a.label_smoothing,
            span_metric:        !a.no_span_metric,
            ignore_span_metric: a.ignore_span_metric,
            vocab_size:         a.vocab_size,
            train_fraction:     a.train_fraction,
            seed:               a.seed,
            num_workers:        a.num_workers,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JSONL file of instances to label
    #[arg(long, conflicts_with = "sentence")]
    pub input: Option<String>,

    /// A single whitespace-tokenised sentence
    #[arg(long, requires_all = ["verb_index", "lemma"])]
    pub sentence: Option<String>,

    /// Word position of the predicate in --sentence
    #[arg(long)]
    pub verb_index: Option<usize>,

    /// Lemma of the predicate in --sentence
    #[arg(long)]
    pub lemma: Option<String>,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = DEFAULT_LEMMA_FRAMES_PATH)]
    pub lemma_frames: String,
}

impl PredictArgs {
    pub fn input(&self) -> Option<PredictInput> {
        if let Some(path) = &self.input {
            return Some(PredictInput::Jsonl(path.clone()));
        }
        match (&self.sentence, self.verb_index, &self.lemma) {
            (Some(sentence), Some(verb_index), Some(lemma)) => Some(PredictInput::Sentence {
                sentence: sentence.clone(),
                verb_index,
                lemma: lemma.clone(),
            }),
            _ => None,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Labelled JSONL corpus to score
    #[arg(long)]
    pub data_path: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = DEFAULT_LEMMA_FRAMES_PATH)]
    pub lemma_frames: String,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_args_into_config() {
        let cli = Cli::try_parse_from([
            "srl-frames", "train",
            "--train-path", "train.jsonl",
            "--epochs", "3",
            "--label-smoothing", "0.1",
            "--no-span-metric",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.train_path, "train.jsonl");
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.label_smoothing, Some(0.1));
        assert!(!cfg.span_metric);
        assert_eq!(cfg.lemma_frames_path, DEFAULT_LEMMA_FRAMES_PATH);
    }

    #[test]
    fn test_predict_sentence_input() {
        let cli = Cli::try_parse_from([
            "srl-frames", "predict",
            "--sentence", "the cat ate",
            "--verb-index", "2",
            "--lemma", "eat",
        ])
        .unwrap();
        let Commands::Predict(args) = cli.command else { panic!("expected predict") };
        assert!(matches!(
            args.input(),
            Some(PredictInput::Sentence { verb_index: 2, .. })
        ));
    }

    #[test]
    fn test_predict_sentence_requires_lemma() {
        let parsed = Cli::try_parse_from([
            "srl-frames", "predict",
            "--sentence", "the cat ate",
            "--verb-index", "2",
        ]);
        assert!(parsed.is_err());
    }
}
