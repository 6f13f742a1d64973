// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
//   1. `train`    — trains the model on a JSONL corpus
//   2. `predict`  — labels predicates with a checkpoint
//   3. `evaluate` — scores a labelled corpus with a checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{bail, Result};
use clap::Parser;
use commands::{Commands, EvaluateArgs, PredictArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "srl-frames",
    version = "0.1.0",
    about = "Semantic role labelling with frame identification on a transformer encoder."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Predict(args)  => run_predict(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.train_path);
    let use_case = TrainUseCase::new(args.into());
    let history  = use_case.execute()?;

    if let Some(last) = history.last() {
        println!(
            "Training complete after {} epochs (val_loss={:.4}). Checkpoint saved.",
            last.epoch, last.val_loss,
        );
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let Some(input) = args.input() else {
        bail!("Give either --input or --sentence with --verb-index and --lemma");
    };
    let use_case = PredictUseCase::new(&args.checkpoint_dir, &args.lemma_frames)?;
    use_case.execute(&input, std::io::stdout().lock())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let use_case = EvaluateUseCase::new(args.checkpoint_dir, args.lemma_frames);
    let report   = use_case.execute(&args.data_path)?;
    for line in report.lines() {
        println!("{line}");
    }
    Ok(())
}
