// ============================================================
// Layer 5 — Evaluation Metrics
// ============================================================
// Two measures, accumulated over batches until reset:
//
//   SpanF1Scorer    CoNLL-style SRL span scoring. A predicted
//                   argument counts only if label, start and end
//                   all match a gold argument. The predicate span
//                   (V) is ignored because the model is given it.
//                   As in srl-eval.pl, a C-X span continues the
//                   closest preceding X argument and is scored as
//                   part of it; an argument with pieces only counts
//                   when every piece matches. R-X stays its own
//                   label. A C-X with no preceding X keeps C-X.
//
//   FrameF1Measure  micro-averaged precision / recall / F1 over
//                   frame labels.
//
// SrlMetrics bundles both and produces the flat metrics map
// reported after each epoch:
//   precision_role, recall_role, f1_role,
//   precision_frame, recall_frame, fscore_frame

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::bio::{conll_to_spans, LabeledSpan};

const EPS: f64 = 1e-13;

/// One scored argument: its label and the word ranges it covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Argument {
    label:  String,
    pieces: Vec<(usize, usize)>,
}

/// Fold `C-X` continuation spans into the preceding `X` argument.
fn merge_continuations(spans: Vec<LabeledSpan>) -> Vec<Argument> {
    let mut args: Vec<Argument> = Vec::new();
    for span in spans {
        if let Some(base) = span.label.strip_prefix("C-") {
            if let Some(arg) = args.iter_mut().rev().find(|a| a.label == base) {
                arg.pieces.push((span.start, span.end));
                continue;
            }
        }
        args.push(Argument { label: span.label, pieces: vec![(span.start, span.end)] });
    }
    args
}

fn precision_recall_f1(tp: usize, fp: usize, fn_: usize) -> (f64, f64, f64) {
    let precision = tp as f64 / (tp as f64 + fp as f64 + EPS);
    let recall    = tp as f64 / (tp as f64 + fn_ as f64 + EPS);
    let f1        = 2.0 * precision * recall / (precision + recall + EPS);
    (precision, recall, f1)
}

#[derive(Debug, Clone, Default)]
pub struct SpanF1Scorer {
    ignore_classes: HashSet<String>,
    true_positives:  HashMap<String, usize>,
    false_positives: HashMap<String, usize>,
    false_negatives: HashMap<String, usize>,
}

impl SpanF1Scorer {
    pub fn new<S: Into<String>>(ignore_classes: impl IntoIterator<Item = S>) -> Self {
        Self {
            ignore_classes: ignore_classes.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    fn arguments<S: AsRef<str>>(&self, conll: &[S]) -> HashSet<Argument> {
        merge_continuations(conll_to_spans(conll))
            .into_iter()
            .filter(|a| !self.ignore_classes.contains(&a.label))
            .collect()
    }

    /// Score one batch: predicted and gold tags in CoNLL format,
    /// one sequence per predicate.
    pub fn observe<S: AsRef<str>>(&mut self, predicted: &[Vec<S>], gold: &[Vec<S>]) {
        for (pred, gold) in predicted.iter().zip(gold) {
            let pred = self.arguments(pred);
            let gold = self.arguments(gold);
            for arg in pred.intersection(&gold) {
                *self.true_positives.entry(arg.label.clone()).or_insert(0) += 1;
            }
            for arg in pred.difference(&gold) {
                *self.false_positives.entry(arg.label.clone()).or_insert(0) += 1;
            }
            for arg in gold.difference(&pred) {
                *self.false_negatives.entry(arg.label.clone()).or_insert(0) += 1;
            }
        }
    }

    /// Per-class and overall `precision-X`, `recall-X`, `f1-measure-X`.
    pub fn get_metric(&mut self, reset: bool) -> BTreeMap<String, f64> {
        let mut labels: Vec<&String> = self
            .true_positives
            .keys()
            .chain(self.false_positives.keys())
            .chain(self.false_negatives.keys())
            .collect();
        labels.sort();
        labels.dedup();

        let count = |map: &HashMap<String, usize>, label: &str| map.get(label).copied().unwrap_or(0);

        let mut metrics = BTreeMap::new();
        for label in labels {
            let (p, r, f) = precision_recall_f1(
                count(&self.true_positives, label),
                count(&self.false_positives, label),
                count(&self.false_negatives, label),
            );
            metrics.insert(format!("precision-{label}"), p);
            metrics.insert(format!("recall-{label}"), r);
            metrics.insert(format!("f1-measure-{label}"), f);
        }

        let (p, r, f) = precision_recall_f1(
            self.true_positives.values().sum(),
            self.false_positives.values().sum(),
            self.false_negatives.values().sum(),
        );
        metrics.insert("precision-overall".to_string(), p);
        metrics.insert("recall-overall".to_string(), r);
        metrics.insert("f1-measure-overall".to_string(), f);

        if reset {
            self.reset();
        }
        metrics
    }

    pub fn reset(&mut self) {
        self.true_positives.clear();
        self.false_positives.clear();
        self.false_negatives.clear();
    }
}

/// Micro-averaged F1 over single-label frame predictions.
#[derive(Debug, Clone, Default)]
pub struct FrameF1Measure {
    true_positives:  usize,
    false_positives: usize,
    false_negatives: usize,
}

impl FrameF1Measure {
    pub fn observe(&mut self, predicted: &[usize], gold: &[usize]) {
        for (p, g) in predicted.iter().zip(gold) {
            if p == g {
                self.true_positives += 1;
            } else {
                self.false_positives += 1;
                self.false_negatives += 1;
            }
        }
    }

    /// `precision`, `recall`, `fscore`
    pub fn get_metric(&mut self, reset: bool) -> BTreeMap<String, f64> {
        let (p, r, f) = precision_recall_f1(
            self.true_positives,
            self.false_positives,
            self.false_negatives,
        );
        if reset {
            *self = Self::default();
        }
        BTreeMap::from([
            ("precision".to_string(), p),
            ("recall".to_string(), r),
            ("fscore".to_string(), f),
        ])
    }
}

/// Role span metric plus frame metric.
#[derive(Debug, Clone)]
pub struct SrlMetrics {
    span_metric:        Option<SpanF1Scorer>,
    frame_metric:       FrameF1Measure,
    ignore_span_metric: bool,
}

impl SrlMetrics {
    /// `span_metric = false` disables span scoring altogether.
    pub fn new(span_metric: bool, ignore_span_metric: bool) -> Self {
        Self {
            span_metric: span_metric.then(|| SpanF1Scorer::new(["V"])),
            frame_metric: FrameF1Measure::default(),
            ignore_span_metric,
        }
    }

    /// Spans are only scored outside training; frames always.
    pub fn observe<S: AsRef<str>>(
        &mut self,
        predicted_conll: &[Vec<S>],
        gold_conll:      &[Vec<S>],
        predicted_frames: &[usize],
        gold_frames:      &[usize],
        training:         bool,
    ) {
        if !training && !self.ignore_span_metric {
            if let Some(span) = self.span_metric.as_mut() {
                span.observe(predicted_conll, gold_conll);
            }
        }
        self.frame_metric.observe(predicted_frames, gold_frames);
    }

    /// Overall metrics only. Empty when span metrics are ignored.
    pub fn get_metrics(&mut self, reset: bool) -> BTreeMap<String, f64> {
        if self.ignore_span_metric {
            if reset {
                self.frame_metric = FrameF1Measure::default();
            }
            return BTreeMap::new();
        }

        let mut metrics = BTreeMap::new();
        if let Some(span) = self.span_metric.as_mut() {
            for (name, value) in span.get_metric(reset) {
                if name.contains("overall") {
                    let head = name.split('-').next().unwrap_or(&name).to_string();
                    metrics.insert(format!("{head}_role"), value);
                }
            }
        }
        for (name, value) in self.frame_metric.get_metric(reset) {
            metrics.insert(format!("{name}_frame"), value);
        }
        metrics
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bio::bio_to_conll;

    fn conll(bio: &str) -> Vec<String> {
        let tags: Vec<&str> = bio.split_whitespace().collect();
        bio_to_conll(&tags)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_perfect_prediction() {
        let mut scorer = SpanF1Scorer::new(["V"]);
        let gold = vec![conll("B-ARG0 I-ARG0 B-V B-ARG1")];
        scorer.observe(&gold, &gold);
        let m = scorer.get_metric(false);
        assert!(close(m["f1-measure-overall"], 1.0));
        assert!(!m.contains_key("f1-measure-V"));
    }

    #[test]
    fn test_partial_overlap_counts_as_wrong() {
        let mut scorer = SpanF1Scorer::new(["V"]);
        let gold = vec![conll("B-ARG0 I-ARG0 B-V B-ARG1")];
        let pred = vec![conll("B-ARG0 O B-V B-ARG1")];
        scorer.observe(&pred, &gold);
        let m = scorer.get_metric(true);
        // ARG1 right, ARG0 boundary wrong: 1 tp, 1 fp, 1 fn
        assert!(close(m["precision-overall"], 0.5));
        assert!(close(m["recall-overall"], 0.5));
        assert!(close(m["f1-measure-ARG1"], 1.0));
        assert!(close(m["f1-measure-ARG0"], 0.0));
        // reset clears counts
        assert!(close(scorer.get_metric(false)["f1-measure-overall"], 0.0));
    }

    #[test]
    fn test_continuation_scored_with_its_argument() {
        let mut scorer = SpanF1Scorer::new(["V"]);
        let gold = vec![conll("B-ARG1 I-ARG1 B-V B-C-ARG1 B-R-ARG0")];
        scorer.observe(&gold, &gold);
        let m = scorer.get_metric(true);
        assert!(close(m["f1-measure-ARG1"], 1.0));
        assert!(close(m["f1-measure-R-ARG0"], 1.0));
        assert!(!m.contains_key("f1-measure-C-ARG1"));

        // missing the continuation piece makes the whole ARG1 wrong
        let pred = vec![conll("B-ARG1 I-ARG1 B-V O B-R-ARG0")];
        scorer.observe(&pred, &gold);
        let m = scorer.get_metric(true);
        assert!(close(m["f1-measure-ARG1"], 0.0));
        assert!(close(m["precision-overall"], 0.5));
        assert!(close(m["recall-overall"], 0.5));
    }

    #[test]
    fn test_orphan_continuation_keeps_its_label() {
        let mut scorer = SpanF1Scorer::new(["V"]);
        let gold = vec![conll("B-V B-C-ARG1")];
        scorer.observe(&gold, &gold);
        assert!(close(scorer.get_metric(false)["f1-measure-C-ARG1"], 1.0));
    }

    #[test]
    fn test_frame_micro_f1() {
        let mut frames = FrameF1Measure::default();
        frames.observe(&[0, 1, 2, 2], &[0, 1, 1, 2]);
        let m = frames.get_metric(true);
        assert!(close(m["precision"], 0.75));
        assert!(close(m["recall"], 0.75));
        assert!(close(m["fscore"], 0.75));
    }

    #[test]
    fn test_srl_metrics_keys() {
        let mut metrics = SrlMetrics::new(true, false);
        let gold = vec![conll("B-ARG0 B-V")];
        metrics.observe(&gold, &gold, &[1], &[1], false);
        let m = metrics.get_metrics(true);
        let keys: Vec<&str> = m.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["f1_role", "fscore_frame", "precision_frame", "precision_role", "recall_frame", "recall_role"]
        );
        assert!(close(m["f1_role"], 1.0));
    }

    #[test]
    fn test_training_batches_skip_span_metric() {
        let mut metrics = SrlMetrics::new(true, false);
        let gold = vec![conll("B-ARG0 B-V")];
        let pred = vec![conll("O B-V")];
        metrics.observe(&pred, &gold, &[0], &[0], true);
        let m = metrics.get_metrics(false);
        assert!(close(m["recall_role"], 0.0));
        assert!(close(m["fscore_frame"], 1.0));
    }

    #[test]
    fn test_ignored_span_metric_reports_nothing() {
        let mut metrics = SrlMetrics::new(true, true);
        let gold = vec![conll("B-ARG0 B-V")];
        metrics.observe(&gold, &gold, &[0], &[0], false);
        assert!(metrics.get_metrics(true).is_empty());
    }
}
