use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{log_softmax, softmax},
};

use crate::ml::encoder::{EncoderConfig, TransformerEncoder};

#[derive(Config, Debug)]
pub struct SrlModelConfig {
    pub encoder:           EncoderConfig,
    /// Size of the "labels" namespace
    pub num_labels:        usize,
    /// Size of the "frames_labels" namespace
    pub num_frames:        usize,
    #[config(default = 0.0)]
    pub embedding_dropout: f64,
    pub label_smoothing:   Option<f64>,
}

impl SrlModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SrlFrameModel<B> {
        let encoder = self.encoder.init(device);
        let d_model = self.encoder.d_model;
        SrlFrameModel {
            encoder,
            embedding_dropout: DropoutConfig::new(self.embedding_dropout).init(),
            tag_projection:    LinearConfig::new(d_model, self.num_labels).init(device),
            frame_projection:  LinearConfig::new(d_model, self.num_frames).init(device),
            label_smoothing:   self.label_smoothing.unwrap_or(0.0),
        }
    }
}

/// Encoder plus two heads: one role tag per wordpiece, one frame
/// per predicate (read off the predicate's first wordpiece).
#[derive(Module, Debug)]
pub struct SrlFrameModel<B: Backend> {
    pub encoder:           TransformerEncoder<B>,
    pub embedding_dropout: Dropout,
    pub tag_projection:    Linear<B>,
    pub frame_projection:  Linear<B>,
    pub label_smoothing:   f64,
}

pub struct SrlOutput<B: Backend> {
    /// [batch, seq_len, num_labels]
    pub logits:              Tensor<B, 3>,
    /// [batch, num_frames]
    pub frame_logits:        Tensor<B, 2>,
    pub class_probabilities: Tensor<B, 3>,
    pub frame_probabilities: Tensor<B, 2>,
    /// [batch, seq_len], kept to crop padding when decoding
    pub mask:                Tensor<B, 2, Int>,
}

pub struct SrlLoss<B: Backend> {
    /// (role_loss + frame_loss) / 2
    pub loss:       Tensor<B, 1>,
    pub role_loss:  Tensor<B, 1>,
    pub frame_loss: Tensor<B, 1>,
    pub output:     SrlOutput<B>,
}

impl<B: Backend> SrlFrameModel<B> {
    pub fn forward(
        &self,
        input_ids:       Tensor<B, 2, Int>,
        verb_indicator:  Tensor<B, 2, Int>,
        attention_mask:  Tensor<B, 2, Int>,
        frame_positions: Tensor<B, 1, Int>,
    ) -> SrlOutput<B> {
        let embedded = self.encoder.forward(input_ids, verb_indicator, attention_mask.clone());
        let embedded = self.embedding_dropout.forward(embedded);
        let [batch_size, _, d_model] = embedded.dims();

        // one row per example: the embedding at its frame position
        let index = frame_positions
            .reshape([batch_size, 1, 1])
            .expand([batch_size, 1, d_model]);
        let frame_embeddings = embedded
            .clone()
            .gather(1, index)
            .reshape([batch_size, d_model]);

        let logits       = self.tag_projection.forward(embedded);
        let frame_logits = self.frame_projection.forward(frame_embeddings);

        SrlOutput {
            class_probabilities: softmax(logits.clone(), 2),
            frame_probabilities: softmax(frame_logits.clone(), 1),
            logits,
            frame_logits,
            mask: attention_mask,
        }
    }

    pub fn forward_loss(
        &self,
        input_ids:       Tensor<B, 2, Int>,
        verb_indicator:  Tensor<B, 2, Int>,
        attention_mask:  Tensor<B, 2, Int>,
        frame_positions: Tensor<B, 1, Int>,
        tags:            Tensor<B, 2, Int>,
        frame_tags:      Tensor<B, 1, Int>,
    ) -> SrlLoss<B> {
        let output = self.forward(input_ids, verb_indicator, attention_mask, frame_positions);

        let smoothing = (self.label_smoothing > 0.0).then_some(self.label_smoothing);
        let role_loss = sequence_cross_entropy(
            output.logits.clone(),
            tags,
            output.mask.clone(),
            smoothing,
        );

        let ce = CrossEntropyLossConfig::new().init(&output.frame_logits.device());
        let frame_loss = ce.forward(output.frame_logits.clone(), frame_tags);

        SrlLoss {
            loss: (role_loss.clone() + frame_loss.clone()) / 2.0_f64,
            role_loss,
            frame_loss,
            output,
        }
    }
}

/// Masked token-level cross entropy: averaged over the real tokens of
/// each sequence, then over the sequences that have any real token.
///
/// With label smoothing `ls`, the target distribution puts
/// `1 - ls + ls / C` on the gold class and `ls / C` on every other one.
pub fn sequence_cross_entropy<B: Backend>(
    logits:          Tensor<B, 3>,
    targets:         Tensor<B, 2, Int>,
    mask:            Tensor<B, 2, Int>,
    label_smoothing: Option<f64>,
) -> Tensor<B, 1> {
    let [batch_size, seq_len, num_classes] = logits.dims();
    let log_probs = log_softmax(logits, 2);

    let nll = log_probs
        .clone()
        .gather(2, targets.reshape([batch_size, seq_len, 1]))
        .reshape([batch_size, seq_len])
        .neg();

    let per_token = match label_smoothing {
        Some(ls) if ls > 0.0 => {
            let uniform = log_probs
                .sum_dim(2)
                .reshape([batch_size, seq_len])
                .neg()
                .div_scalar(num_classes as f64);
            nll.mul_scalar(1.0 - ls) + uniform.mul_scalar(ls)
        }
        _ => nll,
    };

    let mask    = mask.float();
    let lengths = mask.clone().sum_dim(1).reshape([batch_size]);
    let per_sequence = (per_token * mask).sum_dim(1).reshape([batch_size])
        / (lengths.clone() + 1e-13);
    let non_empty = lengths.greater_elem(0.0).float().sum();

    per_sequence.sum() / (non_empty + 1e-13)
}
