// ============================================================
// Layer 4 — SRL Batcher
// ============================================================
// Implements Burn's Batcher trait to stack SrlSamples into
// tensors for the forward pass.
//
// Sentences have different wordpiece lengths, so each batch is
// padded to its own longest sequence:
//
//   input_ids       [batch, seq]   padded with 0 ([PAD])
//   attention_mask  [batch, seq]   1 = real piece, 0 = padding
//   verb_indicator  [batch, seq]   padded with 0
//   frame_positions [batch]        first piece of each predicate
//   tags            [batch, seq]   only when every sample is labelled
//   frame_tags      [batch]        only when every sample is labelled
//
// Metadata travels with the batch untouched for decoding.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::{SrlMetadata, SrlSample};

#[derive(Debug, Clone)]
pub struct SrlBatch<B: Backend> {
    pub input_ids:       Tensor<B, 2, Int>,
    pub attention_mask:  Tensor<B, 2, Int>,
    pub verb_indicator:  Tensor<B, 2, Int>,
    pub frame_positions: Tensor<B, 1, Int>,
    pub tags:            Option<Tensor<B, 2, Int>>,
    pub frame_tags:      Option<Tensor<B, 1, Int>>,
    pub metadata:        Vec<SrlMetadata>,
}

#[derive(Clone, Debug)]
pub struct SrlBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SrlBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Pad every row to `seq_len` and build a [rows, seq_len] tensor.
    fn padded<T: Copy>(
        &self,
        rows:    impl Iterator<Item = Vec<T>>,
        seq_len: usize,
        to_i32:  impl Fn(T) -> i32,
    ) -> Tensor<B, 2, Int> {
        let mut flat: Vec<i32> = Vec::new();
        let mut count = 0usize;
        for row in rows {
            let len = row.len();
            flat.extend(row.into_iter().map(&to_i32));
            flat.extend(std::iter::repeat(0).take(seq_len - len));
            count += 1;
        }
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([count, seq_len])
    }
}

impl<B: Backend> Batcher<SrlSample, SrlBatch<B>> for SrlBatcher<B> {
    fn batch(&self, items: Vec<SrlSample>) -> SrlBatch<B> {
        let seq_len = items.iter().map(SrlSample::seq_len).max().unwrap_or(0);

        let input_ids = self.padded(
            items.iter().map(|s| s.input_ids.clone()),
            seq_len,
            |x| x as i32,
        );
        let attention_mask = self.padded(
            items.iter().map(|s| vec![1u32; s.seq_len()]),
            seq_len,
            |x| x as i32,
        );
        let verb_indicator = self.padded(
            items.iter().map(|s| s.verb_indicator.clone()),
            seq_len,
            |x| x as i32,
        );

        let positions: Vec<i32> = items.iter().map(|s| s.frame_position as i32).collect();
        let frame_positions = Tensor::<B, 1, Int>::from_ints(positions.as_slice(), &self.device);

        let labelled = !items.is_empty() && items.iter().all(SrlSample::is_labelled);
        let (tags, frame_tags) = if labelled {
            let tags = self.padded(
                items.iter().filter_map(|s| s.tag_ids.clone()),
                seq_len,
                |x| x as i32,
            );
            let frames: Vec<i32> = items
                .iter()
                .filter_map(|s| s.frame_id)
                .map(|f| f as i32)
                .collect();
            let frame_tags = Tensor::<B, 1, Int>::from_ints(frames.as_slice(), &self.device);
            (Some(tags), Some(frame_tags))
        } else {
            (None, None)
        };

        SrlBatch {
            input_ids,
            attention_mask,
            verb_indicator,
            frame_positions,
            tags,
            frame_tags,
            metadata: items.into_iter().map(|s| s.metadata).collect(),
        }
    }
}
