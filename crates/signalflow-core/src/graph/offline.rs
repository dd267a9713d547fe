//! Offline rendering of whole buffers.

use super::processing::SignalFlow;
use crate::error::ProcessError;

impl SignalFlow {
    /// Renders `frames` samples per channel, block by block.
    ///
    /// `capture` holds one buffer per capture channel. Buffers shorter than
    /// `frames` (and the tail of the last block) are padded with silence.
    /// Returns one buffer of `frames` samples per playback channel.
    ///
    /// # Errors
    ///
    /// [`ProcessError::ChannelCount`] for the wrong number of capture buffers,
    /// or the first error returned by [`process`](Self::process).
    pub fn process_offline(
        &mut self,
        capture: &[Vec<f32>],
        frames: usize,
    ) -> Result<Vec<Vec<f32>>, ProcessError> {
        if capture.len() != self.capture_channels() {
            return Err(ProcessError::ChannelCount {
                direction: "capture",
                expected: self.capture_channels(),
                actual: capture.len(),
            });
        }
        let block_length = self.config().block_length;
        let mut output = vec![vec![0.0; frames]; self.playback_channels()];
        let mut capture_block = vec![vec![0.0f32; block_length]; capture.len()];
        let mut playback_block = vec![vec![0.0f32; block_length]; self.playback_channels()];

        for start in (0..frames).step_by(block_length) {
            let chunk = block_length.min(frames - start);
            for (block, source) in capture_block.iter_mut().zip(capture) {
                block.fill(0.0);
                let available = source.len().saturating_sub(start).min(chunk);
                if available > 0 {
                    block[..available].copy_from_slice(&source[start..start + available]);
                }
            }

            let inputs: Vec<&[f32]> = capture_block.iter().map(Vec::as_slice).collect();
            let mut outputs: Vec<&mut [f32]> =
                playback_block.iter_mut().map(Vec::as_mut_slice).collect();
            self.process(&inputs, &mut outputs)?;

            for (out, block) in output.iter_mut().zip(&playback_block) {
                out[start..start + chunk].copy_from_slice(&block[..chunk]);
            }
        }
        Ok(output)
    }
}
