// Acquisition module - where sample frames come from
//
// The core never talks to the ADC/sensor driver directly. Anything that can
// hand over plain sample buffers implements FrameSource:
// - ProcessingChannels: frames pushed by a driver thread through FrameQueue
// - VecSource: pre-recorded frames (tests, fixtures)
// - SyntheticSource: seeded sine mixtures for demos and soak tests

pub mod frame_queue;
pub mod synthetic;

pub use frame_queue::{AcquisitionChannels, FrameQueue, ProcessingChannels};
pub use synthetic::{SyntheticSource, ToneSpec};

use std::collections::VecDeque;

/// Producer of sample frames
///
/// `None` means no frame is available right now; callers decide whether to
/// retry after their next sleep or give up.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Option<Vec<f32>>;
}

/// Adapter turning a closure into a FrameSource
pub struct FnSource<F>(pub F);

impl<F> FrameSource for FnSource<F>
where
    F: FnMut() -> Option<Vec<f32>> + Send,
{
    fn next_frame(&mut self) -> Option<Vec<f32>> {
        (self.0)()
    }
}

/// Source replaying a fixed list of frames once
#[derive(Debug, Default, Clone)]
pub struct VecSource {
    frames: VecDeque<Vec<f32>>,
}

impl VecSource {
    pub fn new(frames: Vec<Vec<f32>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// Split a continuous recording into consecutive frames
    ///
    /// A trailing partial frame is dropped.
    pub fn from_samples(samples: &[f32], frame_len: usize) -> Self {
        Self::new(
            samples
                .chunks_exact(frame_len.max(1))
                .map(|chunk| chunk.to_vec())
                .collect(),
        )
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Option<Vec<f32>> {
        self.frames.pop_front()
    }
}
