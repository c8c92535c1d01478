// FrameQueue - lock-free frame hand-off with recycled buffers
//
// Two SPSC ring buffers move pre-allocated frames between the acquisition
// thread (sensor driver) and the processing thread without allocating:
// - data queue: acquisition pushes filled frames, processing consumes
// - pool queue: processing returns spent frames, acquisition refills them
//
// Frame flow:
// 1. Acquisition pops an empty frame from the pool queue
// 2. Acquisition fills it and pushes it to the data queue
// 3. Processing pops it from the data queue and runs the pipeline
// 4. Processing pushes it back to the pool queue

use rtrb::{Consumer, Producer};

use crate::acquisition::FrameSource;

/// Configuration constants for the frame queue
pub const DEFAULT_FRAME_COUNT: usize = 8;

/// Sample frame buffer
pub type FrameBuffer = Vec<f32>;

/// Acquisition-side handles
pub struct AcquisitionChannels {
    /// Filled frames towards the processing thread
    pub data_producer: Producer<FrameBuffer>,
    /// Empty frames coming back for reuse
    pub pool_consumer: Consumer<FrameBuffer>,
}

/// Processing-side handles
pub struct ProcessingChannels {
    /// Filled frames from the acquisition thread
    pub data_consumer: Consumer<FrameBuffer>,
    /// Spent frames returned for reuse
    pub pool_producer: Producer<FrameBuffer>,
}

/// Pre-allocated pool of frames shared between two threads
pub struct FrameQueue;

impl FrameQueue {
    /// Allocate `frame_count` frames of `frame_len` samples
    ///
    /// # Panics
    /// Panics if frame_count is 0 or frame_len is 0
    pub fn new(frame_count: usize, frame_len: usize) -> (AcquisitionChannels, ProcessingChannels) {
        assert!(frame_count > 0, "frame_count must be greater than 0");
        assert!(frame_len > 0, "frame_len must be greater than 0");

        let (mut pool_producer, pool_consumer) = rtrb::RingBuffer::new(frame_count);
        let (data_producer, data_consumer) = rtrb::RingBuffer::new(frame_count);

        // The only allocation point for frames
        for _ in 0..frame_count {
            pool_producer
                .push(vec![0.0_f32; frame_len])
                .expect("pool queue sized for frame_count");
        }

        (
            AcquisitionChannels {
                data_producer,
                pool_consumer,
            },
            ProcessingChannels {
                data_consumer,
                pool_producer,
            },
        )
    }
}

impl AcquisitionChannels {
    /// Copy `samples` into a recycled frame and queue it
    ///
    /// Returns false when no empty frame is available or the data queue is
    /// full; the samples are dropped in that case.
    pub fn publish(&mut self, samples: &[f32]) -> bool {
        let mut frame = match self.pool_consumer.pop() {
            Ok(frame) => frame,
            Err(_) => return false,
        };

        frame.clear();
        frame.extend_from_slice(samples);
        self.data_producer.push(frame).is_ok()
    }
}

impl ProcessingChannels {
    /// Take the next filled frame, if one is waiting
    pub fn try_recv(&mut self) -> Option<FrameBuffer> {
        self.data_consumer.pop().ok()
    }

    /// Hand a spent frame back to the acquisition side
    pub fn recycle(&mut self, frame: FrameBuffer) {
        if self.pool_producer.push(frame).is_err() {
            log::warn!("[FrameQueue] Pool queue full, dropping frame buffer");
        }
    }

    pub fn is_abandoned(&self) -> bool {
        self.data_consumer.is_abandoned() && self.data_consumer.is_empty()
    }
}

impl FrameSource for ProcessingChannels {
    /// Pops a waiting frame; returns a copy so the buffer goes straight back
    /// to the pool.
    fn next_frame(&mut self) -> Option<Vec<f32>> {
        let frame = self.try_recv()?;
        let copy = frame.clone();
        self.recycle(frame);
        Some(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_circulate() {
        let (mut acquisition, mut processing) = FrameQueue::new(2, 4);

        assert!(acquisition.publish(&[1.0, 2.0, 3.0, 4.0]));
        assert!(acquisition.publish(&[5.0, 6.0, 7.0, 8.0]));
        // Pool exhausted until processing recycles
        assert!(!acquisition.publish(&[0.0; 4]));

        let first = processing.try_recv().unwrap();
        assert_eq!(first, vec![1.0, 2.0, 3.0, 4.0]);
        processing.recycle(first);

        assert!(acquisition.publish(&[9.0; 4]));
        assert_eq!(processing.next_frame().unwrap(), vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!(processing.next_frame().unwrap(), vec![9.0; 4]);
        assert!(processing.next_frame().is_none());
    }

    #[test]
    fn test_across_threads() {
        let (mut acquisition, mut processing) = FrameQueue::new(DEFAULT_FRAME_COUNT, 128);

        let producer = std::thread::spawn(move || {
            let mut sent = 0;
            while sent < 20 {
                if acquisition.publish(&vec![sent as f32; 128]) {
                    sent += 1;
                } else {
                    std::thread::yield_now();
                }
            }
        });

        let mut received = Vec::new();
        while received.len() < 20 {
            match processing.next_frame() {
                Some(frame) => received.push(frame[0]),
                None => std::thread::yield_now(),
            }
        }
        producer.join().unwrap();

        let expected: Vec<f32> = (0..20).map(|i| i as f32).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn test_abandoned_after_producer_dropped() {
        let (acquisition, processing) = FrameQueue::new(1, 4);
        assert!(!processing.is_abandoned());
        drop(acquisition);
        assert!(processing.is_abandoned());
    }

    #[test]
    #[should_panic(expected = "frame_count must be greater than 0")]
    fn test_zero_frame_count_panics() {
        FrameQueue::new(0, 128);
    }
}
