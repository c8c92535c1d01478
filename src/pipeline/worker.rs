// Pipeline worker thread
//
// Consumes frames from the FrameQueue processing side until the running
// flag drops (and the queue is drained) or the acquisition side goes away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::acquisition::ProcessingChannels;
use crate::pipeline::AttentionPipeline;

/// Idle wait when the queue is empty
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Move `pipeline` onto its own thread, fed by `channels`
///
/// The thread hands the pipeline back when it exits so callers can inspect
/// the final scorer state.
pub fn spawn_pipeline_thread(
    mut pipeline: AttentionPipeline,
    mut channels: ProcessingChannels,
    running: Arc<AtomicBool>,
) -> JoinHandle<AttentionPipeline> {
    thread::spawn(move || {
        tracing::info!("[PipelineThread] Starting processing loop");
        let mut processed: u64 = 0;

        loop {
            let frame = match channels.try_recv() {
                Some(frame) => frame,
                None => {
                    if !running.load(Ordering::SeqCst) || channels.is_abandoned() {
                        break;
                    }
                    thread::sleep(IDLE_SLEEP);
                    continue;
                }
            };

            if let Err(err) = pipeline.process_frame(&frame) {
                log::warn!("[PipelineThread] Dropped frame: {}", err);
            } else {
                processed += 1;
            }
            channels.recycle(frame);
        }

        tracing::info!("[PipelineThread] Exiting after {} frames", processed);
        pipeline
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{FrameQueue, FrameSource, SyntheticSource};
    use crate::config::AppConfig;

    #[test]
    fn test_worker_scores_frames_from_queue() {
        let pipeline = AttentionPipeline::from_config(&AppConfig::default()).unwrap();
        let latest = pipeline.latest_handle();
        let (mut acquisition, processing) = FrameQueue::new(4, 128);
        let running = Arc::new(AtomicBool::new(true));

        let handle = spawn_pipeline_thread(pipeline, processing, Arc::clone(&running));

        let mut source = SyntheticSource::focused(9).with_limit(6);
        while let Some(frame) = source.next_frame() {
            while !acquisition.publish(&frame) {
                thread::sleep(Duration::from_millis(1));
            }
        }
        drop(acquisition);

        let pipeline = handle.join().unwrap();
        assert_eq!(pipeline.scorer().snapshot().sequence, 6);
        assert_eq!(latest.get().unwrap().sequence, 6);
    }

    #[test]
    fn test_worker_stops_on_flag() {
        let pipeline = AttentionPipeline::from_config(&AppConfig::default()).unwrap();
        let (_acquisition, processing) = FrameQueue::new(2, 128);
        let running = Arc::new(AtomicBool::new(true));

        let handle = spawn_pipeline_thread(pipeline, processing, Arc::clone(&running));
        running.store(false, Ordering::SeqCst);

        let pipeline = handle.join().unwrap();
        assert_eq!(pipeline.scorer().snapshot().sequence, 0);
    }
}
