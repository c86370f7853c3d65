//! Notification pipeline
//!
//! Decouples the transport's notification context from slower application
//! logic. Listeners attached to a [`DeviceSession`](crate::session::DeviceSession)
//! push frames into an unbounded queue through a [`PipelineProducer`] and
//! return immediately; a single consumer loop drains the queue.
//!
//! Shutdown is cooperative. Once the [`CancelToken`] is raised producers stop
//! enqueueing, and the consumer drains whatever is still queued before it
//! exits. Frames queued before the signal are never discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::session::{FeatureFrame, FrameListener};
use crate::types::CancelToken;
use crate::BlueStResult;

// ----------------------------------------------------------------------------
// Producer
// ----------------------------------------------------------------------------

/// Non-blocking entry point into the pipeline
#[derive(Debug, Clone)]
pub struct PipelineProducer {
    queue: mpsc::UnboundedSender<FeatureFrame>,
    cancel: CancelToken,
    dropped: Arc<AtomicU64>,
}

impl PipelineProducer {
    /// Queue a frame; returns `false` if it was dropped
    pub fn push(&self, frame: FeatureFrame) -> bool {
        if self.cancel.is_cancelled() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if self.queue.send(frame).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Pipeline consumer gone, dropping frame");
            return false;
        }
        true
    }

    /// Frames refused since the pipeline was created
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl FrameListener for PipelineProducer {
    fn on_frame(&self, frame: &FeatureFrame) {
        self.push(frame.clone());
    }
}

// ----------------------------------------------------------------------------
// Pipeline
// ----------------------------------------------------------------------------

/// Counters reported when the consumer loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub processed: u64,
    pub failed: u64,
}

/// Single-consumer queue of decoded frames
pub struct NotificationPipeline {
    sender: mpsc::UnboundedSender<FeatureFrame>,
    receiver: mpsc::UnboundedReceiver<FeatureFrame>,
    cancel: CancelToken,
    idle_wait: Duration,
    dropped: Arc<AtomicU64>,
}

impl NotificationPipeline {
    pub fn new(config: &PipelineConfig, cancel: CancelToken) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver,
            cancel,
            idle_wait: config.idle_wait,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Handle for the producing side; subscribe it to a session
    pub fn producer(&self) -> PipelineProducer {
        PipelineProducer {
            queue: self.sender.clone(),
            cancel: self.cancel.clone(),
            dropped: self.dropped.clone(),
        }
    }

    /// Drain the queue until cancelled and empty
    ///
    /// A handler error is logged and counted; the loop carries on with the
    /// next frame. The loop also ends once every producer is dropped and the
    /// queue is empty.
    pub async fn run<F>(self, mut handler: F) -> PipelineStats
    where
        F: FnMut(FeatureFrame) -> BlueStResult<()>,
    {
        let Self {
            sender,
            mut receiver,
            cancel,
            idle_wait,
            dropped,
        } = self;
        drop(sender);

        let mut stats = PipelineStats::default();
        let mut dispatch = |frame: FeatureFrame, stats: &mut PipelineStats| {
            let features = frame.features();
            match handler(frame) {
                Ok(()) => stats.processed += 1,
                Err(e) => {
                    stats.failed += 1;
                    warn!("Failed to process {} frame: {}", features, e);
                }
            }
        };

        loop {
            if cancel.is_cancelled() {
                // Refuse late sends so the drain below has a fixed end.
                receiver.close();
                while let Ok(frame) = receiver.try_recv() {
                    dispatch(frame, &mut stats);
                }
                debug!("Pipeline cancelled, queue drained");
                break;
            }

            match timeout(idle_wait, receiver.recv()).await {
                Ok(Some(frame)) => dispatch(frame, &mut stats),
                Ok(None) => {
                    debug!("All pipeline producers dropped");
                    break;
                }
                Err(_) => continue,
            }
        }

        info!(
            "Pipeline stopped: {} processed, {} failed, {} dropped",
            stats.processed,
            stats.failed,
            dropped.load(Ordering::Relaxed)
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{DecodedPayload, MotionAxes, Payloads};
    use crate::session::FeatureSource;
    use crate::transport::CharacteristicHandle;
    use crate::types::{FeatureMask, Timestamp};
    use crate::BlueStError;
    use uuid::Uuid;

    fn frame(device_timestamp: u16) -> FeatureFrame {
        let mut payloads = Payloads::new();
        payloads.push(DecodedPayload::MotionAxes(MotionAxes { x: 1, y: 2, z: 3 }));
        FeatureFrame {
            source: FeatureSource {
                handle: CharacteristicHandle::new(Uuid::nil(), Uuid::nil()),
                features: FeatureMask::ACCELEROMETER,
            },
            received_at: Timestamp::new(0),
            device_timestamp,
            payloads,
        }
    }

    #[tokio::test]
    async fn test_queued_frames_survive_cancellation() {
        let cancel = CancelToken::new();
        let pipeline = NotificationPipeline::new(&PipelineConfig::default(), cancel.clone());
        let producer = pipeline.producer();

        for i in 0..5 {
            assert!(producer.push(frame(i)));
        }
        cancel.cancel();
        assert!(!producer.push(frame(99)));

        let mut seen = Vec::new();
        let stats = pipeline
            .run(|f| {
                seen.push(f.device_timestamp);
                Ok(())
            })
            .await;

        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(stats.processed, 5);
        assert_eq!(producer.dropped(), 1);
    }

    #[tokio::test]
    async fn test_handler_error_does_not_stop_loop() {
        let cancel = CancelToken::new();
        let pipeline = NotificationPipeline::new(&PipelineConfig::default(), cancel.clone());
        let producer = pipeline.producer();

        for i in 0..4 {
            producer.push(frame(i));
        }
        cancel.cancel();

        let stats = pipeline
            .run(|f| {
                if f.device_timestamp % 2 == 0 {
                    Err(BlueStError::TruncatedFrame {
                        expected: 8,
                        available: 2,
                    })
                } else {
                    Ok(())
                }
            })
            .await;

        assert_eq!(stats, PipelineStats { processed: 2, failed: 2 });
    }

    #[tokio::test]
    async fn test_sends_during_drain_are_refused() {
        let cancel = CancelToken::new();
        let pipeline = NotificationPipeline::new(&PipelineConfig::default(), cancel.clone());
        // A producer whose own token never fires still loses once the
        // consumer has started draining.
        let unaware = PipelineProducer {
            queue: pipeline.sender.clone(),
            cancel: CancelToken::new(),
            dropped: pipeline.dropped.clone(),
        };

        for i in 0..3 {
            assert!(unaware.push(frame(i)));
        }
        cancel.cancel();

        let mut seen = Vec::new();
        let mut refused = 0;
        let stats = pipeline
            .run(|f| {
                seen.push(f.device_timestamp);
                if !unaware.push(frame(f.device_timestamp + 100)) {
                    refused += 1;
                }
                Ok(())
            })
            .await;

        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(stats.processed, 3);
        assert_eq!(refused, 3);
        assert_eq!(unaware.dropped(), 3);
    }

    #[tokio::test]
    async fn test_exits_when_producers_dropped() {
        let pipeline = NotificationPipeline::new(&PipelineConfig::default(), CancelToken::new());
        let producer = pipeline.producer();
        producer.push(frame(7));
        drop(producer);

        let stats = pipeline.run(|_| Ok(())).await;
        assert_eq!(stats.processed, 1);
    }
}
