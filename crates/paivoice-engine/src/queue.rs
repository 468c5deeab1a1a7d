//! Serial audio queue.
//!
//! One FIFO serves every request that wants voice output. The worker
//! dequeues strictly in order and fully finishes one item — external-audio
//! check, synthesis, playback — before touching the next, so at most one
//! player child exists at any instant. HTTP handlers enqueue and return
//! immediately; the completion receiver exists for tests and logging, not
//! for the caller's response.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use paivoice_core::VoiceError;

use crate::backend::SpeechRequest;
use crate::external_audio::external_audio_active;

/// Maximum queued items; a flood of producers drops the newest.
pub const QUEUE_DEPTH: usize = 64;

/// What happened to a queued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// The message was synthesised and played (or spoken directly).
    Spoken,
    /// The item was dropped without synthesis; the reason names why.
    Skipped(&'static str),
}

/// Completion result delivered to the enqueue receiver.
pub type SpeechResult = Result<SpeechOutcome, String>;

/// The dispatcher seam the queue worker drives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSink: Send + Sync {
    /// Speak one request to completion (synthesis plus playback).
    async fn speak(&self, request: &SpeechRequest) -> Result<(), VoiceError>;

    /// Player application name for the external-audio check.
    fn playback_application(&self) -> Option<&'static str>;
}

struct QueuedSpeech {
    request: SpeechRequest,
    done: oneshot::Sender<SpeechResult>,
}

/// Handle for enqueueing speech work.
#[derive(Clone)]
pub struct AudioQueue {
    tx: mpsc::Sender<QueuedSpeech>,
}

impl AudioQueue {
    /// Start the worker task and return the enqueue handle.
    #[must_use]
    pub fn start(sink: Arc<dyn SpeechSink>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(worker(rx, sink));
        Self { tx }
    }

    /// Enqueue a request; never blocks.
    ///
    /// The returned receiver resolves when the item has been processed,
    /// skipped or dropped. Callers that fire-and-forget simply drop it.
    pub fn enqueue(&self, request: SpeechRequest) -> oneshot::Receiver<SpeechResult> {
        let (done_tx, done_rx) = oneshot::channel();
        let item = QueuedSpeech {
            request,
            done: done_tx,
        };
        match self.tx.try_send(item) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(item)) => {
                warn!("Audio queue full, dropping newest notification");
                let _ = item.done.send(Ok(SpeechOutcome::Skipped("queue full")));
            }
            Err(mpsc::error::TrySendError::Closed(item)) => {
                error!("Audio queue worker is gone");
                let _ = item.done.send(Err("audio queue closed".to_string()));
            }
        }
        done_rx
    }
}

async fn worker(mut rx: mpsc::Receiver<QueuedSpeech>, sink: Arc<dyn SpeechSink>) {
    while let Some(item) = rx.recv().await {
        // Cooperative behaviour: if anything else is playing right now,
        // stay quiet instead of talking over it.
        if external_audio_active(sink.playback_application()).await {
            debug!("External audio active, skipping notification");
            let _ = item.done.send(Ok(SpeechOutcome::Skipped("external audio active")));
            continue;
        }

        let result = sink.speak(&item.request).await;
        let outcome = match result {
            Ok(()) => Ok(SpeechOutcome::Spoken),
            Err(e) => {
                error!(error = %e, "Notification could not be spoken");
                Err(e.to_string())
            }
        };
        let _ = item.done.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paivoice_core::Prosody;
    use std::sync::Mutex;
    use std::time::Duration;

    fn request(text: &str) -> SpeechRequest {
        SpeechRequest {
            text: text.to_string(),
            voice_id: "v1".to_string(),
            voice_name: None,
            prosody: Prosody::default(),
            volume: 1.0,
        }
    }

    /// Sink that records the order items arrive in and can stall.
    struct RecordingSink {
        spoken: Mutex<Vec<String>>,
        delay: Duration,
    }

    #[async_trait]
    impl SpeechSink for RecordingSink {
        async fn speak(&self, request: &SpeechRequest) -> Result<(), VoiceError> {
            tokio::time::sleep(self.delay).await;
            self.spoken.lock().unwrap().push(request.text.clone());
            Ok(())
        }

        fn playback_application(&self) -> Option<&'static str> {
            None
        }
    }

    #[tokio::test]
    async fn items_are_processed_in_fifo_order() {
        let sink = Arc::new(RecordingSink {
            spoken: Mutex::new(Vec::new()),
            delay: Duration::from_millis(5),
        });
        let queue = AudioQueue::start(Arc::clone(&sink) as Arc<dyn SpeechSink>);

        let receivers: Vec<_> = (0..5)
            .map(|i| queue.enqueue(request(&format!("message {i}"))))
            .collect();
        for rx in receivers {
            assert_eq!(rx.await.unwrap().unwrap(), SpeechOutcome::Spoken);
        }

        let spoken = sink.spoken.lock().unwrap().clone();
        let expected: Vec<String> = (0..5).map(|i| format!("message {i}")).collect();
        assert_eq!(spoken, expected);
    }

    /// Sink that asserts no two speak calls overlap.
    struct OverlapGuardSink {
        active: Mutex<bool>,
    }

    #[async_trait]
    impl SpeechSink for OverlapGuardSink {
        async fn speak(&self, _request: &SpeechRequest) -> Result<(), VoiceError> {
            {
                let mut flag = self.active.lock().unwrap();
                assert!(!*flag, "overlapping speak calls");
                *flag = true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            *self.active.lock().unwrap() = false;
            Ok(())
        }

        fn playback_application(&self) -> Option<&'static str> {
            None
        }
    }

    #[tokio::test]
    async fn next_item_starts_only_after_previous_returns() {
        let queue = AudioQueue::start(Arc::new(OverlapGuardSink {
            active: Mutex::new(false),
        }));
        let first = queue.enqueue(request("one"));
        let second = queue.enqueue(request("two"));
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn failures_resolve_the_completion_with_the_error() {
        let mut sink = MockSpeechSink::new();
        sink.expect_playback_application().returning(|| None);
        sink.expect_speak()
            .returning(|_| Err(VoiceError::Synthesis("all speech engines failed".to_string())));

        let queue = AudioQueue::start(Arc::new(sink));
        let result = queue.enqueue(request("doomed")).await.unwrap();
        let err = result.unwrap_err();
        assert!(err.contains("all speech engines failed"));
    }

    #[tokio::test]
    async fn overflow_drops_newest_with_skip_outcome() {
        let queue = AudioQueue::start(Arc::new(RecordingSink {
            spoken: Mutex::new(Vec::new()),
            delay: Duration::from_millis(5),
        }));
        // The single-threaded test runtime hasn't scheduled the worker
        // yet, so these enqueues fill the channel to exactly QUEUE_DEPTH.
        let receivers: Vec<_> = (0..QUEUE_DEPTH)
            .map(|i| queue.enqueue(request(&format!("m{i}"))))
            .collect();

        let overflow = queue.enqueue(request("overflow")).await.unwrap();
        assert_eq!(overflow.unwrap(), SpeechOutcome::Skipped("queue full"));

        // Accepted items still drain in order.
        for rx in receivers {
            assert_eq!(rx.await.unwrap().unwrap(), SpeechOutcome::Spoken);
        }
    }
}
