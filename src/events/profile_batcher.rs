//! # Profile Event Batcher
//!
//! Accumulates profiling events per component and hands them off in batches.
//!
//! ## Overview
//!
//! Recording is a lock-free push onto a per-[`ComponentKey`] queue, so hot
//! paths never wait on the profile table. A flush takes everything recorded
//! for a key before the flush started; events recorded concurrently land in
//! the next batch. Batches the sink rejects are requeued and go out first on
//! the next delivery. Sink failures stay here and never reach task paths.

use crate::models::{ComponentKey, ProfileBatch, ProfileEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Error types for profile table writes
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProfileSinkError {
    #[error("Profile table unavailable: {0}")]
    Unavailable(String),
    #[error("Profile batch rejected: {0}")]
    Rejected(String),
}

/// Destination of profile batches, typically the control store's profile table
#[async_trait]
pub trait ProfileSink: Send + Sync {
    async fn write(&self, batch: &ProfileBatch) -> Result<(), ProfileSinkError>;
}

/// Outcome of one [`ProfileEventBatcher::deliver`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub batches_written: usize,
    pub events_written: usize,
    pub batches_requeued: usize,
}

impl DeliveryReport {
    pub fn is_clean(&self) -> bool {
        self.batches_requeued == 0
    }
}

#[derive(Debug, Default)]
pub struct ProfileEventBatcher {
    queues: DashMap<ComponentKey, Arc<SegQueue<ProfileEvent>>>,
    requeued: Mutex<VecDeque<ProfileBatch>>,
}

impl ProfileEventBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: &ComponentKey, event: ProfileEvent) {
        // Fast path: the queue exists and only a read guard is needed.
        if let Some(queue) = self.queues.get(key) {
            queue.push(event);
            return;
        }
        self.queues
            .entry(key.clone())
            .or_insert_with(|| Arc::new(SegQueue::new()))
            .push(event);
    }

    /// Start a timed event that is recorded when the guard drops
    pub fn span(&self, key: &ComponentKey, event_type: impl Into<String>) -> ProfileSpan<'_> {
        ProfileSpan {
            batcher: self,
            key: key.clone(),
            event_type: event_type.into(),
            start: Utc::now(),
            extra_data: None,
        }
    }

    /// Take everything accumulated for `key`
    pub fn flush(&self, key: &ComponentKey) -> Option<ProfileBatch> {
        let queue = self.queues.get(key).map(|entry| Arc::clone(entry.value()))?;
        // Bound the drain so concurrent producers cannot keep it running.
        let pending = queue.len();
        let events: Vec<ProfileEvent> = (0..pending).map_while(|_| queue.pop()).collect();
        if events.is_empty() {
            return None;
        }
        Some(ProfileBatch::new(key, events))
    }

    /// Requeued batches first, then one batch per non-empty key
    pub fn flush_all(&self) -> Vec<ProfileBatch> {
        let mut batches: Vec<ProfileBatch> = self.requeued.lock().drain(..).collect();
        let keys: Vec<ComponentKey> = self.queues.iter().map(|entry| entry.key().clone()).collect();
        batches.extend(keys.iter().filter_map(|key| self.flush(key)));
        batches
    }

    /// Hand back a batch the sink rejected
    pub fn requeue(&self, batch: ProfileBatch) {
        self.requeued.lock().push_back(batch);
    }

    /// Flush everything into `sink`, requeueing rejected batches
    pub async fn deliver(&self, sink: &dyn ProfileSink) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for batch in self.flush_all() {
            match sink.write(&batch).await {
                Ok(()) => {
                    report.batches_written += 1;
                    report.events_written += batch.len();
                }
                Err(e) => {
                    warn!(
                        component = %batch.key(),
                        events = batch.len(),
                        error = %e,
                        "Profile batch rejected, requeueing"
                    );
                    report.batches_requeued += 1;
                    self.requeue(batch);
                }
            }
        }
        if report.batches_written > 0 {
            debug!(
                batches = report.batches_written,
                events = report.events_written,
                "Profile batches delivered"
            );
        }
        report
    }

    /// Events recorded but not yet flushed, excluding requeued batches
    pub fn pending_events(&self) -> usize {
        self.queues.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn requeued_batches(&self) -> usize {
        self.requeued.lock().len()
    }
}

/// Guard recording one timed event on drop
#[derive(Debug)]
pub struct ProfileSpan<'a> {
    batcher: &'a ProfileEventBatcher,
    key: ComponentKey,
    event_type: String,
    start: DateTime<Utc>,
    extra_data: Option<serde_json::Value>,
}

impl ProfileSpan<'_> {
    pub fn set_extra_data(&mut self, extra_data: serde_json::Value) {
        self.extra_data = Some(extra_data);
    }

    pub fn with_extra_data(mut self, extra_data: serde_json::Value) -> Self {
        self.set_extra_data(extra_data);
        self
    }
}

impl Drop for ProfileSpan<'_> {
    fn drop(&mut self) {
        let event = ProfileEvent::new(
            std::mem::take(&mut self.event_type),
            self.start,
            Utc::now(),
            self.extra_data.as_ref(),
        );
        self.batcher.record(&self.key, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::profile_events;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn key(id: &str) -> ComponentKey {
        ComponentKey::new("worker", id, "10.0.0.1")
    }

    #[derive(Debug, Default)]
    struct FlakySink {
        fail: AtomicBool,
        written: Mutex<Vec<ProfileBatch>>,
    }

    #[async_trait]
    impl ProfileSink for FlakySink {
        async fn write(&self, batch: &ProfileBatch) -> Result<(), ProfileSinkError> {
            if self.fail.load(Ordering::Acquire) {
                return Err(ProfileSinkError::Unavailable("down".into()));
            }
            self.written.lock().push(batch.clone());
            Ok(())
        }
    }

    #[test]
    fn test_flush_partitions_by_key() {
        let batcher = ProfileEventBatcher::new();
        batcher.record(&key("a"), ProfileEvent::instant("x", None));
        batcher.record(&key("a"), ProfileEvent::instant("y", None));
        batcher.record(&key("b"), ProfileEvent::instant("z", None));

        let batch = batcher.flush(&key("a")).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.profile_events[0].event_type, "x");
        assert!(batcher.flush(&key("a")).is_none());
        assert_eq!(batcher.pending_events(), 1);
    }

    #[test]
    fn test_span_records_on_drop() {
        let batcher = ProfileEventBatcher::new();
        {
            let _span = batcher
                .span(&key("a"), profile_events::TASK_SUBMIT)
                .with_extra_data(json!({"task": 1}));
        }
        let batch = batcher.flush(&key("a")).unwrap();
        let event = &batch.profile_events[0];
        assert_eq!(event.event_type, profile_events::TASK_SUBMIT);
        assert!(event.end_time >= event.start_time);
        assert_eq!(event.extra_data, r#"{"task":1}"#);
    }

    #[tokio::test]
    async fn test_rejected_batch_goes_out_next_time() {
        let batcher = ProfileEventBatcher::new();
        let sink = FlakySink::default();
        batcher.record(&key("a"), ProfileEvent::instant("first", None));

        sink.fail.store(true, Ordering::Release);
        let report = batcher.deliver(&sink).await;
        assert_eq!(report.batches_requeued, 1);
        assert!(!report.is_clean());
        assert_eq!(batcher.requeued_batches(), 1);

        sink.fail.store(false, Ordering::Release);
        batcher.record(&key("a"), ProfileEvent::instant("second", None));
        let report = batcher.deliver(&sink).await;
        assert_eq!(report.batches_written, 2);
        assert_eq!(report.events_written, 2);

        let written = sink.written.lock();
        assert_eq!(written[0].profile_events[0].event_type, "first");
        assert_eq!(written[1].profile_events[0].event_type, "second");
    }

    #[test]
    fn test_concurrent_records_are_all_flushed() {
        let batcher = Arc::new(ProfileEventBatcher::new());
        let threads: Vec<_> = (0..4)
            .map(|t| {
                let batcher = Arc::clone(&batcher);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        batcher.record(&key("hot"), ProfileEvent::instant(format!("{t}-{i}"), None));
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        let total: usize = batcher.flush_all().iter().map(ProfileBatch::len).sum();
        assert_eq!(total, 1000);
    }
}
