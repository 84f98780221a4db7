//! Tracking sink: downstream hand-off with asynchronous delivery reports.
//!
//! Every submitted batch gets a [`DeliveryId`]. Exactly one [`DeliveryInfo`]
//! is reported per batch once the consumer accepts or rejects it, which is
//! what the flow-control gate listens to.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use super::record::Record;
use crate::error::SinkError;

/// Identifier of one submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeliveryId(u64);

impl DeliveryId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Outcome of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryInfo {
    pub id: DeliveryId,
    /// `false` when the consumer rejected or dropped the batch.
    pub delivered: bool,
}

/// Stream of delivery reports consumed by the gate-release listener.
pub type DeliveryReceiver = mpsc::UnboundedReceiver<DeliveryInfo>;

/// Downstream consumer that confirms batches asynchronously.
pub trait TrackingSink: Send + Sync {
    /// Hand a batch downstream.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Closed`] if the consumer has gone away; no
    /// delivery report will follow in that case.
    fn submit(&self, batch: Vec<Record>) -> Result<DeliveryId, SinkError>;
}

/// Create a channel-backed tracking sink.
///
/// Returns the sink, the consumer side receiving batches, and the stream of
/// delivery reports.
#[must_use]
pub fn tracking_channel() -> (ChannelSink, BatchReceiver, DeliveryReceiver) {
    let (batch_tx, batch_rx) = mpsc::unbounded_channel();
    let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
    (
        ChannelSink {
            next_id: AtomicU64::new(1),
            batch_tx,
            delivery_tx,
        },
        BatchReceiver { rx: batch_rx },
        delivery_rx,
    )
}

/// Sink half of [`tracking_channel`].
#[derive(Debug)]
pub struct ChannelSink {
    next_id: AtomicU64,
    batch_tx: mpsc::UnboundedSender<TrackedBatch>,
    delivery_tx: mpsc::UnboundedSender<DeliveryInfo>,
}

impl TrackingSink for ChannelSink {
    fn submit(&self, batch: Vec<Record>) -> Result<DeliveryId, SinkError> {
        let id = DeliveryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tracked = TrackedBatch {
            id,
            records: batch,
            delivery_tx: Some(self.delivery_tx.clone()),
        };

        if let Err(mpsc::error::SendError(mut rejected)) = self.batch_tx.send(tracked) {
            // Nobody will ever confirm this batch
            rejected.delivery_tx = None;
            return Err(SinkError::Closed);
        }
        Ok(id)
    }
}

/// Consumer half of [`tracking_channel`].
#[derive(Debug)]
pub struct BatchReceiver {
    rx: mpsc::UnboundedReceiver<TrackedBatch>,
}

impl BatchReceiver {
    /// Wait for the next batch. Returns `None` once the sink is dropped and
    /// drained.
    pub async fn recv(&mut self) -> Option<TrackedBatch> {
        self.rx.recv().await
    }

    /// Take a batch if one is ready.
    pub fn try_recv(&mut self) -> Option<TrackedBatch> {
        self.rx.try_recv().ok()
    }
}

/// A batch awaiting acknowledgement. Dropping it unacknowledged reports it as
/// not delivered.
#[derive(Debug)]
pub struct TrackedBatch {
    id: DeliveryId,
    records: Vec<Record>,
    delivery_tx: Option<mpsc::UnboundedSender<DeliveryInfo>>,
}

impl TrackedBatch {
    /// Identifier of this batch.
    #[must_use]
    pub const fn id(&self) -> DeliveryId {
        self.id
    }

    /// Records in this batch.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Take ownership of the records, leaving the batch empty.
    pub fn take_records(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.records)
    }

    /// Confirm the batch was committed downstream.
    pub fn accept(mut self) {
        self.report(true);
    }

    /// Report the batch as not delivered.
    pub fn reject(mut self) {
        self.report(false);
    }

    fn report(&mut self, delivered: bool) {
        if let Some(tx) = self.delivery_tx.take() {
            // The listener may already be gone during shutdown
            let _ = tx.send(DeliveryInfo {
                id: self.id,
                delivered,
            });
        }
    }
}

impl Drop for TrackedBatch {
    fn drop(&mut self) {
        self.report(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_and_accept() {
        let (sink, mut batches, mut deliveries) = tracking_channel();

        let id = sink.submit(vec![Record::new("m")]).unwrap();
        let batch = batches.recv().await.unwrap();
        assert_eq!(batch.id(), id);
        assert_eq!(batch.records().len(), 1);

        batch.accept();
        let info = deliveries.recv().await.unwrap();
        assert_eq!(info, DeliveryInfo { id, delivered: true });
    }

    #[tokio::test]
    async fn test_reject_and_drop_report_undelivered() {
        let (sink, mut batches, mut deliveries) = tracking_channel();

        let first = sink.submit(vec![Record::new("a")]).unwrap();
        let second = sink.submit(vec![Record::new("b")]).unwrap();
        assert_ne!(first, second);

        batches.recv().await.unwrap().reject();
        drop(batches.recv().await.unwrap());

        assert!(!deliveries.recv().await.unwrap().delivered);
        let info = deliveries.recv().await.unwrap();
        assert_eq!(info.id, second);
        assert!(!info.delivered);
    }

    #[tokio::test]
    async fn test_exactly_one_report_per_batch() {
        let (sink, mut batches, mut deliveries) = tracking_channel();
        sink.submit(vec![Record::new("a")]).unwrap();

        let mut batch = batches.recv().await.unwrap();
        assert_eq!(batch.take_records().len(), 1);
        batch.accept();

        assert!(deliveries.recv().await.unwrap().delivered);
        assert!(deliveries.try_recv().is_err());
    }

    #[test]
    fn test_submit_after_consumer_closed() {
        let (sink, batches, mut deliveries) = tracking_channel();
        drop(batches);

        let err = sink.submit(vec![Record::new("a")]).unwrap_err();
        assert!(matches!(err, SinkError::Closed));
        // No phantom delivery report for the lost batch
        assert!(deliveries.try_recv().is_err());
    }
}
