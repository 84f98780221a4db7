//! Flow-control gate bounding records handed downstream but not yet
//! confirmed.
//!
//! Units are taken by workers before each submission and returned only by the
//! delivery listener, so the gate's occupancy follows what the consumer has
//! actually processed rather than what was submitted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::ingest::DeliveryReceiver;
use crate::{Error, Result};

/// Bounded counting gate. Cloning shares the same pool.
#[derive(Debug, Clone)]
pub struct FlowGate {
    permits: Arc<Semaphore>,
    held: Arc<AtomicUsize>,
    capacity: usize,
}

impl FlowGate {
    /// Create a gate with `capacity` units.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            held: Arc::new(AtomicUsize::new(0)),
            capacity,
        }
    }

    /// Units currently taken and not yet returned.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.held.load(Ordering::Acquire)
    }

    /// Take a unit without waiting.
    pub fn try_acquire(&self) -> bool {
        match self.permits.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.held.fetch_add(1, Ordering::AcqRel);
                true
            }
            Err(_) => false,
        }
    }

    /// Take a unit, waiting for one to be returned if the gate is full.
    ///
    /// # Errors
    ///
    /// Returns an error if the gate has been closed.
    pub async fn acquire(&self) -> Result<()> {
        if self.try_acquire() {
            return Ok(());
        }

        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::internal("flow-control gate closed"))?;
        permit.forget();
        self.held.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Return up to `n` units. Returns beyond what is held are ignored.
    pub fn release(&self, n: usize) {
        let returned = self
            .held
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |held| {
                Some(held.saturating_sub(n))
            })
            .map_or(0, |held| held.min(n));

        if returned < n {
            tracing::warn!(
                requested = n,
                returned,
                "Flow-control gate release exceeds units held"
            );
        }
        self.permits.add_permits(returned);
    }

    /// Return one unit per delivery report until the reports end or
    /// `shutdown` fires.
    pub async fn release_on_delivery(
        self,
        mut deliveries: DeliveryReceiver,
        shutdown: CancellationToken,
    ) {
        tracing::debug!(capacity = self.capacity, "Delivery listener started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                info = deliveries.recv() => match info {
                    Some(info) => {
                        if !info.delivered {
                            tracing::debug!(id = info.id.get(), "Batch rejected downstream");
                        }
                        self.release(1);
                    }
                    None => {
                        tracing::debug!("Delivery reports closed");
                        break;
                    }
                },
            }
        }

        tracing::debug!(in_flight = self.in_flight(), "Delivery listener stopped");
    }
}
