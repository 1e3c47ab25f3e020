//! Background persistence of cart snapshots.
//!
//! All writes for a store go through one worker, in the order the state
//! changed. When several snapshots are queued the worker writes only the
//! newest one and acknowledges every queued request with that result, so
//! storage always converges to the latest revision.
//!
//! The worker is started after the initial load, so nothing queued before
//! the persisted cart was read can overwrite it.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use turbo_kv::{Cache, KvStore};

use crate::error::CartError;
use crate::snapshot::Products;

type WriteResult = Result<(), CartError>;

enum WriteRequest {
    Persist {
        snapshot: Products,
        ack: oneshot::Sender<WriteResult>,
    },
    Flush {
        ack: oneshot::Sender<WriteResult>,
    },
}

impl WriteRequest {
    fn snapshot(&self) -> Option<&Products> {
        match self {
            WriteRequest::Persist { snapshot, .. } => Some(snapshot),
            WriteRequest::Flush { .. } => None,
        }
    }

    fn acknowledge(self, result: WriteResult) {
        let ack = match self {
            WriteRequest::Persist { ack, .. } | WriteRequest::Flush { ack } => ack,
        };
        // The caller may have dropped its PendingWrite.
        let _ = ack.send(result);
    }
}

/// Completion signal for one persistence write.
///
/// Dropping it is fine: the write still happens. Awaiting [`wait`] reports
/// whether storage now holds this revision or a later one.
///
/// [`wait`]: PendingWrite::wait
#[derive(Debug)]
pub struct PendingWrite {
    revision: u64,
    rx: Option<oneshot::Receiver<WriteResult>>,
}

impl PendingWrite {
    /// A write that has nothing to do because the state did not change.
    pub(crate) fn unchanged(revision: u64) -> Self {
        Self { revision, rx: None }
    }

    /// Revision of the state this write carries.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Wait for the write to land.
    pub async fn wait(self) -> Result<(), CartError> {
        match self.rx {
            Some(rx) => rx.await.map_err(|_| CartError::StoreClosed)?,
            None => Ok(()),
        }
    }
}

/// Sending side of a store's writer.
#[derive(Debug, Clone)]
pub(crate) struct WriteQueue {
    tx: mpsc::UnboundedSender<WriteRequest>,
}

impl WriteQueue {
    /// Create a queue and the worker that drains it into `key`.
    pub(crate) fn new(cache: Cache<Arc<dyn KvStore>>, key: String) -> (Self, WriteWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, WriteWorker { cache, key, rx })
    }

    /// Queue `snapshot` for persistence.
    pub(crate) fn persist(&self, snapshot: Products) -> PendingWrite {
        let revision = snapshot.revision();
        let (ack, rx) = oneshot::channel();
        if self
            .tx
            .send(WriteRequest::Persist { snapshot, ack })
            .is_err()
        {
            warn!(revision, "cart writer is gone; change not persisted");
        }
        PendingWrite {
            revision,
            rx: Some(rx),
        }
    }

    /// Completion signal for everything queued so far.
    pub(crate) fn flush(&self, revision: u64) -> PendingWrite {
        let (ack, rx) = oneshot::channel();
        // On failure the ack is dropped and `wait` reports StoreClosed.
        let _ = self.tx.send(WriteRequest::Flush { ack });
        PendingWrite {
            revision,
            rx: Some(rx),
        }
    }
}

/// Receiving side of a store's writer.
pub(crate) struct WriteWorker {
    cache: Cache<Arc<dyn KvStore>>,
    key: String,
    rx: mpsc::UnboundedReceiver<WriteRequest>,
}

impl WriteWorker {
    /// Persist queued snapshots until every [`WriteQueue`] is dropped and
    /// the queue is drained.
    pub(crate) async fn run(mut self) {
        let key = self.key;
        let mut persisted = 0u64;
        let mut last_result: WriteResult = Ok(());

        while let Some(first) = self.rx.recv().await {
            let mut batch = vec![first];
            while let Ok(next) = self.rx.try_recv() {
                batch.push(next);
            }

            let latest = batch
                .iter()
                .filter_map(WriteRequest::snapshot)
                .max_by_key(|s| s.revision())
                .cloned();

            if let Some(snapshot) = latest.filter(|s| s.revision() > persisted) {
                let revision = snapshot.revision();
                last_result = match self.cache.set(&key, snapshot.items()).await {
                    Ok(()) => {
                        persisted = revision;
                        debug!(key = %key, revision, coalesced = batch.len(), "persisted cart");
                        Ok(())
                    }
                    Err(e) => {
                        warn!(key = %key, revision, error = %e, "failed to persist cart");
                        Err(CartError::from(e))
                    }
                };
            }

            for request in batch {
                request.acknowledge(last_result.clone());
            }
        }

        debug!(key = %key, persisted, "cart writer stopped");
    }
}
