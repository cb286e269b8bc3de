//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Outstanding-work accounting for orders submitted to the engine worker.
//
// Every submission registers one unit of work and receives a ticket. The worker completes the
// unit once the arrival has been processed, whether it traded or was only queued. A unit that is
// dropped without being completed (the inbound stream closed first) still releases the counter,
// and its ticket resolves to `EngineError::Abandoned`.
//
// | Component          | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | WorkTracker        | Shared outstanding counter with an idle notification             |
// | WorkUnit           | One registered unit; releases the counter when dropped           |
// | CompletionTicket   | Caller side of a unit, resolves to an OrderCompletion            |
// | OrderCompletion    | Taker snapshot and optional transaction of a processed arrival   |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Notify, oneshot};

use crate::domain::models::types::{Order, Transaction};
use crate::domain::services::matching_engine::EngineError;

/// Outcome of processing one submitted order.
#[derive(Debug, Clone)]
pub struct OrderCompletion {
    /// The submitted order as it stood after processing.
    pub order: Order,
    /// The transaction its arrival produced, if it matched.
    pub transaction: Option<Transaction>,
}

impl OrderCompletion {
    pub fn matched(&self) -> bool {
        self.transaction.is_some()
    }
}

#[derive(Debug, Default)]
struct WorkState {
    outstanding: AtomicUsize,
    idle: Notify,
}

/// Counts submitted orders the worker has not finished with.
#[derive(Debug, Clone, Default)]
pub struct WorkTracker {
    state: Arc<WorkState>,
}

impl WorkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one unit of work for `order_id`.
    pub fn register(&self, order_id: impl Into<String>) -> (WorkUnit, CompletionTicket) {
        self.state.outstanding.fetch_add(1, Ordering::AcqRel);
        let (sender, receiver) = oneshot::channel();
        let unit = WorkUnit {
            state: self.state.clone(),
            completion: Some(sender),
        };
        let ticket = CompletionTicket {
            order_id: order_id.into(),
            receiver,
        };
        (unit, ticket)
    }

    /// Units registered and not yet released.
    pub fn outstanding(&self) -> usize {
        self.state.outstanding.load(Ordering::Acquire)
    }

    /// Resolves once every registered unit has been released.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.state.idle.notified();
            tokio::pin!(notified);
            // Register interest before reading the counter so a release in between is not lost.
            notified.as_mut().enable();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// One registered unit of work.
#[derive(Debug)]
pub struct WorkUnit {
    state: Arc<WorkState>,
    completion: Option<oneshot::Sender<OrderCompletion>>,
}

impl WorkUnit {
    /// Resolves the ticket with `completion` and releases the unit.
    pub fn complete(mut self, completion: OrderCompletion) {
        if let Some(sender) = self.completion.take() {
            // The caller may have dropped its ticket.
            let _ = sender.send(completion);
        }
    }
}

impl Drop for WorkUnit {
    fn drop(&mut self) {
        if self.state.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.state.idle.notify_waiters();
        }
    }
}

/// Caller side of a [`WorkUnit`].
#[derive(Debug)]
pub struct CompletionTicket {
    order_id: String,
    receiver: oneshot::Receiver<OrderCompletion>,
}

impl CompletionTicket {
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Waits for the worker to process the order.
    ///
    /// # Errors
    /// Returns `EngineError::Abandoned` if the unit was dropped without completion.
    pub async fn wait(self) -> Result<OrderCompletion, EngineError> {
        let Self { order_id, receiver } = self;
        receiver.await.map_err(|_| EngineError::Abandoned(order_id))
    }
}
