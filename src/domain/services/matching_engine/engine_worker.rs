//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module runs the matching engine as a streaming consumer on a dedicated thread.
// Producers submit orders through a clonable client; exactly one loop drains the inbound
// channel, so every queue, order and position mutation happens in arrival order.
//
// | Component           | Description                                                 |
// |---------------------|-------------------------------------------------------------|
// | EngineWorker        | Worker thread owning the MatchingEngine                     |
// | EngineClient        | Producer interface to the worker                            |
// | EngineCommand       | Messages on the inbound channel                             |
// | OutboundOrders      | Receiver of orders affected by each trade                   |
//
//--------------------------------------------------------------------------------------------------
// STREAMS
//--------------------------------------------------------------------------------------------------
// | Stream    | Kind                        | Contents                                      |
// |-----------|-----------------------------|-----------------------------------------------|
// | inbound   | bounded mpsc, many senders  | Submit { order, work unit } / Shutdown        |
// | outbound  | bounded mpsc, one receiver  | maker then taker snapshot for every trade     |
//--------------------------------------------------------------------------------------------------

use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::domain::models::types::Order;
use crate::domain::services::matching_engine::EngineError;
use crate::domain::services::matching_engine::matching_engine::MatchingEngine;
use crate::domain::services::matching_engine::work::{
    CompletionTicket, OrderCompletion, WorkTracker, WorkUnit,
};

/// Receiving end of the outbound order stream.
pub type OutboundOrders = Receiver<Order>;

/// Messages accepted by the worker.
#[derive(Debug)]
enum EngineCommand {
    /// Process an order; `work` is completed once the arrival has been handled
    Submit { order: Order, work: WorkUnit },

    /// Close the inbound stream
    Shutdown,
}

/// Worker that owns a [`MatchingEngine`] and feeds it from the inbound stream.
pub struct EngineWorker {
    engine: MatchingEngine,
    config: EngineConfig,
}

impl EngineWorker {
    /// Creates a worker around a fresh engine.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_engine(MatchingEngine::new(), config)
    }

    /// Creates a worker around an existing engine.
    pub fn with_engine(engine: MatchingEngine, config: EngineConfig) -> Self {
        Self { engine, config }
    }

    /// Starts the worker thread.
    ///
    /// # Returns
    /// * the client used to submit orders
    /// * the outbound stream of affected orders
    /// * the thread handle, which yields the engine once the inbound stream closes
    ///
    /// # Errors
    /// Returns `EngineError::Startup` if the runtime or the thread cannot be created.
    pub fn start(self) -> Result<(EngineClient, OutboundOrders, JoinHandle<MatchingEngine>), EngineError> {
        let (command_tx, command_rx) = mpsc::channel(self.config.inbound_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_capacity);

        // Tokio runtime for the worker thread
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let handle = thread::Builder::new()
            .name("matching-engine".to_string())
            .spawn(move || runtime.block_on(self.run(command_rx, outbound_tx)))?;

        let client = EngineClient {
            command_tx,
            tracker: WorkTracker::new(),
        };

        Ok((client, outbound_rx, handle))
    }

    /// Main worker loop. Returns the engine when the inbound stream closes.
    async fn run(mut self, mut inbound: Receiver<EngineCommand>, outbound: Sender<Order>) -> MatchingEngine {
        info!("Matching engine worker started");
        let mut outbound = Some(outbound);

        while let Some(command) = inbound.recv().await {
            match command {
                EngineCommand::Shutdown => break,
                EngineCommand::Submit { order, work } => {
                    let result = self.engine.process_order(order);

                    for affected in result.affected_orders {
                        emit(&mut outbound, affected).await;
                    }

                    work.complete(OrderCompletion {
                        order: result.processed_order,
                        transaction: result.transaction,
                    });
                }
            }
        }

        // Anything still queued in the channel is dropped here, releasing its work unit.
        inbound.close();
        info!(
            resting_orders = self.engine.resting_orders_count(),
            transactions = self.engine.transactions().len(),
            "Matching engine worker stopped"
        );
        self.engine
    }
}

/// Sends one order downstream. A dropped receiver disables further emissions.
async fn emit(outbound: &mut Option<Sender<Order>>, order: Order) {
    let Some(sender) = outbound else {
        return;
    };
    debug!(order = %order.id, status = %order.status, pending = order.pending_shares, "Emitting order");
    if sender.send(order).await.is_err() {
        warn!("Outbound receiver dropped; further order emissions are discarded");
        *outbound = None;
    }
}

/// Producer interface to the [`EngineWorker`].
///
/// Clones share the inbound channel and the outstanding-work counter. The inbound stream
/// closes when [`EngineClient::shutdown`] is called or every clone has been dropped.
#[derive(Debug, Clone)]
pub struct EngineClient {
    command_tx: Sender<EngineCommand>,
    tracker: WorkTracker,
}

impl EngineClient {
    /// Submits an order, waiting for room in the inbound channel.
    ///
    /// # Returns
    /// A ticket that resolves once the worker has processed the order.
    ///
    /// # Errors
    /// Returns `EngineError::ChannelClosed` if the worker no longer accepts orders.
    pub async fn submit(&self, order: Order) -> Result<CompletionTicket, EngineError> {
        let (work, ticket) = self.tracker.register(order.id.clone());

        self.command_tx
            .send(EngineCommand::Submit { order, work })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;

        Ok(ticket)
    }

    /// Submits an order and waits until the worker has processed it.
    pub async fn submit_and_wait(&self, order: Order) -> Result<OrderCompletion, EngineError> {
        self.submit(order).await?.wait().await
    }

    /// Orders submitted through any clone of this client and not yet processed.
    pub fn outstanding(&self) -> usize {
        self.tracker.outstanding()
    }

    /// Waits until every submitted order has been processed or abandoned.
    pub async fn wait_idle(&self) {
        self.tracker.wait_idle().await
    }

    /// Closes the inbound stream. Orders submitted before this call are still processed.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.command_tx
            .send(EngineCommand::Shutdown)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }
}
