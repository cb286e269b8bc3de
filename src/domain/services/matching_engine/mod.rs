use thiserror::Error;

pub mod matching_engine;
pub mod settlement;
pub mod work;
pub mod engine_worker;

/// Re-export key types for convenience
pub use self::matching_engine::{MatchingEngine, MatchResult};
pub use self::engine_worker::{EngineClient, EngineWorker, OutboundOrders};
pub use self::work::{CompletionTicket, OrderCompletion, WorkTracker, WorkUnit};

/// Errors that can occur around the matching engine worker.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The inbound stream is closed; the order was not accepted
    #[error("Matching engine inbound channel closed")]
    ChannelClosed,

    /// The order was accepted but the stream closed before it was processed
    #[error("Order {0} was abandoned before the engine processed it")]
    Abandoned(String),

    /// The worker thread or its runtime could not be started
    #[error("Failed to start matching engine worker: {0}")]
    Startup(#[from] std::io::Error),
}
