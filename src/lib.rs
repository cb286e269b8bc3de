// Expose the modules
pub mod config;
pub mod domain;
pub mod inbounds;
pub mod outbounds;

// Re-export key types for easier usage
pub use config::{ConfigError, EngineConfig};
pub use domain::models::types::{
    Asset, Investor, MAX_ORDER_SHARES, Order, OrderStatus, Side, Transaction, TypeError,
};
pub use domain::services::orderbook::{OrderBook, OrderQueue, OrderbookError};
pub use domain::services::matching_engine::{
    CompletionTicket, EngineClient, EngineError, EngineWorker, MatchResult, MatchingEngine,
    OrderCompletion, OutboundOrders, WorkTracker,
};
pub use inbounds::{TradeInput, Transformer};
pub use outbounds::{OrderOutput, TransactionOutput};
