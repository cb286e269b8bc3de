use thiserror::Error;

use crate::domain::models::types::Side;

pub mod order_queue;
pub mod orderbook;

pub use order_queue::OrderQueue;
pub use orderbook::OrderBook;

/// Errors that can occur within the orderbook service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderbookError {
    /// Order pushed onto the queue of the other side
    #[error("Order is for wrong side (expected {expected}, got {got})")]
    WrongSide {
        expected: Side,
        got: Side,
    },

    /// Order is for a different asset than this orderbook
    #[error("Order is for wrong asset (expected {expected}, got {got})")]
    WrongAsset {
        expected: String,
        got: String,
    },
}
