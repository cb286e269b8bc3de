//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the order book session of a single asset.
// It owns one BUY queue and one SELL queue; the engine creates a session lazily the first time
// it sees an order for the asset and never shares it with another component.
//
// | Component     | Description                                                               |
// |---------------|---------------------------------------------------------------------------|
// | OrderBook     | BUY and SELL OrderQueue pair for one asset                                |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                               | Return Type                 |
// |-----------------------|-------------------------------------------|-----------------------------|
// | new                   | Creates an empty book for an asset        | OrderBook                   |
// | add_order             | Rests an order on its own side            | Result<(), OrderbookError>  |
// | pop_best_order        | Removes best order of a side              | Option<Order>               |
// | peek_best_order       | Best order of a side                      | Option<&Order>              |
// | best_bid / best_ask   | Best prices                               | Option<Decimal>             |
// | crosses               | Whether an order can trade against book   | bool                        |
//--------------------------------------------------------------------------------------------------

use rust_decimal::Decimal;

use crate::domain::models::types::{Order, Side};
use crate::domain::services::orderbook::OrderbookError;
use crate::domain::services::orderbook::order_queue::OrderQueue;

/// Resting orders of one asset, split by side.
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// Identifier of the asset this book manages
    asset_id: String,
    /// Buy side, highest price first
    bids: OrderQueue,
    /// Sell side, lowest price first
    asks: OrderQueue,
}

impl OrderBook {
    /// Creates a new empty order book for a specific asset.
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            bids: OrderQueue::new(Side::Buy),
            asks: OrderQueue::new(Side::Sell),
        }
    }

    /// Rests an order on the queue of its own side.
    ///
    /// # Errors
    /// Returns `OrderbookError::WrongAsset` for an order of another asset.
    pub fn add_order(&mut self, order: Order) -> Result<(), OrderbookError> {
        if order.asset.id != self.asset_id {
            return Err(OrderbookError::WrongAsset {
                expected: self.asset_id.clone(),
                got: order.asset.id.clone(),
            });
        }
        self.queue_mut(order.side).push(order)
    }

    /// Removes the best order of `side`.
    #[inline]
    pub fn pop_best_order(&mut self, side: Side) -> Option<Order> {
        self.queue_mut(side).pop()
    }

    /// Best order of `side` without removing it.
    #[inline]
    pub fn peek_best_order(&self, side: Side) -> Option<&Order> {
        self.queue(side).peek()
    }

    /// Whether `order` crosses the best opposing price.
    ///
    /// A BUY crosses when the best SELL price is at or below its limit, a SELL crosses when
    /// the best BUY price is at or above its limit. An empty opposing queue never crosses.
    pub fn crosses(&self, order: &Order) -> bool {
        match order.side {
            Side::Buy => self.best_ask().is_some_and(|ask| ask <= order.price),
            Side::Sell => self.best_bid().is_some_and(|bid| bid >= order.price),
        }
    }

    #[inline]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.best_price()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.best_price()
    }

    /// Queue holding the orders of `side`.
    pub fn queue(&self, side: Side) -> &OrderQueue {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn queue_mut(&mut self, side: Side) -> &mut OrderQueue {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Number of resting orders on both sides.
    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }
}
