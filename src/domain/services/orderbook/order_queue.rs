//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the per-side priority queue of resting orders.
// A queue only ever holds orders of one side and always yields the best-priced order first.
//
// | Component     | Description                                                               |
// |---------------|---------------------------------------------------------------------------|
// | QueuedOrder   | Heap entry wrapping an Order, ordered by price then arrival sequence      |
// | OrderQueue    | Binary heap of QueuedOrder for a single side                              |
//
//--------------------------------------------------------------------------------------------------
// ORDERING
//--------------------------------------------------------------------------------------------------
// | Side   | Best entry                  | Tie-break (equal price)          |
// |--------|-----------------------------|----------------------------------|
// | Buy    | Highest price (max-heap)    | Lowest sequence_id (FIFO)        |
// | Sell   | Lowest price (min-heap)     | Lowest sequence_id (FIFO)        |
//--------------------------------------------------------------------------------------------------

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rust_decimal::Decimal;

use crate::domain::models::types::{Order, Side};
use crate::domain::services::orderbook::OrderbookError;

/// Heap entry. `Ord` ranks the entry that should be matched first as the greatest.
#[derive(Debug, Clone)]
struct QueuedOrder(Order);

impl Ord for QueuedOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_price = match self.0.side {
            Side::Buy => self.0.price.cmp(&other.0.price),
            Side::Sell => other.0.price.cmp(&self.0.price),
        };
        by_price.then_with(|| other.0.sequence_id.cmp(&self.0.sequence_id))
    }
}

impl PartialOrd for QueuedOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedOrder {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedOrder {}

/// Priority queue of resting orders for one side of one asset.
///
/// `push` and `pop` are O(log n); `peek`, `best_price` and `len` are O(1).
#[derive(Debug, Clone)]
pub struct OrderQueue {
    side: Side,
    heap: BinaryHeap<QueuedOrder>,
}

impl OrderQueue {
    /// Creates an empty queue for `side`.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            heap: BinaryHeap::new(),
        }
    }

    /// Side of the orders held by this queue.
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Inserts an order.
    ///
    /// # Errors
    /// Returns `OrderbookError::WrongSide` if the order belongs to the other side.
    pub fn push(&mut self, order: Order) -> Result<(), OrderbookError> {
        if order.side != self.side {
            return Err(OrderbookError::WrongSide {
                expected: self.side,
                got: order.side,
            });
        }
        self.heap.push(QueuedOrder(order));
        Ok(())
    }

    /// Removes and returns the highest-priority order.
    #[inline]
    pub fn pop(&mut self) -> Option<Order> {
        self.heap.pop().map(|entry| entry.0)
    }

    /// Highest-priority order without removing it.
    #[inline]
    pub fn peek(&self) -> Option<&Order> {
        self.heap.peek().map(|entry| &entry.0)
    }

    /// Price of the highest-priority order.
    #[inline]
    pub fn best_price(&self) -> Option<Decimal> {
        self.peek().map(|order| order.price)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Resting orders in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> + '_ {
        self.heap.iter().map(|entry| &entry.0)
    }

    /// Drains the queue into a vector sorted from best to worst priority.
    pub fn into_sorted_vec(self) -> Vec<Order> {
        // BinaryHeap::into_sorted_vec is ascending, i.e. worst first.
        self.heap
            .into_sorted_vec()
            .into_iter()
            .rev()
            .map(|entry| entry.0)
            .collect()
    }
}
