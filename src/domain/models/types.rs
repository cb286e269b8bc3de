//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types used throughout the matching engine,
// including assets, investors, orders, transactions and the side/status enums.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Side (Buy/Sell) and OrderStatus (Open/Closed).                   |
// | STRUCTS            | Asset, Investor, Order and Transaction.                          |
// | Potential Errors   | TypeError raised while building domain values from raw input.    |
// | TESTS              | Unit tests for the defined types.                                |
//--------------------------------------------------------------------------------------------------

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                  |
// |---------------|----------------------------------------------|
// | Side          | Represents the side of an order (Buy/Sell).  |
// | OrderStatus   | Represents the status of an order.           |
//--------------------------------------------------------------------------------------------------
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Represents the side of an order (Buy or Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// A buy order, resting on the bid queue.
    Buy,
    /// A sell order, resting on the ask queue.
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Wire literal used by trade-intent records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = TypeError;

    /// Only the exact literals `BUY` and `SELL` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(TypeError::InvalidSide(other.to_string())),
        }
    }
}

/// Lifecycle status of an order. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// The order still has pending quantity.
    Open,
    /// The order has been completely filled.
    Closed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("OPEN"),
            Self::Closed => f.write_str("CLOSED"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                                   |
// |---------------|---------------------------------------------------------------|
// | Asset         | Tradable asset, immutable after creation.                     |
// | Investor      | Investor with its position ledger (asset id -> quantity).     |
// | Order         | Limit order with pending quantity and transaction history.    |
// | Transaction   | A trade between one selling and one buying order.             |
//--------------------------------------------------------------------------------------------------

/// A tradable asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Identifier of the asset.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Total issued quantity.
    pub market_volume: u64,
}

impl Asset {
    pub fn new(id: impl Into<String>, name: impl Into<String>, market_volume: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            market_volume,
        }
    }
}

/// An investor and its position ledger.
///
/// Orders hold the investor through an `Arc`, so every order placed by the same investor
/// observes the same ledger. Positions are written only by settlement; readers take the
/// read lock.
#[derive(Debug, Default)]
pub struct Investor {
    /// Identifier of the investor.
    pub id: String,
    positions: RwLock<HashMap<String, i64>>,
}

impl Investor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            positions: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an investor already holding `shares` of `asset_id`.
    pub fn with_position(id: impl Into<String>, asset_id: impl Into<String>, shares: i64) -> Self {
        let investor = Self::new(id);
        investor.positions.write().insert(asset_id.into(), shares);
        investor
    }

    /// Current held quantity of `asset_id` (0 when the asset was never held).
    pub fn position(&self, asset_id: &str) -> i64 {
        self.positions.read().get(asset_id).copied().unwrap_or(0)
    }

    /// Whether a position entry exists for `asset_id`.
    pub fn has_position(&self, asset_id: &str) -> bool {
        self.positions.read().contains_key(asset_id)
    }

    /// Records an externally known holding, leaving existing entries untouched.
    ///
    /// # Returns
    /// `true` if the position was seeded, `false` if an entry already existed.
    pub fn seed_position(&self, asset_id: &str, shares: i64) -> bool {
        let mut positions = self.positions.write();
        if positions.contains_key(asset_id) {
            return false;
        }
        positions.insert(asset_id.to_string(), shares);
        true
    }

    /// Adds `delta` (possibly negative) to the position in `asset_id`.
    ///
    /// Settlement checks the result with [`Investor::position_after`] first; the addition
    /// saturates at the `i64` bounds.
    pub(crate) fn update_position(&self, asset_id: &str, delta: i64) {
        let mut positions = self.positions.write();
        let position = positions.entry(asset_id.to_string()).or_insert(0);
        *position = position.saturating_add(delta);
    }

    /// Position in `asset_id` after adding `delta`, or `None` if it would overflow.
    pub fn position_after(&self, asset_id: &str, delta: i64) -> Option<i64> {
        self.position(asset_id).checked_add(delta)
    }

    /// Copy of the whole ledger.
    pub fn positions(&self) -> HashMap<String, i64> {
        self.positions.read().clone()
    }
}

/// Largest accepted order size. Keeps every fill representable as a signed position delta.
pub const MAX_ORDER_SHARES: u64 = i64::MAX as u64;

/// A simple limit order.
///
/// Clones are snapshots: the investor and asset stay shared, quantities and the
/// transaction list are copied.
#[derive(Debug, Clone)]
pub struct Order {
    /// Identifier assigned by the producer.
    pub id: String,
    /// Owning investor.
    pub investor: Arc<Investor>,
    /// Traded asset.
    pub asset: Arc<Asset>,
    /// Side of the order (Buy or Sell).
    pub side: Side,
    /// Requested quantity.
    pub shares: u64,
    /// Quantity not yet matched. Never increases.
    pub pending_shares: u64,
    /// Limit price.
    pub price: Decimal,
    /// Current status of the order.
    pub status: OrderStatus,
    /// Transactions this order took part in, oldest first.
    pub transactions: Vec<Transaction>,
    /// Arrival sequence assigned by the engine (for time priority).
    pub sequence_id: u64,
}

impl Order {
    /// Creates a new open order with its full size pending.
    ///
    /// # Errors
    /// * `TypeError::InvalidQuantity` - if `shares` is zero or above [`MAX_ORDER_SHARES`]
    /// * `TypeError::InvalidPrice` - if `price` is not strictly positive
    /// * `TypeError::Overflow` - if `shares * price` does not fit in a `Decimal`
    pub fn new(
        id: impl Into<String>,
        investor: Arc<Investor>,
        asset: Arc<Asset>,
        side: Side,
        shares: u64,
        price: Decimal,
    ) -> Result<Self, TypeError> {
        if shares == 0 || shares > MAX_ORDER_SHARES {
            return Err(TypeError::InvalidQuantity(shares.to_string()));
        }
        if price <= Decimal::ZERO {
            return Err(TypeError::InvalidPrice(price.to_string()));
        }
        Transaction::total_for(shares, price)?;

        Ok(Self {
            id: id.into(),
            investor,
            asset,
            side,
            shares,
            pending_shares: shares,
            price,
            status: OrderStatus::Open,
            transactions: Vec::new(),
            sequence_id: 0,
        })
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.status == OrderStatus::Closed
    }

    /// Consumes `quantity` of the pending size. Callers bound `quantity` by `pending_shares`.
    #[inline]
    pub(crate) fn fill(&mut self, quantity: u64) {
        debug_assert!(quantity <= self.pending_shares);
        self.pending_shares -= quantity;
    }

    /// Moves the order to `Closed` once nothing is left pending.
    #[inline]
    pub(crate) fn close_if_filled(&mut self) {
        if self.pending_shares == 0 {
            self.status = OrderStatus::Closed;
        }
    }
}

/// A trade between a selling and a buying order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for the transaction.
    pub id: Uuid,
    /// ID of the selling order.
    pub selling_order_id: String,
    /// ID of the buying order.
    pub buying_order_id: String,
    /// Identifier for the asset traded.
    pub asset_id: String,
    /// Requested size of the selling order when the transaction was built.
    pub selling_order_shares: u64,
    /// Requested size of the buying order when the transaction was built.
    pub buying_order_shares: u64,
    /// Nominal quantity: the requested size of the order that triggered the match.
    pub shares: u64,
    /// Quantity actually exchanged by settlement.
    pub filled: u64,
    /// Execution price, always the resting order's price.
    pub price: Decimal,
    /// `shares * price` at creation, recomputed by settlement.
    pub total: Decimal,
    /// Timestamp when the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds a transaction priced at `shares * price`.
    ///
    /// # Errors
    /// Returns `TypeError::Overflow` if the total does not fit in a `Decimal`.
    pub fn new(selling_order: &Order, buying_order: &Order, shares: u64, price: Decimal) -> Result<Self, TypeError> {
        Ok(Self {
            id: Uuid::new_v4(),
            selling_order_id: selling_order.id.clone(),
            buying_order_id: buying_order.id.clone(),
            asset_id: selling_order.asset.id.clone(),
            selling_order_shares: selling_order.shares,
            buying_order_shares: buying_order.shares,
            shares,
            filled: 0,
            price,
            total: Self::total_for(shares, price)?,
            created_at: Utc::now(),
        })
    }

    /// `shares * price`, checked.
    pub fn total_for(shares: u64, price: Decimal) -> Result<Decimal, TypeError> {
        Decimal::from(shares)
            .checked_mul(price)
            .ok_or_else(|| TypeError::Overflow(format!("{} * {}", shares, price)))
    }
}

//--------------------------------------------------------------------------------------------------
//  Potential Errors
//--------------------------------------------------------------------------------------------------
/// Errors raised while turning raw values into domain types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Occurs when a side literal is neither `BUY` nor `SELL`.
    #[error("Invalid side specified: {0}")]
    InvalidSide(String),

    /// Occurs when the requested quantity is zero or too large.
    #[error("Invalid quantity specified: {0}")]
    InvalidQuantity(String),

    /// Occurs when the limit price is not a finite, strictly positive number.
    #[error("Invalid price specified: {0}")]
    InvalidPrice(String),

    /// Occurs when a quantity times a price does not fit in a `Decimal`.
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                          | Description                                       |
// |-------------------------------|---------------------------------------------------|
// | test_side_parsing             | Only BUY and SELL literals parse.                 |
// | test_order_creation           | New orders are open with everything pending.      |
// | test_order_rejects_bad_input  | Zero size and non-positive prices are rejected.   |
// | test_fill_and_close           | Status flips to Closed exactly at zero pending.   |
// | test_investor_positions       | Ledger seeding and updates.                       |
// | test_transaction_creation     | Transaction captures both orders' sizes.          |
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(side: Side, shares: u64, price: Decimal) -> Order {
        Order::new(
            "order-1",
            Arc::new(Investor::new("investor-1")),
            Arc::new(Asset::new("asset-1", "asset-1", 1000)),
            side,
            shares,
            price,
        )
        .unwrap()
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("BUY".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("SELL".parse::<Side>().unwrap(), Side::Sell);
        assert_eq!(
            "buy".parse::<Side>(),
            Err(TypeError::InvalidSide("buy".to_string()))
        );
        assert!("HOLD".parse::<Side>().is_err());
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.to_string(), "SELL");
    }

    #[test]
    fn test_order_creation() {
        let order = order(Side::Buy, 100, dec!(10.5));
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.pending_shares, 100);
        assert!(order.transactions.is_empty());
    }

    #[test]
    fn test_order_rejects_bad_input() {
        let investor = Arc::new(Investor::new("i"));
        let asset = Arc::new(Asset::new("a", "a", 1000));

        let zero = Order::new("o", investor.clone(), asset.clone(), Side::Buy, 0, dec!(1));
        assert!(matches!(zero, Err(TypeError::InvalidQuantity(_))));

        let negative = Order::new("o", investor.clone(), asset.clone(), Side::Sell, 5, dec!(-1));
        assert!(matches!(negative, Err(TypeError::InvalidPrice(_))));

        let free = Order::new("o", investor, asset, Side::Sell, 5, Decimal::ZERO);
        assert!(matches!(free, Err(TypeError::InvalidPrice(_))));
    }

    #[test]
    fn test_order_rejects_oversized_values() {
        let investor = Arc::new(Investor::new("i"));
        let asset = Arc::new(Asset::new("a", "a", 1000));

        let huge = Order::new("o", investor.clone(), asset.clone(), Side::Buy, MAX_ORDER_SHARES + 1, dec!(1));
        assert!(matches!(huge, Err(TypeError::InvalidQuantity(_))));

        let notional = Order::new(
            "o",
            investor.clone(),
            asset.clone(),
            Side::Sell,
            1_000_000_000_000_000,
            Decimal::from(1_000_000_000_000_000u64),
        );
        assert!(matches!(notional, Err(TypeError::Overflow(_))));

        let largest = Order::new("o", investor, asset, Side::Sell, MAX_ORDER_SHARES, dec!(1));
        assert!(largest.is_ok());
    }

    #[test]
    fn test_fill_and_close() {
        let mut order = order(Side::Sell, 10, dec!(3));

        order.fill(4);
        order.close_if_filled();
        assert_eq!(order.pending_shares, 6);
        assert_eq!(order.status, OrderStatus::Open);

        order.fill(6);
        order.close_if_filled();
        assert_eq!(order.pending_shares, 0);
        assert!(order.is_closed());
    }

    #[test]
    fn test_investor_positions() {
        let investor = Investor::with_position("i", "a", 50);
        assert_eq!(investor.position("a"), 50);
        assert_eq!(investor.position("b"), 0);

        assert!(!investor.seed_position("a", 10));
        assert!(investor.seed_position("b", 10));
        assert_eq!(investor.position("b"), 10);

        investor.update_position("a", -70);
        assert_eq!(investor.position("a"), -20);
        assert_eq!(investor.positions().len(), 2);

        assert_eq!(investor.position_after("a", 5), Some(-15));
        assert_eq!(investor.position_after("a", i64::MIN), None);
    }

    #[test]
    fn test_transaction_creation() {
        let seller = order(Side::Sell, 50, dec!(10));
        let buyer = order(Side::Buy, 100, dec!(12));

        let transaction = Transaction::new(&seller, &buyer, 100, dec!(10)).unwrap();
        assert_eq!(transaction.selling_order_shares, 50);
        assert_eq!(transaction.buying_order_shares, 100);
        assert_eq!(transaction.total, dec!(1000));
        assert_eq!(transaction.filled, 0);
        assert_eq!(transaction.asset_id, "asset-1");
    }

    /// Each order fits on its own, but the taker's size at the other order's price does not.
    #[test]
    fn test_transaction_total_overflow_is_an_error() {
        let seller = order(Side::Sell, 10_000_000_000, dec!(1));
        let buyer = order(Side::Buy, 1, Decimal::from(100_000_000_000_000_000_000i128));

        let result = Transaction::new(&seller, &buyer, seller.shares, buyer.price);
        assert!(matches!(result, Err(TypeError::Overflow(_))));
        assert_eq!(Transaction::total_for(3, dec!(2.5)), Ok(dec!(7.5)));
    }
}
