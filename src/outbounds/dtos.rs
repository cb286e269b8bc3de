//! Output records emitted for every order the matching engine reports.
//!
//! These mirror the order snapshots sent on the outbound stream, flattened to plain
//! identifiers so they can be serialized for downstream consumers.

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::models::types::{Order, OrderStatus, Side, Transaction};

/// +----------------------------------------------------------+
/// | STRUCTS | TRAITS | ENUMS | FUNCTIONS                     |
/// +----------+-------+-------+------------------------------+
/// | Structs:                                                 |
/// |   - OrderOutput                                          |
/// |   - TransactionOutput                                    |
/// | Implementations:                                         |
/// |   - From<&Order> for OrderOutput                         |
/// |   - From<&Transaction> for TransactionOutput             |
/// +----------------------------------------------------------+

/// State of one order after a processing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOutput {
    pub order_id: String,
    pub investor_id: String,
    pub asset_id: String,
    pub order_type: Side,
    pub status: OrderStatus,
    /// Remaining pending quantity.
    pub partial: u64,
    /// Requested quantity.
    pub shares: u64,
    pub transactions: Vec<TransactionOutput>,
}

/// One transaction an order took part in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub transaction_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub asset_id: String,
    pub price: f64,
    /// Selling order's requested size minus the buying order's requested size.
    pub shares: i64,
}

impl From<&Order> for OrderOutput {
    fn from(order: &Order) -> Self {
        OrderOutput {
            order_id: order.id.clone(),
            investor_id: order.investor.id.clone(),
            asset_id: order.asset.id.clone(),
            order_type: order.side,
            status: order.status,
            partial: order.pending_shares,
            shares: order.shares,
            transactions: order.transactions.iter().map(TransactionOutput::from).collect(),
        }
    }
}

impl From<&Transaction> for TransactionOutput {
    fn from(transaction: &Transaction) -> Self {
        let shares = i128::from(transaction.selling_order_shares) - i128::from(transaction.buying_order_shares);

        TransactionOutput {
            transaction_id: transaction.id.to_string(),
            buyer_id: transaction.buying_order_id.clone(),
            seller_id: transaction.selling_order_id.clone(),
            asset_id: transaction.asset_id.clone(),
            price: transaction.price.to_f64().unwrap_or(f64::NAN),
            // Exact for order sizes up to MAX_ORDER_SHARES.
            shares: shares.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64,
        }
    }
}
