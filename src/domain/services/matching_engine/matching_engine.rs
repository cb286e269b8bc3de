//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the core matching logic: one call per inbound order, performing at most
// one match against the best opposing resting order of the same asset.
//
// | Component                | Description                                                |
// |--------------------------|------------------------------------------------------------|
// | MatchingEngine           | Owns the per-asset order books and the transaction log     |
// | MatchResult              | Outcome of processing one inbound order                    |
//
//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | MatchingEngine          | Core matching engine                              | process_order     |
// |                         |                                                   | book              |
// |                         |                                                   | transactions      |
// |-------------------------|---------------------------------------------------|-------------------|
// | MatchResult             | Result of a matching operation                    | transaction       |
// |                         |                                                   | processed_order   |
// |                         |                                                   | affected_orders   |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use tracing::{debug, error, info};

use crate::domain::models::types::{Order, Side, Transaction, TypeError};
use crate::domain::services::matching_engine::settlement::settle;
use crate::domain::services::orderbook::OrderBook;

/// Represents the outcome of processing one inbound order.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Transaction produced by this arrival, if it crossed the spread.
    pub transaction: Option<Transaction>,

    /// The inbound order after processing.
    pub processed_order: Order,

    /// Orders to emit downstream: the resting order first, then the inbound order.
    /// Empty when no match occurred.
    pub affected_orders: Vec<Order>,
}

/// Single-consumer matching engine.
///
/// # Price-Time Priority
///
/// * Better prices are matched first (higher bids, lower asks)
/// * At the same price, the earliest arrival is matched first
/// * Execution happens at the resting order's price
///
/// # Single-pass matching
///
/// An inbound order triggers at most one pop of the opposing queue. Whatever remains of it
/// rests on its own side, even if it still crosses the spread, until a later arrival on the
/// opposite side matches it.
#[derive(Debug)]
pub struct MatchingEngine {
    /// One book per asset, created on first sighting
    books: HashMap<String, OrderBook>,

    /// Every settled transaction, in execution order
    transactions: Vec<Transaction>,

    /// Sequence counter for time priority
    next_sequence_id: u64,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self {
            books: HashMap::new(),
            transactions: Vec::new(),
            next_sequence_id: 1,
        }
    }

    /// Processes one inbound order.
    ///
    /// # Order Processing Flow
    ///
    /// 1. Assigns the arrival sequence and makes sure the asset has a book
    /// 2. If the order crosses the best opposing price, pops that resting order
    /// 3. Builds a transaction at the resting price with the inbound order's requested size
    /// 4. Settles it, appends it to the log and to both orders' histories
    /// 5. Re-queues the resting order if it still has pending quantity
    /// 6. Queues the inbound order on its own side if it still has pending quantity
    ///
    /// A trade whose total or position changes would overflow is rejected: the resting order
    /// goes back to its queue unchanged and the inbound order rests as if nothing crossed.
    pub fn process_order(&mut self, mut order: Order) -> MatchResult {
        order.sequence_id = self.next_sequence_id;
        self.next_sequence_id += 1;

        let asset_id = order.asset.id.clone();
        let book = self.books.entry(asset_id.clone()).or_insert_with(|| {
            debug!(asset = %asset_id, "Creating order book");
            OrderBook::new(asset_id)
        });

        let mut transaction = None;
        let mut affected_orders = Vec::new();

        if book.crosses(&order) {
            if let Some(mut resting) = book.pop_best_order(order.side.opposite()) {
                if resting.pending_shares > 0 {
                    match execute(&mut order, &mut resting) {
                        Ok((trade, fill)) => {
                            info!(
                                transaction = %trade.id,
                                asset = %trade.asset_id,
                                seller = %trade.selling_order_id,
                                buyer = %trade.buying_order_id,
                                price = %trade.price,
                                fill,
                                "Transaction executed"
                            );

                            resting.transactions.push(trade.clone());
                            order.transactions.push(trade.clone());
                            self.transactions.push(trade.clone());

                            affected_orders.push(resting.clone());
                            affected_orders.push(order.clone());

                            if resting.pending_shares > 0 {
                                if let Err(err) = book.add_order(resting) {
                                    error!(error = %err, "Failed to re-queue resting order");
                                }
                            }
                            transaction = Some(trade);
                        }
                        Err(err) => {
                            error!(
                                order = %order.id,
                                resting = %resting.id,
                                error = %err,
                                "Trade rejected; both orders keep resting"
                            );
                            if let Err(err) = book.add_order(resting) {
                                error!(error = %err, "Failed to re-queue resting order");
                            }
                        }
                    }
                } else {
                    debug!(order = %resting.id, "Discarding filled order found resting");
                }
            }
        }

        let processed_order = order.clone();
        if order.pending_shares > 0 {
            debug!(
                order = %order.id,
                side = %order.side,
                price = %order.price,
                pending = order.pending_shares,
                "Order resting"
            );
            if let Err(err) = book.add_order(order) {
                error!(error = %err, "Failed to queue inbound order");
            }
        }

        MatchResult {
            transaction,
            processed_order,
            affected_orders,
        }
    }

    /// Book of `asset_id`, if the engine has seen that asset.
    pub fn book(&self, asset_id: &str) -> Option<&OrderBook> {
        self.books.get(asset_id)
    }

    /// Every transaction settled so far, oldest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Number of resting orders across all assets.
    pub fn resting_orders_count(&self) -> usize {
        self.books.values().map(OrderBook::len).sum()
    }
}

/// Builds the transaction between the inbound `order` and the `resting` order and settles it.
///
/// Priced at the resting order's price with the inbound order's requested size. On error
/// neither order has been changed.
fn execute(order: &mut Order, resting: &mut Order) -> Result<(Transaction, u64), TypeError> {
    let mut trade = match order.side {
        Side::Buy => Transaction::new(resting, order, order.shares, resting.price)?,
        Side::Sell => Transaction::new(order, resting, order.shares, resting.price)?,
    };
    let fill = match order.side {
        Side::Buy => settle(&mut trade, resting, order)?,
        Side::Sell => settle(&mut trade, order, resting)?,
    };
    Ok((trade, fill))
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                                | Description                                          |
// |-------------------------------------|------------------------------------------------------|
// | test_full_match                     | Equal size and price fill and close both orders      |
// | test_partial_match_requeues_taker   | Larger taker rests with the remainder                |
// | test_no_match_on_empty_book         | Inbound order rests untouched                        |
// | test_single_pass                    | Only the best level is hit per arrival               |
// | test_no_match_across_spread         | Non-crossing orders never trade                      |
// | test_maker_requeued_after_partial   | Larger maker stays at the front of its queue         |
// | test_sell_taker_executes_at_bid     | Execution price is the resting bid                   |
// | test_fifo_between_equal_prices      | Earliest resting order trades first                  |
// | test_assets_are_isolated            | Orders of different assets never meet                |
// | test_order_invariants_hold          | pending bounds and status equivalence over a stream  |
// | test_overflowing_trade_is_rejected  | Unpriceable trade leaves both orders resting         |
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::{Asset, Investor, OrderStatus};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn asset(id: &str) -> Arc<Asset> {
        Arc::new(Asset::new(id, id, 1000))
    }

    fn create_test_order(
        id: &str,
        investor: &Arc<Investor>,
        asset: &Arc<Asset>,
        side: Side,
        shares: u64,
        price: Decimal,
    ) -> Order {
        Order::new(id, investor.clone(), asset.clone(), side, shares, price).unwrap()
    }

    #[test]
    fn test_full_match() {
        let mut engine = MatchingEngine::new();
        let asset = asset("PETR4");
        let seller = Arc::new(Investor::new("seller"));
        let buyer = Arc::new(Investor::new("buyer"));

        let result = engine.process_order(create_test_order("s1", &seller, &asset, Side::Sell, 100, dec!(10)));
        assert!(result.transaction.is_none());
        assert!(result.affected_orders.is_empty());

        let result = engine.process_order(create_test_order("b1", &buyer, &asset, Side::Buy, 100, dec!(10)));
        let transaction = result.transaction.expect("orders should match");
        assert_eq!(transaction.filled, 100);
        assert_eq!(transaction.price, dec!(10));
        assert_eq!(transaction.selling_order_id, "s1");
        assert_eq!(transaction.buying_order_id, "b1");

        let ids: Vec<&str> = result.affected_orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "b1"]);
        assert!(result.affected_orders.iter().all(|o| o.status == OrderStatus::Closed));
        assert_eq!(result.affected_orders[0].transactions.len(), 1);

        assert_eq!(buyer.position("PETR4"), 100);
        assert_eq!(seller.position("PETR4"), -100);
        assert_eq!(engine.transactions().len(), 1);
        assert_eq!(engine.resting_orders_count(), 0);
    }

    #[test]
    fn test_partial_match_requeues_taker() {
        let mut engine = MatchingEngine::new();
        let asset = asset("PETR4");
        let seller = Arc::new(Investor::new("seller"));
        let buyer = Arc::new(Investor::new("buyer"));

        engine.process_order(create_test_order("s1", &seller, &asset, Side::Sell, 50, dec!(10)));
        let result = engine.process_order(create_test_order("b1", &buyer, &asset, Side::Buy, 100, dec!(12)));

        let transaction = result.transaction.unwrap();
        assert_eq!(transaction.filled, 50);
        assert_eq!(transaction.shares, 100);
        assert_eq!(transaction.price, dec!(10));

        let maker = &result.affected_orders[0];
        let taker = &result.affected_orders[1];
        assert_eq!(maker.status, OrderStatus::Closed);
        assert_eq!(taker.status, OrderStatus::Open);
        assert_eq!(taker.pending_shares, 50);

        let book = engine.book("PETR4").unwrap();
        assert_eq!(book.queue(Side::Buy).len(), 1);
        assert_eq!(book.peek_best_order(Side::Buy).unwrap().id, "b1");
        assert!(book.queue(Side::Sell).is_empty());
    }

    #[test]
    fn test_no_match_on_empty_book() {
        let mut engine = MatchingEngine::new();
        let asset = asset("PETR4");
        let buyer = Arc::new(Investor::new("buyer"));

        let result = engine.process_order(create_test_order("b1", &buyer, &asset, Side::Buy, 10, dec!(5)));

        assert!(result.transaction.is_none());
        assert!(result.affected_orders.is_empty());
        assert_eq!(result.processed_order.status, OrderStatus::Open);
        assert_eq!(result.processed_order.pending_shares, 10);
        assert_eq!(engine.book("PETR4").unwrap().best_bid(), Some(dec!(5)));
        assert!(engine.transactions().is_empty());
    }

    /// One arrival pops at most one opposing order even if it could sweep more.
    #[test]
    fn test_single_pass() {
        let mut engine = MatchingEngine::new();
        let asset = asset("PETR4");
        let seller = Arc::new(Investor::new("seller"));
        let buyer = Arc::new(Investor::new("buyer"));

        engine.process_order(create_test_order("s9", &seller, &asset, Side::Sell, 10, dec!(9)));
        engine.process_order(create_test_order("s8", &seller, &asset, Side::Sell, 10, dec!(8)));
        let result = engine.process_order(create_test_order("b1", &buyer, &asset, Side::Buy, 100, dec!(10)));

        let transaction = result.transaction.unwrap();
        assert_eq!(transaction.selling_order_id, "s8");
        assert_eq!(transaction.price, dec!(8));
        assert_eq!(engine.transactions().len(), 1);

        let book = engine.book("PETR4").unwrap();
        assert_eq!(book.best_ask(), Some(dec!(9)));
        assert_eq!(book.peek_best_order(Side::Buy).unwrap().pending_shares, 90);

        // A later sell arrival trades against the resting remainder.
        let result = engine.process_order(create_test_order("s10", &seller, &asset, Side::Sell, 5, dec!(10)));
        let transaction = result.transaction.unwrap();
        assert_eq!(transaction.buying_order_id, "b1");
        assert_eq!(transaction.price, dec!(10));
        assert_eq!(transaction.filled, 5);
    }

    #[test]
    fn test_no_match_across_spread() {
        let mut engine = MatchingEngine::new();
        let asset = asset("PETR4");
        let investor = Arc::new(Investor::new("investor"));

        engine.process_order(create_test_order("s1", &investor, &asset, Side::Sell, 10, dec!(11)));
        engine.process_order(create_test_order("b1", &investor, &asset, Side::Buy, 10, dec!(10)));
        let result = engine.process_order(create_test_order("s2", &investor, &asset, Side::Sell, 10, dec!(10.5)));

        assert!(result.transaction.is_none());
        assert!(engine.transactions().is_empty());
        assert_eq!(engine.resting_orders_count(), 3);
    }

    #[test]
    fn test_maker_requeued_after_partial() {
        let mut engine = MatchingEngine::new();
        let asset = asset("PETR4");
        let seller = Arc::new(Investor::new("seller"));
        let buyer = Arc::new(Investor::new("buyer"));

        engine.process_order(create_test_order("s1", &seller, &asset, Side::Sell, 100, dec!(10)));
        engine.process_order(create_test_order("s2", &seller, &asset, Side::Sell, 100, dec!(10)));
        let result = engine.process_order(create_test_order("b1", &buyer, &asset, Side::Buy, 30, dec!(10)));

        let maker = &result.affected_orders[0];
        assert_eq!(maker.id, "s1");
        assert_eq!(maker.pending_shares, 70);
        assert_eq!(maker.status, OrderStatus::Open);

        // The partially filled maker keeps its place ahead of s2.
        let book = engine.book("PETR4").unwrap();
        let best = book.peek_best_order(Side::Sell).unwrap();
        assert_eq!(best.id, "s1");
        assert_eq!(best.pending_shares, 70);
        assert_eq!(book.queue(Side::Buy).len(), 0);
    }

    #[test]
    fn test_sell_taker_executes_at_bid() {
        let mut engine = MatchingEngine::new();
        let asset = asset("PETR4");
        let seller = Arc::new(Investor::with_position("seller", "PETR4", 20));
        let buyer = Arc::new(Investor::new("buyer"));

        engine.process_order(create_test_order("b1", &buyer, &asset, Side::Buy, 20, dec!(15)));
        let result = engine.process_order(create_test_order("s1", &seller, &asset, Side::Sell, 20, dec!(12)));

        let transaction = result.transaction.unwrap();
        assert_eq!(transaction.price, dec!(15));
        assert_eq!(transaction.total, dec!(300));
        assert_eq!(result.affected_orders[0].id, "b1");
        assert_eq!(result.affected_orders[1].id, "s1");
        assert_eq!(seller.position("PETR4"), 0);
        assert_eq!(buyer.position("PETR4"), 20);
    }

    #[test]
    fn test_fifo_between_equal_prices() {
        let mut engine = MatchingEngine::new();
        let asset = asset("PETR4");
        let investor = Arc::new(Investor::new("investor"));

        engine.process_order(create_test_order("first", &investor, &asset, Side::Buy, 10, dec!(7)));
        engine.process_order(create_test_order("second", &investor, &asset, Side::Buy, 10, dec!(7)));
        let result = engine.process_order(create_test_order("s1", &investor, &asset, Side::Sell, 10, dec!(7)));

        assert_eq!(result.transaction.unwrap().buying_order_id, "first");
        let book = engine.book("PETR4").unwrap();
        assert_eq!(book.peek_best_order(Side::Buy).unwrap().id, "second");
    }

    #[test]
    fn test_assets_are_isolated() {
        let mut engine = MatchingEngine::new();
        let investor = Arc::new(Investor::new("investor"));

        engine.process_order(create_test_order("s1", &investor, &asset("PETR4"), Side::Sell, 10, dec!(5)));
        let result = engine.process_order(create_test_order("b1", &investor, &asset("VALE3"), Side::Buy, 10, dec!(50)));

        assert!(result.transaction.is_none());
        assert_eq!(engine.book("PETR4").unwrap().len(), 1);
        assert_eq!(engine.book("VALE3").unwrap().len(), 1);
    }

    /// Replays a mixed stream and checks order-level invariants on every emitted order.
    #[test]
    fn test_order_invariants_hold() {
        let mut engine = MatchingEngine::new();
        let asset = asset("PETR4");
        let buyer = Arc::new(Investor::new("buyer"));
        let seller = Arc::new(Investor::new("seller"));

        let stream = [
            (Side::Sell, 40, dec!(10)),
            (Side::Buy, 10, dec!(9)),
            (Side::Buy, 25, dec!(10)),
            (Side::Sell, 30, dec!(8)),
            (Side::Buy, 60, dec!(11)),
            (Side::Sell, 5, dec!(9)),
            (Side::Sell, 70, dec!(10.5)),
            (Side::Buy, 15, dec!(10.5)),
        ];

        for (n, (side, shares, price)) in stream.into_iter().enumerate() {
            let investor = if side == Side::Buy { &buyer } else { &seller };
            let result = engine.process_order(create_test_order(&format!("o{}", n), investor, &asset, side, shares, price));

            for order in result.affected_orders.iter().chain(std::iter::once(&result.processed_order)) {
                assert!(order.pending_shares <= order.shares);
                assert_eq!(order.status == OrderStatus::Closed, order.pending_shares == 0);
            }

            if let Some(transaction) = &result.transaction {
                assert!(transaction.filled > 0);
                assert!(transaction.filled <= transaction.shares);
            }
        }

        let traded: u64 = engine.transactions().iter().map(|t| t.filled).sum();
        assert_eq!(buyer.position("PETR4"), traded as i64);
        assert_eq!(seller.position("PETR4"), -(traded as i64));

        let book = engine.book("PETR4").unwrap();
        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            // Single-pass matching can leave a crossed book; the queues themselves stay ordered.
            assert!(book.queue(Side::Buy).iter().all(|o| o.price <= bid));
            assert!(book.queue(Side::Sell).iter().all(|o| o.price >= ask));
        }
    }

    /// The sell taker's size at the resting bid's price does not fit in a `Decimal`.
    #[test]
    fn test_overflowing_trade_is_rejected() {
        let mut engine = MatchingEngine::new();
        let asset = asset("PETR4");
        let buyer = Arc::new(Investor::new("buyer"));
        let seller = Arc::new(Investor::new("seller"));
        let bid_price = Decimal::from(100_000_000_000_000_000_000i128);

        engine.process_order(create_test_order("b1", &buyer, &asset, Side::Buy, 1, bid_price));
        let result = engine.process_order(create_test_order("s1", &seller, &asset, Side::Sell, 10_000_000_000, dec!(1)));

        assert!(result.transaction.is_none());
        assert!(result.affected_orders.is_empty());
        assert_eq!(result.processed_order.pending_shares, 10_000_000_000);
        assert!(engine.transactions().is_empty());
        assert_eq!(buyer.position("PETR4"), 0);
        assert_eq!(seller.position("PETR4"), 0);

        let book = engine.book("PETR4").unwrap();
        assert_eq!(book.peek_best_order(Side::Buy).unwrap().id, "b1");
        assert_eq!(book.peek_best_order(Side::Sell).unwrap().id, "s1");

        // The engine keeps matching ordinary orders afterwards.
        let result = engine.process_order(create_test_order("b2", &buyer, &asset, Side::Buy, 5, dec!(2)));
        let transaction = result.transaction.unwrap();
        assert_eq!(transaction.selling_order_id, "s1");
        assert_eq!(transaction.filled, 5);
    }
}
