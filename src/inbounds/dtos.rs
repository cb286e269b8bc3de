use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::models::types::{Asset, Investor, Order, Side, TypeError};

/// +----------------------------------------------------------+
/// | STRUCTS | TRAITS | ENUMS | FUNCTIONS                     |
/// +----------+-------+-------+------------------------------+
/// | Structs:                                                 |
/// |   - TradeInput                                           |
/// |   - Transformer                                          |
/// | Functions:                                               |
/// |   - Transformer::transform_input                         |
/// +----------------------------------------------------------+

/// Trade intent submitted by a producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeInput {
    /// ID for the new order.
    pub order_id: String,

    /// ID of the investor placing the order.
    pub investor_id: String,

    /// ID of the asset to trade.
    pub asset_id: String,

    /// Quantity of the asset the investor already holds.
    #[serde(default)]
    pub current_shares: i64,

    /// Requested quantity.
    pub shares: u64,

    /// Limit price.
    pub price: f64,

    /// Side of the order, `BUY` or `SELL`.
    pub order_type: String,
}

/// Turns trade inputs into engine orders.
///
/// Investors and assets are created on first sighting and reused afterwards, so every order
/// of an investor shares the same position ledger.
#[derive(Debug)]
pub struct Transformer {
    investors: HashMap<String, Arc<Investor>>,
    assets: HashMap<String, Arc<Asset>>,
    default_asset_supply: u64,
}

impl Transformer {
    pub fn new(default_asset_supply: u64) -> Self {
        Self {
            investors: HashMap::new(),
            assets: HashMap::new(),
            default_asset_supply,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.default_asset_supply)
    }

    /// Validates `input` and builds the order it describes.
    ///
    /// A positive `current_shares` seeds the investor's position in the asset unless a
    /// position is already recorded.
    ///
    /// # Errors
    /// * `TypeError::InvalidSide` - `order_type` is not exactly `BUY` or `SELL`
    /// * `TypeError::InvalidPrice` - the price is not finite and strictly positive
    /// * `TypeError::InvalidQuantity` - `shares` is zero or above `MAX_ORDER_SHARES`
    /// * `TypeError::Overflow` - `shares * price` does not fit in a `Decimal`
    pub fn transform_input(&mut self, input: TradeInput) -> Result<Order, TypeError> {
        let side: Side = input.order_type.parse()?;
        let price = Decimal::try_from(input.price)
            .map_err(|_| TypeError::InvalidPrice(input.price.to_string()))?;

        let asset = self.asset(&input.asset_id);
        let investor = self.investor(&input.investor_id);
        let order = Order::new(input.order_id, investor.clone(), asset.clone(), side, input.shares, price)?;

        if input.current_shares > 0 && investor.seed_position(&asset.id, input.current_shares) {
            debug!(
                investor = %investor.id,
                asset = %asset.id,
                shares = input.current_shares,
                "Seeded investor position"
            );
        }

        Ok(order)
    }

    /// Investor previously seen by this transformer.
    pub fn known_investor(&self, investor_id: &str) -> Option<Arc<Investor>> {
        self.investors.get(investor_id).cloned()
    }

    fn investor(&mut self, investor_id: &str) -> Arc<Investor> {
        self.investors
            .entry(investor_id.to_string())
            .or_insert_with(|| Arc::new(Investor::new(investor_id)))
            .clone()
    }

    fn asset(&mut self, asset_id: &str) -> Arc<Asset> {
        let supply = self.default_asset_supply;
        self.assets
            .entry(asset_id.to_string())
            .or_insert_with(|| Arc::new(Asset::new(asset_id, asset_id, supply)))
            .clone()
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
