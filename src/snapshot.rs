//! Account state snapshot.
//!
//! The snapshot is the only input of the derivation graph. Each part sits
//! behind an `Arc` so a newer snapshot can share unchanged parts with the
//! previous one, and the graph can detect which inputs changed by pointer
//! identity alone.

use crate::market::Market;
use crate::position::{Order, Position};
use crate::types::{Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Collateral asset as priced by the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: Symbol,
    pub index_price: Decimal,
    /// Collateral haircut in (0, 1]
    pub weight: Decimal,
    /// Percent per year
    pub supply_apy: Decimal,
    /// Percent per year
    pub borrows_apy: Decimal,
}

impl Asset {
    pub fn new(symbol: impl Into<Symbol>, index_price: Decimal, weight: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            index_price,
            weight,
            supply_apy: Decimal::ZERO,
            borrows_apy: Decimal::ZERO,
        }
    }

    pub fn with_apys(mut self, supply_apy: Decimal, borrows_apy: Decimal) -> Self {
        self.supply_apy = supply_apy;
        self.borrows_apy = borrows_apy;
        self
    }

    pub fn notional(&self, amount: Decimal) -> Decimal {
        amount * self.index_price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserStatus {
    Uninitialized,
    Initializing,
    Initialized,
}

impl UserStatus {
    pub fn is_initialized(&self) -> bool {
        matches!(self, UserStatus::Initialized)
    }
}

pub type AssetMap = BTreeMap<Symbol, Asset>;
pub type MarketMap = BTreeMap<Symbol, Market>;
pub type BalanceMap = BTreeMap<Symbol, Decimal>;

/// Supplies already-decoded account state. Fetching and decoding live behind
/// this trait, never inside the derivation.
pub trait StateProvider {
    fn user_status(&self) -> UserStatus;
    fn assets(&self) -> AssetMap;
    fn markets(&self) -> MarketMap;
    fn balances(&self) -> BalanceMap;
    fn positions(&self) -> Vec<Position>;
    fn orders(&self) -> Vec<Order>;
}

/// Immutable view of one account at one moment.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub user_status: UserStatus,
    pub assets: Arc<AssetMap>,
    pub markets: Arc<MarketMap>,
    pub balances: Arc<BalanceMap>,
    pub positions: Arc<Vec<Position>>,
    pub orders: Arc<Vec<Order>>,
    pub captured_at: Timestamp,
}

impl AccountSnapshot {
    /// Builds a snapshot from owned parts and validates it.
    pub fn new(
        user_status: UserStatus,
        assets: AssetMap,
        markets: MarketMap,
        balances: BalanceMap,
        positions: Vec<Position>,
        orders: Vec<Order>,
    ) -> Result<Self, SnapshotError> {
        let snapshot = Self {
            user_status,
            assets: Arc::new(assets),
            markets: Arc::new(markets),
            balances: Arc::new(balances),
            positions: Arc::new(positions),
            orders: Arc::new(orders),
            captured_at: Timestamp::now(),
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Pulls every part from the provider.
    pub fn capture(provider: &dyn StateProvider) -> Result<Self, SnapshotError> {
        Self::new(
            provider.user_status(),
            provider.assets(),
            provider.markets(),
            provider.balances(),
            provider.positions(),
            provider.orders(),
        )
    }

    /// Snapshot with no account behind it.
    pub fn uninitialized() -> Self {
        Self {
            user_status: UserStatus::Uninitialized,
            assets: Arc::default(),
            markets: Arc::default(),
            balances: Arc::default(),
            positions: Arc::default(),
            orders: Arc::default(),
            captured_at: Timestamp::now(),
        }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        for asset in self.assets.values() {
            if asset.weight <= Decimal::ZERO || asset.weight > Decimal::ONE {
                return Err(SnapshotError::InvalidWeight {
                    asset: asset.symbol.clone(),
                    weight: asset.weight,
                });
            }
            if asset.index_price < Decimal::ZERO {
                return Err(SnapshotError::NegativePrice(asset.symbol.clone()));
            }
        }

        for market in self.markets.values() {
            if market.mark_price < Decimal::ZERO || market.index_price < Decimal::ZERO {
                return Err(SnapshotError::NegativePrice(market.symbol.clone()));
            }
        }

        for asset in self.balances.keys() {
            if !self.assets.contains_key(asset) {
                return Err(SnapshotError::UnknownAsset(asset.clone()));
            }
        }

        let mut seen = BTreeSet::new();
        for position in self.positions.iter() {
            if !self.markets.contains_key(&position.market) {
                return Err(SnapshotError::UnknownMarket(position.market.clone()));
            }
            if position.coins < Decimal::ZERO {
                return Err(SnapshotError::NegativeSize(position.market.clone()));
            }
            if !seen.insert(&position.market) {
                return Err(SnapshotError::DuplicatePosition(position.market.clone()));
            }
        }

        for order in self.orders.iter() {
            if !self.markets.contains_key(&order.market) {
                return Err(SnapshotError::UnknownMarket(order.market.clone()));
            }
            if order.coins < Decimal::ZERO {
                return Err(SnapshotError::NegativeSize(order.market.clone()));
            }
        }

        Ok(())
    }

    pub fn asset(&self, symbol: &Symbol) -> Option<&Asset> {
        self.assets.get(symbol)
    }

    pub fn market(&self, symbol: &Symbol) -> Option<&Market> {
        self.markets.get(symbol)
    }

    pub fn position(&self, market: &Symbol) -> Option<&Position> {
        self.positions.iter().find(|p| &p.market == market)
    }

    // the with_* builders keep every other part shared with `self`. a replaced
    // part can orphan the others, so all but the user status revalidate

    fn revalidated(self) -> Result<Self, SnapshotError> {
        self.validate()?;
        Ok(self)
    }

    pub fn with_user_status(&self, user_status: UserStatus) -> Self {
        Self {
            user_status,
            ..self.clone()
        }
    }

    pub fn with_markets(&self, markets: MarketMap) -> Result<Self, SnapshotError> {
        Self {
            markets: Arc::new(markets),
            captured_at: Timestamp::now(),
            ..self.clone()
        }
        .revalidated()
    }

    pub fn with_assets(&self, assets: AssetMap) -> Result<Self, SnapshotError> {
        Self {
            assets: Arc::new(assets),
            captured_at: Timestamp::now(),
            ..self.clone()
        }
        .revalidated()
    }

    pub fn with_balances(&self, balances: BalanceMap) -> Result<Self, SnapshotError> {
        Self {
            balances: Arc::new(balances),
            captured_at: Timestamp::now(),
            ..self.clone()
        }
        .revalidated()
    }

    pub fn with_positions(&self, positions: Vec<Position>) -> Result<Self, SnapshotError> {
        Self {
            positions: Arc::new(positions),
            captured_at: Timestamp::now(),
            ..self.clone()
        }
        .revalidated()
    }

    pub fn with_orders(&self, orders: Vec<Order>) -> Result<Self, SnapshotError> {
        Self {
            orders: Arc::new(orders),
            captured_at: Timestamp::now(),
            ..self.clone()
        }
        .revalidated()
    }
}

/// In-memory provider, used by the simulator and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticState {
    pub initialized: bool,
    pub assets: Vec<Asset>,
    pub markets: Vec<Market>,
    pub balances: Vec<(Symbol, Decimal)>,
    pub positions: Vec<Position>,
    pub orders: Vec<Order>,
}

impl StateProvider for StaticState {
    fn user_status(&self) -> UserStatus {
        if self.initialized {
            UserStatus::Initialized
        } else {
            UserStatus::Uninitialized
        }
    }

    fn assets(&self) -> AssetMap {
        self.assets
            .iter()
            .map(|a| (a.symbol.clone(), a.clone()))
            .collect()
    }

    fn markets(&self) -> MarketMap {
        self.markets
            .iter()
            .map(|m| (m.symbol.clone(), m.clone()))
            .collect()
    }

    fn balances(&self) -> BalanceMap {
        self.balances.iter().cloned().collect()
    }

    fn positions(&self) -> Vec<Position> {
        self.positions.clone()
    }

    fn orders(&self) -> Vec<Order> {
        self.orders.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("Asset {asset} has weight {weight}, expected (0, 1]")]
    InvalidWeight { asset: Symbol, weight: Decimal },

    #[error("Negative price for {0}")]
    NegativePrice(Symbol),

    #[error("Balance references unknown asset {0}")]
    UnknownAsset(Symbol),

    #[error("Position or order references unknown market {0}")]
    UnknownMarket(Symbol),

    #[error("Negative size in market {0}")]
    NegativeSize(Symbol),

    #[error("More than one position in market {0}")]
    DuplicatePosition(Symbol),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use rust_decimal_macros::dec;

    fn state() -> StaticState {
        StaticState {
            initialized: true,
            assets: vec![Asset::new("USDC", dec!(1), dec!(1))],
            markets: vec![Market::new("SOL-PERP", dec!(100), dec!(100), dec!(0.1), dec!(0))],
            balances: vec![(Symbol::from("USDC"), dec!(1000))],
            positions: vec![Position::new("SOL-PERP", Side::Long, dec!(1), dec!(100), dec!(0))],
            orders: vec![Order::new("SOL-PERP", Side::Short, dec!(2))],
        }
    }

    #[test]
    fn capture_from_provider() {
        let snapshot = AccountSnapshot::capture(&state()).unwrap();
        assert!(snapshot.user_status.is_initialized());
        assert_eq!(snapshot.balances.get(&Symbol::from("USDC")), Some(&dec!(1000)));
        assert!(snapshot.position(&Symbol::from("SOL-PERP")).is_some());
        assert!(snapshot.market(&Symbol::from("BTC-PERP")).is_none());
    }

    #[test]
    fn rejects_weight_out_of_range() {
        let mut s = state();
        s.assets[0].weight = dec!(1.2);
        let result = AccountSnapshot::capture(&s);
        assert!(matches!(result, Err(SnapshotError::InvalidWeight { .. })));

        s.assets[0].weight = dec!(0);
        assert!(AccountSnapshot::capture(&s).is_err());
    }

    #[test]
    fn rejects_unknown_market() {
        let mut s = state();
        s.positions[0].market = Symbol::from("ETH-PERP");
        assert_eq!(
            AccountSnapshot::capture(&s).unwrap_err(),
            SnapshotError::UnknownMarket(Symbol::from("ETH-PERP"))
        );
    }

    #[test]
    fn rejects_unknown_asset_balance() {
        let mut s = state();
        s.balances.push((Symbol::from("BTC"), dec!(1)));
        assert!(matches!(
            AccountSnapshot::capture(&s),
            Err(SnapshotError::UnknownAsset(_))
        ));
    }

    #[test]
    fn rejects_duplicate_position() {
        let mut s = state();
        s.positions.push(s.positions[0].clone());
        assert!(matches!(
            AccountSnapshot::capture(&s),
            Err(SnapshotError::DuplicatePosition(_))
        ));
    }

    #[test]
    fn rejects_negative_order_size() {
        let mut s = state();
        s.orders[0].coins = dec!(-1);
        assert!(matches!(
            AccountSnapshot::capture(&s),
            Err(SnapshotError::NegativeSize(_))
        ));
    }

    #[test]
    fn with_builders_share_untouched_parts() {
        let snapshot = AccountSnapshot::capture(&state()).unwrap();
        let next = snapshot.with_orders(Vec::new()).unwrap();
        assert!(Arc::ptr_eq(&snapshot.markets, &next.markets));
        assert!(Arc::ptr_eq(&snapshot.positions, &next.positions));
        assert!(!Arc::ptr_eq(&snapshot.orders, &next.orders));
    }

    #[test]
    fn with_builders_revalidate() {
        let snapshot = AccountSnapshot::capture(&state()).unwrap();

        // dropping the market orphans the position and the order
        assert_eq!(
            snapshot.with_markets(MarketMap::new()).unwrap_err(),
            SnapshotError::UnknownMarket(Symbol::from("SOL-PERP"))
        );

        let position = Position::new("SOL-PERP", Side::Long, dec!(1), dec!(100), dec!(0));
        assert!(matches!(
            snapshot.with_positions(vec![position.clone(), position]),
            Err(SnapshotError::DuplicatePosition(_))
        ));

        let mut usdc = Asset::new("USDC", dec!(1), dec!(0));
        assert!(matches!(
            snapshot.with_assets(AssetMap::from([(Symbol::from("USDC"), usdc.clone())])),
            Err(SnapshotError::InvalidWeight { .. })
        ));
        usdc.weight = dec!(1);

        let negative = Order::new("SOL-PERP", Side::Short, dec!(-3));
        assert!(matches!(
            snapshot.with_orders(vec![negative]),
            Err(SnapshotError::NegativeSize(_))
        ));
        assert!(matches!(
            snapshot.with_balances(BalanceMap::from([(Symbol::from("BTC"), dec!(1))])),
            Err(SnapshotError::UnknownAsset(_))
        ));
        assert!(snapshot
            .with_assets(AssetMap::from([(Symbol::from("USDC"), usdc)]))
            .is_ok());
    }
}
