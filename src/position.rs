// 4.0: open position and resting order records. pnl = coins * mark - p_coins, flipped for shorts.
// 4.1 has the per-position funding settlement at the bottom.

use crate::market::Market;
use crate::types::{Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub market: Symbol,
    /// Unsigned size, direction lives in `side`
    pub coins: Decimal,
    pub side: Side,
    /// Quote-notional cost basis
    pub p_coins: Decimal,
    pub realized_pnl: Decimal,
    /// Funding index at the last settlement
    pub funding_index: Decimal,
}

impl Position {
    pub fn new(
        market: impl Into<Symbol>,
        side: Side,
        coins: Decimal,
        p_coins: Decimal,
        funding_index: Decimal,
    ) -> Self {
        Self {
            market: market.into(),
            coins,
            side,
            p_coins,
            realized_pnl: Decimal::ZERO,
            funding_index,
        }
    }

    pub fn with_realized_pnl(mut self, realized_pnl: Decimal) -> Self {
        self.realized_pnl = realized_pnl;
        self
    }

    pub fn is_long(&self) -> bool {
        self.side.is_long()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_zero()
    }

    // 4.2: paper gains/losses at the market's mark price
    pub fn unrealized_pnl(&self, market: &Market) -> Decimal {
        calculate_unrealized_pnl(self.side, self.coins, self.p_coins, market.mark_price)
    }

    pub fn notional_value(&self, market: &Market) -> Decimal {
        market.notional(self.coins)
    }

    // 4.1: longs pay when the index rises, shorts receive
    pub fn pending_funding(&self, market: &Market) -> Decimal {
        let funding_delta = market.funding_index - self.funding_index;
        match self.side {
            Side::Long => -(self.coins * funding_delta),
            Side::Short => self.coins * funding_delta,
        }
    }
}

// 4.3: the pnl formula. coins * mark - cost basis, sign flipped for shorts
pub fn calculate_unrealized_pnl(
    side: Side,
    coins: Decimal,
    p_coins: Decimal,
    mark_price: Decimal,
) -> Decimal {
    let diff = coins * mark_price - p_coins;
    match side {
        Side::Long => diff,
        Side::Short => -diff,
    }
}

/// Resting order exposure, not yet a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub market: Symbol,
    pub coins: Decimal,
    pub side: Side,
}

impl Order {
    pub fn new(market: impl Into<Symbol>, side: Side, coins: Decimal) -> Self {
        Self {
            market: market.into(),
            coins,
            side,
        }
    }

    pub fn notional_value(&self, market: &Market) -> Decimal {
        market.notional(self.coins)
    }
}
