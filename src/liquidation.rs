//! Liquidation price per position.
//!
//! The account is cross-margined, so a position's liquidation price is the
//! mark at which the whole account's margin fraction would fall to the
//! maintenance fraction if only this market moved. The price move that eats
//! the margin surplus is
//!
//! `Δp = (mf - mmf) × total_open_notional / (coins × (1 - pmmf))`
//!
//! Longs liquidate `Δp` below mark, shorts `Δp` above. A price at or below
//! zero can never be reached and is reported as [`LiquidationPrice::Unreachable`].

use crate::market::Market;
use crate::position::Position;
use crate::types::{ratio_or, DisplayNumber, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidationPrice {
    Price(Decimal),
    /// No finite mark liquidates the position
    Unreachable,
}

impl LiquidationPrice {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            LiquidationPrice::Price(price) => Some(*price),
            LiquidationPrice::Unreachable => None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, LiquidationPrice::Price(_))
    }
}

impl DisplayNumber for LiquidationPrice {
    fn to_display_number(&self) -> f64 {
        match self {
            LiquidationPrice::Price(price) => price.to_display_number(),
            LiquidationPrice::Unreachable => f64::INFINITY,
        }
    }
}

pub fn liquidation_price(
    position: &Position,
    market: &Market,
    margin_fraction: Decimal,
    maintenance_margin_fraction: Decimal,
    total_open_position_notional: Decimal,
) -> LiquidationPrice {
    let denominator = position.coins * (Decimal::ONE - market.pmmf);
    if denominator.is_zero() {
        return LiquidationPrice::Unreachable;
    }

    let surplus = (margin_fraction - maintenance_margin_fraction)
        .checked_mul(total_open_position_notional);
    let Some(delta) = surplus.and_then(|s| s.checked_div(denominator)) else {
        warn!(market = %market.symbol, "liquidation price overflowed, treating as unreachable");
        return LiquidationPrice::Unreachable;
    };

    let price = match position.side {
        Side::Long => market.mark_price - delta,
        Side::Short => market.mark_price + delta,
    };

    if price <= Decimal::ZERO {
        LiquidationPrice::Unreachable
    } else {
        LiquidationPrice::Price(price)
    }
}

/// Distance from mark to liquidation as a fraction of mark. `None` when the
/// liquidation price is unreachable or the mark is zero.
pub fn buffer_fraction(mark_price: Decimal, liquidation: LiquidationPrice) -> Option<Decimal> {
    let price = liquidation.value()?;
    if mark_price.is_zero() {
        return None;
    }
    Some(ratio_or((mark_price - price).abs(), mark_price, Decimal::ZERO))
}
