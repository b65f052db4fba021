//! Perpetual market parameters as seen by one snapshot.
//!
//! A market carries its prices, margin fractions, and the cumulative funding
//! index. Everything here is immutable for the lifetime of a snapshot.

use crate::types::Symbol;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Maintenance margin is half of the base initial margin fraction.
pub const MMF_MULTIPLIER: Decimal = dec!(2);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Market key (e.g., "SOL-PERP")
    pub symbol: Symbol,
    pub mark_price: Decimal,
    pub index_price: Decimal,
    /// Base initial margin fraction
    pub base_imf: Decimal,
    /// Position maintenance margin fraction (base_imf / 2)
    pub pmmf: Decimal,
    /// Cumulative funding index, quote per contract
    pub funding_index: Decimal,
}

impl Market {
    pub fn new(
        symbol: impl Into<Symbol>,
        mark_price: Decimal,
        index_price: Decimal,
        base_imf: Decimal,
        funding_index: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            mark_price,
            index_price,
            base_imf,
            pmmf: base_imf / MMF_MULTIPLIER,
            funding_index,
        }
    }

    /// Position initial margin fraction.
    pub fn pimf(&self) -> Decimal {
        self.pmmf * MMF_MULTIPLIER
    }

    /// Quote value of `coins` contracts at the mark price.
    pub fn notional(&self, coins: Decimal) -> Decimal {
        coins * self.mark_price
    }

    pub fn with_mark_price(&self, mark_price: Decimal) -> Self {
        Self {
            mark_price,
            ..self.clone()
        }
    }
}
