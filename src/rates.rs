//! Utilization-based interest rates for borrow-lending pools.
//!
//! A two-slope kink model: the rate climbs linearly to `optimal_rate` at
//! `optimal_utilization`, then steeply to `max_rate` at full utilization.
//! Rates are fractions per year; the APYs handed to [`Asset`] are percent.

use crate::snapshot::Asset;
use crate::types::ratio_or;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateModel {
    pub optimal_utilization: Decimal,
    pub optimal_rate: Decimal,
    pub max_rate: Decimal,
}

impl Default for RateModel {
    fn default() -> Self {
        Self {
            optimal_utilization: dec!(0.8),
            optimal_rate: dec!(0.1),
            max_rate: dec!(1),
        }
    }
}

/// Share of supply currently borrowed. Pools with less than one unit
/// supplied report zero.
pub fn utilization(supply: Decimal, borrows: Decimal) -> Decimal {
    if supply < Decimal::ONE {
        return Decimal::ZERO;
    }
    ratio_or(borrows, supply, Decimal::ZERO)
}

impl RateModel {
    pub fn borrow_rate(&self, utilization: Decimal) -> Decimal {
        if utilization > self.optimal_utilization {
            let slope = ratio_or(
                self.max_rate - self.optimal_rate,
                Decimal::ONE - self.optimal_utilization,
                Decimal::ZERO,
            );
            self.optimal_rate + slope * (utilization - self.optimal_utilization)
        } else {
            ratio_or(self.optimal_rate, self.optimal_utilization, Decimal::ZERO) * utilization
        }
    }

    /// `(supply_apy, borrow_apy)` in percent for a pool.
    pub fn apys(&self, supply: Decimal, borrows: Decimal) -> (Decimal, Decimal) {
        let util = utilization(supply, borrows);
        let rate = self.borrow_rate(util);
        (rate * util * dec!(100), rate * dec!(100))
    }

    /// Returns `asset` with its APYs derived from the pool totals.
    pub fn price_asset(&self, asset: Asset, supply: Decimal, borrows: Decimal) -> Asset {
        let (supply_apy, borrow_apy) = self.apys(supply, borrows);
        asset.with_apys(supply_apy, borrow_apy)
    }
}
