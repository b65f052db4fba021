//! Account value and margin fractions.
//!
//! Maintenance and initial margin fractions are notional-weighted blends of
//! the borrow-side weighting (from collateral) and each market's position
//! fraction. The margin fraction itself is account value over position
//! notional; an account with no exposure sits at exactly 1.

use crate::collateral::MarginInfo;
use crate::market::Market;
use crate::pnl::PosInfos;
use crate::snapshot::MarketMap;
use crate::types::ratio_or;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub fn account_value(weighted_collateral: Decimal, cumulative_pnl: Decimal, funding: Decimal) -> Decimal {
    weighted_collateral + cumulative_pnl + funding
}

/// Account value before haircuts, from deposited collateral.
pub fn true_account_value(
    deposited_collateral: Decimal,
    cumulative_pnl: Decimal,
    funding: Decimal,
) -> Decimal {
    deposited_collateral + cumulative_pnl + funding
}

fn blended_margin_fraction<F>(
    borrow: MarginInfo,
    pos_infos: &PosInfos,
    markets: &MarketMap,
    fraction: F,
) -> Decimal
where
    F: Fn(&Market) -> Decimal,
{
    let (total, weight) = pos_infos.iter().fold(
        (borrow.weighted_total, borrow.weight),
        |(total, weight), (symbol, info)| match markets.get(symbol) {
            Some(market) => {
                let pos_notional = market.notional(info.pos_size);
                (total + fraction(market) * pos_notional, weight + pos_notional)
            }
            None => (total, weight),
        },
    );
    ratio_or(total, weight, Decimal::ZERO)
}

pub fn maintenance_margin_fraction(
    borrow: MarginInfo,
    pos_infos: &PosInfos,
    markets: &MarketMap,
) -> Decimal {
    blended_margin_fraction(borrow, pos_infos, markets, |m| m.pmmf)
}

pub fn initial_margin_fraction(
    borrow: MarginInfo,
    pos_infos: &PosInfos,
    markets: &MarketMap,
) -> Decimal {
    blended_margin_fraction(borrow, pos_infos, markets, |m| m.pimf())
}

pub fn margin_fraction(account_value: Decimal, total_position_notional: Decimal) -> Decimal {
    ratio_or(account_value, total_position_notional, Decimal::ONE)
}

pub fn open_margin_fraction(
    account_value: Decimal,
    weighted_collateral: Decimal,
    total_open_position_notional: Decimal,
) -> Decimal {
    ratio_or(
        account_value.min(weighted_collateral),
        total_open_position_notional,
        Decimal::ONE,
    )
}

/// Open notional per unit of account value. Zero without exposure or equity.
pub fn account_leverage(total_open_position_notional: Decimal, account_value: Decimal) -> Decimal {
    if account_value <= Decimal::ZERO || total_open_position_notional <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ratio_or(total_open_position_notional, account_value, Decimal::ZERO)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginStatus {
    /// Can open new exposure
    Healthy,
    /// Below initial margin, above maintenance
    Warning,
    Liquidatable,
}

pub fn evaluate_margin_status(
    margin_fraction: Decimal,
    maintenance_margin_fraction: Decimal,
    initial_margin_fraction: Decimal,
) -> MarginStatus {
    if margin_fraction >= initial_margin_fraction {
        MarginStatus::Healthy
    } else if margin_fraction >= maintenance_margin_fraction {
        MarginStatus::Warning
    } else {
        MarginStatus::Liquidatable
    }
}
