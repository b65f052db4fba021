// 8.0 capacity.rs: how much more can the account buy. sized around fees and the nerf factor,
// never charges anything itself.

use crate::config::MathConfig;
use crate::market::Market;
use crate::pnl::PosInfo;
use crate::types::{ratio_or, Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/** 8.1: a prospective trade. `price` only matters for collateral spend */
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeIntent {
    pub market: Symbol,
    pub side: Side,
    pub coins: Decimal,
    pub price: Decimal,
    pub post_only: bool,
}

impl TradeIntent {
    pub fn new(market: impl Into<Symbol>, side: Side, coins: Decimal, price: Decimal) -> Self {
        Self {
            market: market.into(),
            side,
            coins,
            price,
            post_only: false,
        }
    }

    pub fn post_only(mut self) -> Self {
        self.post_only = true;
        self
    }
}

/// Margin state the capacity formula reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityInputs {
    pub account_value: Decimal,
    pub funding: Decimal,
    pub weighted_collateral: Decimal,
    pub total_open_position_notional: Decimal,
}

// 8.2: room left under the market's initial margin, in contracts, net of what
// is already open on the intent's side
pub fn max_contracts_purchaseable(
    inputs: &CapacityInputs,
    info: &PosInfo,
    market: &Market,
    side: Side,
    post_only: bool,
    config: &MathConfig,
) -> Decimal {
    if market.base_imf.is_zero() || market.mark_price.is_zero() {
        return Decimal::ZERO;
    }

    let usable = inputs
        .account_value
        .min(inputs.funding + inputs.weighted_collateral);
    let supported_notional = ratio_or(usable, market.base_imf, Decimal::ZERO);
    let headroom = ratio_or(
        supported_notional - inputs.total_open_position_notional,
        market.mark_price,
        Decimal::ZERO,
    );

    let contracts = (info.open_size() + headroom - info.side_size(side)).max(Decimal::ZERO);
    contracts * config.fee_multiplier(post_only)
}

pub fn max_collateral_spendable(price: Decimal, max_contracts: Decimal) -> Decimal {
    price * max_contracts
}
