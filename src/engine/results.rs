// 9.4 engine/results.rs: report types and the swap intent.

use crate::liquidation::LiquidationPrice;
use crate::margin::MarginStatus;
use crate::snapshot::UserStatus;
use crate::types::{Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Swap `from_amount` of `from` for `to_amount` of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwapIntent {
    pub from: Symbol,
    pub from_amount: Decimal,
    pub to: Symbol,
    pub to_amount: Decimal,
}

impl SwapIntent {
    pub fn new(
        from: impl Into<Symbol>,
        from_amount: Decimal,
        to: impl Into<Symbol>,
        to_amount: Decimal,
    ) -> Self {
        Self {
            from: from.into(),
            from_amount,
            to: to.into(),
            to_amount,
        }
    }

    /// A swap with either leg at zero does nothing.
    pub fn is_empty(&self) -> bool {
        self.from_amount.is_zero() || self.to_amount.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub market: Symbol,
    pub side: Side,
    pub coins: Decimal,
    pub pnl: Decimal,
    pub liquidation_price: LiquidationPrice,
    /// Mark-to-liquidation distance as a fraction of mark
    pub liquidation_buffer: Option<Decimal>,
}

/// Every graph output for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub generation: u64,
    pub user_status: UserStatus,
    pub account_value: Decimal,
    pub true_account_value: Decimal,
    pub weighted_collateral: Decimal,
    pub deposited_collateral: Decimal,
    pub free_collateral: Decimal,
    pub total_borrows: Decimal,
    pub net_apy: Decimal,
    pub cumulative_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub funding: Decimal,
    pub total_position_notional: Decimal,
    pub total_open_position_notional: Decimal,
    pub maintenance_margin_fraction: Decimal,
    pub initial_margin_fraction: Decimal,
    pub margin_fraction: Decimal,
    pub open_margin_fraction: Decimal,
    pub account_leverage: Decimal,
    pub risk: Decimal,
    pub margin_status: MarginStatus,
    pub positions: Vec<PositionReport>,
}
