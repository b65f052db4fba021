//! Risk score and what-if impact simulation.
//!
//! The score blends two curves over the margin fraction. The linear curve,
//! `mmf / mf` scaled to [0, 1], acts as a floor far from liquidation. The log
//! curve, `|ln(min(1, mf)) / ln(mmf)| × 100`, reaches 100 exactly when the
//! margin fraction meets the maintenance fraction and dominates near full
//! utilization. The result is clamped to [0, 100], and any margin fraction at
//! or below a positive maintenance fraction scores 100. Maintenance fractions
//! above 1 are ordinary once borrows of low-weight assets are in play.
//!
//! Impact simulators never touch the graph. They copy the current
//! `(mmf, account value, position notional)` triple, apply a hypothetical
//! action to the copy and report the change in score.

use crate::config::BorrowParams;
use crate::market::Market;
use crate::pnl::PosInfo;
use crate::snapshot::Asset;
use crate::types::{clamp, ratio_or, Side};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MAX_RISK: Decimal = dec!(100);

/// Risk score in [0, 100] for a margin fraction and a maintenance fraction.
pub fn compute_risk(margin_fraction: Decimal, maintenance_margin_fraction: Decimal) -> Decimal {
    let mf = margin_fraction.max(Decimal::ZERO);
    let mmf = maintenance_margin_fraction;

    // at or past maintenance the account is liquidatable, whatever the size of mmf
    if mmf > Decimal::ZERO && mf <= mmf {
        return MAX_RISK;
    }

    let linear = if mf.is_zero() {
        Decimal::ZERO
    } else {
        ratio_or(MAX_RISK * mmf, mf, MAX_RISK).min(MAX_RISK) / MAX_RISK
    };

    clamp(linear.max(log_risk(mf, mmf)), Decimal::ZERO, MAX_RISK)
}

// |ln(min(1, mf)) / ln(mmf)|, zero once mf reaches 1 or without a positive mmf.
// callers have already saturated mf <= mmf, so here 0 < mmf < mf < 1
fn log_risk(mf: Decimal, mmf: Decimal) -> Decimal {
    if mmf <= Decimal::ZERO || mf >= Decimal::ONE {
        return Decimal::ZERO;
    }
    match (mf.checked_ln(), mmf.checked_ln()) {
        (Some(num), Some(den)) if !den.is_zero() => {
            let ratio = ratio_or(num, den, Decimal::ZERO).abs();
            ratio.checked_mul(MAX_RISK).unwrap_or(MAX_RISK).min(MAX_RISK)
        }
        _ => Decimal::ZERO,
    }
}

/// The three numbers every impact simulation works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskInputs {
    pub maintenance_margin_fraction: Decimal,
    pub account_value: Decimal,
    pub total_position_notional: Decimal,
}

impl RiskInputs {
    /// Score for these inputs, `None` when the position notional is zero.
    pub fn risk(&self) -> Option<Decimal> {
        if self.total_position_notional.is_zero() {
            return None;
        }
        let mf = self.account_value.checked_div(self.total_position_notional)?;
        Some(compute_risk(mf, self.maintenance_margin_fraction))
    }

    // withdrawing past the balance borrows the remainder
    pub fn after_withdrawal(
        &self,
        balance: Decimal,
        amount: Decimal,
        asset: &Asset,
        borrow: &BorrowParams,
    ) -> Self {
        let withdrawn = balance.max(Decimal::ZERO).min(amount);
        let borrowed = amount - withdrawn;
        Self {
            maintenance_margin_fraction: self.maintenance_margin_fraction
                + borrowed * borrow.maintenance_weighting(asset.weight),
            account_value: self.account_value - asset.notional(amount),
            total_position_notional: self.total_position_notional + asset.notional(borrowed),
        }
    }

    // depositing into a borrow repays it first
    pub fn after_deposit(
        &self,
        balance: Decimal,
        amount: Decimal,
        asset: &Asset,
        borrow: &BorrowParams,
    ) -> Self {
        let repaid = (-balance).max(Decimal::ZERO).min(amount);
        Self {
            maintenance_margin_fraction: self.maintenance_margin_fraction
                - repaid * borrow.maintenance_weighting(asset.weight),
            account_value: self.account_value + asset.notional(amount),
            total_position_notional: self.total_position_notional - asset.notional(repaid),
        }
    }

    /// Only growth of the larger side adds exposure.
    pub fn after_trade(&self, info: &PosInfo, market: &Market, side: Side, coins: Decimal) -> Self {
        let mut next = *info;
        match side {
            Side::Long => next.long += coins,
            Side::Short => next.short += coins,
        }
        let increase = next.open_size() - info.open_size();
        Self {
            maintenance_margin_fraction: self.maintenance_margin_fraction
                + increase * market.pmmf / dec!(2),
            account_value: self.account_value,
            total_position_notional: self.total_position_notional + market.notional(increase),
        }
    }
}

/// Change in score from `current_risk` to the score of `adjusted`. Zero when
/// the adjusted inputs have no position notional.
pub fn risk_impact(current_risk: Decimal, adjusted: &RiskInputs) -> Decimal {
    match adjusted.risk() {
        Some(risk) => risk - current_risk,
        None => {
            debug!(?adjusted, "impact with zero position notional, reporting no impact");
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.000001)
    }

    #[test]
    fn no_exposure_floor() {
        assert_eq!(compute_risk(dec!(1), dec!(0)), dec!(0));
        // mf above 1 leaves only the linear floor
        assert_eq!(compute_risk(dec!(2), dec!(0.05)), dec!(0.025));
    }

    #[test]
    fn pinned_half_margin() {
        // linear = 0.1, log = ln(0.5) / ln(0.05) * 100
        let risk = compute_risk(dec!(0.5), dec!(0.05));
        assert!(close(risk, dec!(23.137821)), "risk was {risk}");
    }

    #[test]
    fn at_maintenance_is_full_risk() {
        assert!(close(compute_risk(dec!(0.05), dec!(0.05)), dec!(100)));
        assert_eq!(compute_risk(dec!(0.01), dec!(0.05)), dec!(100));
    }

    #[test]
    fn non_positive_margin_saturates() {
        assert_eq!(compute_risk(dec!(0), dec!(0.05)), dec!(100));
        assert_eq!(compute_risk(dec!(-0.3), dec!(0.05)), dec!(100));
    }

    #[test]
    fn non_positive_mmf_scores_zero() {
        assert_eq!(compute_risk(dec!(0.5), dec!(0)), dec!(0));
        assert_eq!(compute_risk(dec!(0.5), dec!(-0.1)), dec!(0));
    }

    #[test]
    fn mmf_above_one_is_liquidatable() {
        // 150 USDC against 5 SOL borrowed at weight 0.5
        assert_eq!(compute_risk(dec!(0.5), dec!(1.06)), dec!(100));
        assert_eq!(compute_risk(dec!(0.5), dec!(1)), dec!(100));
        assert_eq!(compute_risk(dec!(0.2), dec!(5)), dec!(100));
        // above mmf only the linear floor is left
        assert_eq!(compute_risk(dec!(2), dec!(1.5)), dec!(0.75));
    }

    #[test]
    fn score_rises_with_mmf() {
        let mut previous = Decimal::ZERO;
        for mmf in [dec!(0.05), dec!(0.3), dec!(0.9), dec!(1.2), dec!(3)] {
            let risk = compute_risk(dec!(0.95), mmf);
            assert!(risk >= previous, "{mmf}: {risk} < {previous}");
            previous = risk;
        }
    }

    #[test]
    fn withdrawal_within_balance() {
        let inputs = RiskInputs {
            maintenance_margin_fraction: dec!(0.05),
            account_value: dec!(500),
            total_position_notional: dec!(1000),
        };
        let usdc = Asset::new("USDC", dec!(1), dec!(1));
        let next = inputs.after_withdrawal(dec!(400), dec!(100), &usdc, &BorrowParams::default());
        assert_eq!(next.account_value, dec!(400));
        assert_eq!(next.total_position_notional, dec!(1000));
        assert_eq!(next.maintenance_margin_fraction, dec!(0.05));
    }

    #[test]
    fn withdrawal_past_balance_borrows() {
        let inputs = RiskInputs {
            maintenance_margin_fraction: dec!(0),
            account_value: dec!(1000),
            total_position_notional: dec!(0),
        };
        let sol = Asset::new("SOL", dec!(20), dec!(0.8));
        let next = inputs.after_withdrawal(dec!(2), dec!(5), &sol, &BorrowParams::default());
        assert_eq!(next.account_value, dec!(900));
        assert_eq!(next.total_position_notional, dec!(60));
        assert_eq!(next.maintenance_margin_fraction, dec!(3) * dec!(0.2875));
    }

    #[test]
    fn deposit_repays_borrow_first() {
        let inputs = RiskInputs {
            maintenance_margin_fraction: dec!(0.2875),
            account_value: dec!(1800),
            total_position_notional: dec!(200),
        };
        let sol = Asset::new("SOL", dec!(20), dec!(0.8));
        let next = inputs.after_deposit(dec!(-10), dec!(4), &sol, &BorrowParams::default());
        assert_eq!(next.account_value, dec!(1880));
        assert_eq!(next.total_position_notional, dec!(120));
        assert_eq!(next.maintenance_margin_fraction, dec!(0.2875) - dec!(4) * dec!(0.2875));
    }

    #[test]
    fn trade_on_smaller_side_adds_nothing() {
        let inputs = RiskInputs {
            maintenance_margin_fraction: dec!(0.05),
            account_value: dec!(500),
            total_position_notional: dec!(1000),
        };
        let market = Market::new("SOL-PERP", dec!(100), dec!(100), dec!(0.1), dec!(0));
        let info = PosInfo {
            long: dec!(10),
            short: dec!(0),
            pos_size: dec!(10),
        };
        assert_eq!(inputs.after_trade(&info, &market, Side::Short, dec!(4)), inputs);

        let grown = inputs.after_trade(&info, &market, Side::Long, dec!(10));
        assert_eq!(grown.total_position_notional, dec!(2000));
        assert_eq!(grown.maintenance_margin_fraction, dec!(0.3));
    }

    #[test]
    fn impact_without_notional_is_zero() {
        let inputs = RiskInputs {
            maintenance_margin_fraction: dec!(0.05),
            account_value: dec!(500),
            total_position_notional: dec!(0),
        };
        assert_eq!(risk_impact(dec!(10), &inputs), dec!(0));
    }
}
