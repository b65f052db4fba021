//! Parameterized reads: per-asset, per-market and per-intent.
//!
//! Results are cached by `(generation, parameter)` and dropped when a new
//! generation is installed. Missing assets or markets yield the documented
//! default instead of an error.

use super::core::AccountMath;
use super::results::{PositionReport, RiskReport, SwapIntent};
use crate::capacity::{self, CapacityInputs, TradeIntent};
use crate::collateral;
use crate::graph::QueryCache;
use crate::liquidation::{self, LiquidationPrice};
use crate::pnl;
use crate::position::Position;
use crate::risk::{risk_impact, RiskInputs};
use crate::types::{Side, Symbol};
use rust_decimal::Decimal;

#[derive(Debug, Default)]
pub(crate) struct QueryCaches {
    position_pnl: QueryCache<Symbol, Decimal>,
    liquidation_price: QueryCache<Symbol, LiquidationPrice>,
    withdrawable: QueryCache<Symbol, Decimal>,
    withdrawable_with_borrow: QueryCache<Symbol, Decimal>,
    withdraw_impact: QueryCache<(Symbol, Decimal), Decimal>,
    deposit_impact: QueryCache<(Symbol, Decimal), Decimal>,
    swap_impact: QueryCache<SwapIntent, Decimal>,
    perp_impact: QueryCache<TradeIntent, Decimal>,
    max_contracts: QueryCache<(Symbol, Side, bool), Decimal>,
}

impl QueryCaches {
    pub(crate) fn misses(&self) -> u64 {
        self.position_pnl.misses()
            + self.liquidation_price.misses()
            + self.withdrawable.misses()
            + self.withdrawable_with_borrow.misses()
            + self.withdraw_impact.misses()
            + self.deposit_impact.misses()
            + self.swap_impact.misses()
            + self.perp_impact.misses()
            + self.max_contracts.misses()
    }
}

impl AccountMath {
    /// Parameterized computations performed so far, i.e. query cache misses.
    pub fn query_evaluations(&self) -> u64 {
        self.queries.misses()
    }

    fn risk_inputs(&self) -> RiskInputs {
        RiskInputs {
            maintenance_margin_fraction: self.maintenance_margin_fraction(),
            account_value: self.account_value(),
            total_position_notional: self.total_position_notional(),
        }
    }

    /// Settled balance of `asset`, zero when absent.
    pub fn balance(&self, asset: &Symbol) -> Decimal {
        self.settled_balances()
            .get(asset)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn position(&self, market: &Symbol) -> Option<&Position> {
        if !self.is_initialized() {
            return None;
        }
        self.snapshot.position(market)
    }

    pub fn open_positions(&self) -> Vec<&Position> {
        if !self.is_initialized() {
            return Vec::new();
        }
        pnl::open_positions(&self.snapshot)
    }

    pub fn deposits_breakdown(&self) -> Vec<(Symbol, Decimal)> {
        collateral::breakdown(&self.settled_balances(), &self.snapshot.assets, false)
    }

    pub fn borrows_breakdown(&self) -> Vec<(Symbol, Decimal)> {
        collateral::breakdown(&self.settled_balances(), &self.snapshot.assets, true)
    }

    pub fn position_pnl(&self, market: &Symbol) -> Decimal {
        self.queries
            .position_pnl
            .get_or_compute(self.generation, market.clone(), || {
                match self.position(market) {
                    Some(position) => pnl::position_pnl(&self.snapshot.markets, position),
                    None => Decimal::ZERO,
                }
            })
    }

    pub fn liquidation_price(&self, market: &Symbol) -> LiquidationPrice {
        self.queries
            .liquidation_price
            .get_or_compute(self.generation, market.clone(), || {
                let (Some(position), Some(perp)) = (self.position(market), self.snapshot.market(market))
                else {
                    return LiquidationPrice::Unreachable;
                };
                liquidation::liquidation_price(
                    position,
                    perp,
                    self.margin_fraction(),
                    self.maintenance_margin_fraction(),
                    self.total_open_position_notional(),
                )
            })
    }

    pub fn collateral_withdrawable(&self, asset: &Symbol) -> Decimal {
        self.queries
            .withdrawable
            .get_or_compute(self.generation, asset.clone(), || {
                match self.snapshot.asset(asset) {
                    Some(a) if self.is_initialized() => collateral::collateral_withdrawable(
                        self.balance(asset),
                        self.free_collateral(),
                        a,
                        self.config.nerf_factor,
                    ),
                    _ => Decimal::ZERO,
                }
            })
    }

    pub fn collateral_withdrawable_with_borrow(&self, asset: &Symbol) -> Decimal {
        self.queries
            .withdrawable_with_borrow
            .get_or_compute(self.generation, asset.clone(), || {
                match self.snapshot.asset(asset) {
                    Some(a) if self.is_initialized() => {
                        collateral::collateral_withdrawable_with_borrow(
                            self.collateral_withdrawable(asset),
                            self.free_collateral(),
                            a,
                            &self.config.borrow,
                            self.config.nerf_factor,
                        )
                    }
                    _ => Decimal::ZERO,
                }
            })
    }

    // impacts

    pub fn risk_withdraw_asset_impact(&self, asset: &Symbol, amount: Decimal) -> Decimal {
        self.queries
            .withdraw_impact
            .get_or_compute(self.generation, (asset.clone(), amount), || {
                match self.snapshot.asset(asset) {
                    Some(a) if self.is_initialized() && !amount.is_zero() => {
                        let adjusted = self.risk_inputs().after_withdrawal(
                            self.balance(asset),
                            amount,
                            a,
                            &self.config.borrow,
                        );
                        risk_impact(self.risk(), &adjusted)
                    }
                    _ => Decimal::ZERO,
                }
            })
    }

    pub fn risk_deposit_asset_impact(&self, asset: &Symbol, amount: Decimal) -> Decimal {
        self.queries
            .deposit_impact
            .get_or_compute(self.generation, (asset.clone(), amount), || {
                match self.snapshot.asset(asset) {
                    Some(a) if self.is_initialized() && !amount.is_zero() => {
                        let adjusted = self.risk_inputs().after_deposit(
                            self.balance(asset),
                            amount,
                            a,
                            &self.config.borrow,
                        );
                        risk_impact(self.risk(), &adjusted)
                    }
                    _ => Decimal::ZERO,
                }
            })
    }

    /// Withdraw `from`, then deposit `to`, both against current balances.
    pub fn risk_swap_assets_impact(&self, swap: &SwapIntent) -> Decimal {
        self.queries
            .swap_impact
            .get_or_compute(self.generation, swap.clone(), || {
                let from = self.snapshot.asset(&swap.from);
                let to = self.snapshot.asset(&swap.to);
                let (Some(from), Some(to)) = (from, to) else {
                    return Decimal::ZERO;
                };
                if !self.is_initialized() || swap.is_empty() {
                    return Decimal::ZERO;
                }
                let adjusted = self
                    .risk_inputs()
                    .after_withdrawal(
                        self.balance(&swap.from),
                        swap.from_amount,
                        from,
                        &self.config.borrow,
                    )
                    .after_deposit(
                        self.balance(&swap.to),
                        swap.to_amount,
                        to,
                        &self.config.borrow,
                    );
                risk_impact(self.risk(), &adjusted)
            })
    }

    pub fn risk_perp_impact(&self, intent: &TradeIntent) -> Decimal {
        self.queries
            .perp_impact
            .get_or_compute(self.generation, intent.clone(), || {
                match self.snapshot.market(&intent.market) {
                    Some(market) if self.is_initialized() && !intent.coins.is_zero() => {
                        let info = self.pos_info(&intent.market);
                        let adjusted =
                            self.risk_inputs()
                                .after_trade(&info, market, intent.side, intent.coins);
                        risk_impact(self.risk(), &adjusted)
                    }
                    _ => Decimal::ZERO,
                }
            })
    }

    // capacity

    pub fn max_contracts_purchaseable(&self, intent: &TradeIntent) -> Decimal {
        let key = (intent.market.clone(), intent.side, intent.post_only);
        self.queries
            .max_contracts
            .get_or_compute(self.generation, key, || {
                match self.snapshot.market(&intent.market) {
                    Some(market) if self.is_initialized() => {
                        let inputs = CapacityInputs {
                            account_value: self.account_value(),
                            funding: self.funding(),
                            weighted_collateral: self.weighted_collateral(),
                            total_open_position_notional: self.total_open_position_notional(),
                        };
                        capacity::max_contracts_purchaseable(
                            &inputs,
                            &self.pos_info(&intent.market),
                            market,
                            intent.side,
                            intent.post_only,
                            &self.config,
                        )
                    }
                    _ => Decimal::ZERO,
                }
            })
    }

    pub fn max_collateral_spendable(&self, intent: &TradeIntent) -> Decimal {
        capacity::max_collateral_spendable(intent.price, self.max_contracts_purchaseable(intent))
    }

    // reports

    pub fn position_reports(&self) -> Vec<PositionReport> {
        self.open_positions()
            .into_iter()
            .map(|p| {
                let liquidation_price = self.liquidation_price(&p.market);
                PositionReport {
                    market: p.market.clone(),
                    side: p.side,
                    coins: p.coins,
                    pnl: self.position_pnl(&p.market),
                    liquidation_price,
                    liquidation_buffer: self
                        .snapshot
                        .market(&p.market)
                        .and_then(|m| liquidation::buffer_fraction(m.mark_price, liquidation_price)),
                }
            })
            .collect()
    }

    pub fn report(&self) -> RiskReport {
        RiskReport {
            generation: self.generation,
            user_status: self.snapshot.user_status,
            account_value: self.account_value(),
            true_account_value: self.true_account_value(),
            weighted_collateral: self.weighted_collateral(),
            deposited_collateral: self.deposited_collateral(),
            free_collateral: self.free_collateral(),
            total_borrows: self.total_borrows(),
            net_apy: self.net_apy(),
            cumulative_pnl: self.cumulative_pnl(),
            realized_pnl: self.realized_pnl(),
            funding: self.funding(),
            total_position_notional: self.total_position_notional(),
            total_open_position_notional: self.total_open_position_notional(),
            maintenance_margin_fraction: self.maintenance_margin_fraction(),
            initial_margin_fraction: self.initial_margin_fraction(),
            margin_fraction: self.margin_fraction(),
            open_margin_fraction: self.open_margin_fraction(),
            account_leverage: self.account_leverage(),
            risk: self.risk(),
            margin_status: self.margin_status(),
            positions: self.position_reports(),
        }
    }
}
