//! Collateral and borrow-lending valuation.
//!
//! Positive balances count as collateral after the asset's haircut. Negative
//! balances are borrows: they count against collateral at full notional and
//! carry their own margin weighting (`C / weight - 1`), which is later blended
//! with the perp-side margin fractions.
//!
//! Functions here assume an initialized account; the graph substitutes the
//! neutral value otherwise. Balances for assets missing from the snapshot are
//! ignored.

use crate::config::BorrowParams;
use crate::pnl::PosInfos;
use crate::snapshot::{Asset, AssetMap, BalanceMap, MarketMap};
use crate::types::{ratio_or, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Borrow-side margin contribution: `Σ notional × factor` and `Σ notional`,
/// both absolute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginInfo {
    pub weighted_total: Decimal,
    pub weight: Decimal,
}

fn priced<'a>(
    balances: &'a BalanceMap,
    assets: &'a AssetMap,
) -> impl Iterator<Item = (&'a Asset, Decimal)> + 'a {
    balances
        .iter()
        .filter_map(move |(symbol, balance)| assets.get(symbol).map(|a| (a, *balance)))
}

/// Raw balances with realized pnl settled into the quote asset.
pub fn settled_balances(
    balances: &BalanceMap,
    assets: &AssetMap,
    quote: &Symbol,
    realized_pnl: Decimal,
) -> BalanceMap {
    let mut settled = balances.clone();
    if !realized_pnl.is_zero() && assets.contains_key(quote) {
        *settled.entry(quote.clone()).or_insert(Decimal::ZERO) += realized_pnl;
    }
    settled
}

/// Haircut deposits minus full-notional borrows.
pub fn weighted_collateral(balances: &BalanceMap, assets: &AssetMap) -> Decimal {
    priced(balances, assets)
        .map(|(asset, balance)| {
            if balance >= Decimal::ZERO {
                asset.notional(balance) * asset.weight
            } else {
                asset.notional(balance)
            }
        })
        .sum()
}

/// Unweighted value of every balance plus realized pnl.
pub fn deposited_collateral(
    raw_balances: &BalanceMap,
    assets: &AssetMap,
    realized_pnl: Decimal,
) -> Decimal {
    let value: Decimal = priced(raw_balances, assets)
        .map(|(asset, balance)| asset.notional(balance))
        .sum();
    value + realized_pnl
}

pub fn total_borrows(balances: &BalanceMap, assets: &AssetMap) -> Decimal {
    priced(balances, assets)
        .filter(|(_, balance)| *balance < Decimal::ZERO)
        .map(|(asset, balance)| -asset.notional(balance))
        .sum()
}

/// Notional of the borrow legs, counted as position notional.
pub fn borrow_notional(balances: &BalanceMap, assets: &AssetMap) -> Decimal {
    let net: Decimal = priced(balances, assets)
        .filter(|(_, balance)| *balance < Decimal::ZERO)
        .map(|(asset, balance)| asset.notional(balance))
        .sum();
    net.abs()
}

pub fn borrow_margin_info<F>(balances: &BalanceMap, assets: &AssetMap, factor: F) -> MarginInfo
where
    F: Fn(Decimal) -> Decimal,
{
    let (weighted_total, weight) = priced(balances, assets)
        .filter(|(_, balance)| *balance < Decimal::ZERO)
        .fold((Decimal::ZERO, Decimal::ZERO), |(total, weight), (asset, balance)| {
            let notional = asset.notional(balance);
            (total + notional * factor(asset.weight), weight + notional)
        });
    MarginInfo {
        weighted_total: weighted_total.abs(),
        weight: weight.abs(),
    }
}

pub fn borrow_maintenance_margin_info(
    balances: &BalanceMap,
    assets: &AssetMap,
    params: &BorrowParams,
) -> MarginInfo {
    borrow_margin_info(balances, assets, |w| params.maintenance_weighting(w))
}

pub fn borrow_initial_margin_info(
    balances: &BalanceMap,
    assets: &AssetMap,
    params: &BorrowParams,
) -> MarginInfo {
    borrow_margin_info(balances, assets, |w| params.initial_weighting(w))
}

/// Collateral that backs open borrows and cannot be withdrawn.
pub fn borrow_tied_collateral(
    balances: &BalanceMap,
    assets: &AssetMap,
    params: &BorrowParams,
) -> Decimal {
    priced(balances, assets)
        .filter(|(_, balance)| *balance < Decimal::ZERO)
        .map(|(asset, balance)| params.initial_weighting(asset.weight) * asset.notional(balance).abs())
        .sum()
}

/// Collateral reserved by perp exposure: `base_imf × (open size + position notional)`.
pub fn position_tied_collateral(pos_infos: &PosInfos, markets: &MarketMap) -> Decimal {
    pos_infos
        .iter()
        .filter_map(|(symbol, info)| {
            markets.get(symbol).map(|market| {
                let pos_notional = market.notional(info.pos_size);
                market.base_imf * (info.open_size() + pos_notional)
            })
        })
        .sum()
}

pub fn free_collateral(
    account_value: Decimal,
    funding: Decimal,
    weighted_collateral: Decimal,
    borrow_tied: Decimal,
    position_tied: Decimal,
) -> Decimal {
    let usable = account_value.min(funding + weighted_collateral);
    (usable - borrow_tied - position_tied).max(Decimal::ZERO)
}

/// Amount of `asset` that can leave without borrowing. Anything short of the
/// full balance is shrunk by `nerf_factor`.
pub fn collateral_withdrawable(
    balance: Decimal,
    free_collateral: Decimal,
    asset: &Asset,
    nerf_factor: Decimal,
) -> Decimal {
    let per_unit = asset.index_price * asset.weight;
    let by_margin = ratio_or(free_collateral, per_unit, Decimal::ZERO);
    let withdrawable = balance.min(by_margin).max(Decimal::ZERO);
    if withdrawable != balance {
        withdrawable * (Decimal::ONE - nerf_factor)
    } else {
        withdrawable
    }
}

/// Withdrawable amount when the remainder of free collateral may back a new
/// borrow of the same asset.
pub fn collateral_withdrawable_with_borrow(
    withdrawable: Decimal,
    free_collateral: Decimal,
    asset: &Asset,
    params: &BorrowParams,
    nerf_factor: Decimal,
) -> Decimal {
    let withdrawn_notional = asset.notional(withdrawable);
    let factor = params.initial_weighting(asset.weight);
    let spare = (free_collateral - withdrawn_notional).max(Decimal::ZERO);
    let borrowable = ratio_or(spare, (Decimal::ONE + factor) * asset.index_price, Decimal::ZERO);
    (borrowable + withdrawable) * (Decimal::ONE - nerf_factor)
}

/// Notional-weighted APY across supplies and borrows, in percent.
pub fn net_apy(balances: &BalanceMap, assets: &AssetMap) -> Decimal {
    let (weighted, notional) = priced(balances, assets).fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(weighted, notional), (asset, balance)| {
            let value = asset.notional(balance);
            let apy = if balance > Decimal::ZERO {
                asset.supply_apy
            } else {
                asset.borrows_apy
            };
            (weighted + value * apy, notional + value)
        },
    );
    ratio_or(weighted, notional, Decimal::ZERO)
}

/// Per-asset notional of deposits (`borrows = false`) or borrows, borrows
/// reported as positive numbers.
pub fn breakdown(balances: &BalanceMap, assets: &AssetMap, borrows: bool) -> Vec<(Symbol, Decimal)> {
    priced(balances, assets)
        .filter(|(_, balance)| {
            if borrows {
                *balance < Decimal::ZERO
            } else {
                *balance > Decimal::ZERO
            }
        })
        .map(|(asset, balance)| (asset.symbol.clone(), asset.notional(balance).abs()))
        .collect()
}
