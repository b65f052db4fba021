// 9.0 engine/core.rs: AccountMath owns the snapshot, the memoized node table, and the query caches.
// every read is &self. update is the only writer and leaves the graph fully resolved.

use super::nodes::{self, Node};
use super::queries::QueryCaches;
use crate::collateral::MarginInfo;
use crate::config::{ConfigError, MathConfig};
use crate::graph::Memo;
use crate::margin::{evaluate_margin_status, MarginStatus};
use crate::pnl::{PosInfo, PosInfos};
use crate::snapshot::{AccountSnapshot, BalanceMap};
use crate::types::Symbol;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

/** 9.1: derived risk state for one account */
#[derive(Debug)]
pub struct AccountMath {
    pub(super) config: MathConfig,
    pub(super) snapshot: AccountSnapshot,
    memo: Memo<Node, nodes::Derived>,
    pub(super) generation: u64,
    pub(super) queries: QueryCaches,
}

impl AccountMath {
    /// Starts from an uninitialized account.
    pub fn new(config: MathConfig) -> Result<Self, ConfigError> {
        Self::with_snapshot(config, AccountSnapshot::uninitialized())
    }

    pub fn with_snapshot(config: MathConfig, snapshot: AccountSnapshot) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut math = Self {
            config,
            snapshot,
            memo: Memo::new(),
            generation: 0,
            queries: QueryCaches::default(),
        };
        let recomputed = math.resolve();
        debug!(generation = math.generation, recomputed, "graph initialized");
        Ok(math)
    }

    // 9.2: install a newer snapshot. returns the number of nodes recomputed
    pub fn update(&mut self, snapshot: AccountSnapshot) -> usize {
        let changed = changed_inputs(&self.snapshot, &snapshot);
        self.snapshot = snapshot;

        if changed.is_empty() {
            debug!(generation = self.generation, "snapshot unchanged, keeping cached values");
            return 0;
        }

        for &input in &changed {
            self.memo.touch(input);
        }
        let recomputed = self.resolve();
        self.generation += 1;
        debug!(generation = self.generation, ?changed, recomputed, "snapshot installed");
        recomputed
    }

    fn resolve(&mut self) -> usize {
        let snapshot = &self.snapshot;
        let config = &self.config;
        self.memo
            .resolve(|node, deps| nodes::evaluate(node, snapshot, config, deps))
    }

    pub fn config(&self) -> &MathConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &AccountSnapshot {
        &self.snapshot
    }

    /// Bumped on every update that changed at least one input.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot.user_status.is_initialized()
    }

    /// How many times `node` has been computed since construction.
    pub fn evaluations(&self, node: Node) -> u64 {
        self.memo.evaluations(node)
    }

    pub fn total_evaluations(&self) -> u64 {
        self.memo.total_evaluations()
    }

    fn amount(&self, node: Node) -> Decimal {
        match self.memo.get(node).and_then(nodes::Derived::amount) {
            Some(value) => value,
            None => node.neutral().amount().unwrap_or(Decimal::ZERO),
        }
    }

    fn margin_info(&self, node: Node) -> MarginInfo {
        self.memo
            .get(node)
            .and_then(nodes::Derived::margin)
            .unwrap_or_default()
    }

    // 9.3: graph reads

    pub fn realized_pnl(&self) -> Decimal {
        self.amount(Node::RealizedPnl)
    }

    pub fn cumulative_pnl(&self) -> Decimal {
        self.amount(Node::CumulativePnl)
    }

    pub fn funding(&self) -> Decimal {
        self.amount(Node::Funding)
    }

    /// Raw balances with realized pnl settled into the quote asset.
    pub fn settled_balances(&self) -> Arc<BalanceMap> {
        self.memo
            .get(Node::SettledBalances)
            .and_then(nodes::Derived::balances)
            .cloned()
            .unwrap_or_default()
    }

    pub fn pos_infos(&self) -> Arc<PosInfos> {
        self.memo
            .get(Node::PosInfos)
            .and_then(nodes::Derived::exposure)
            .cloned()
            .unwrap_or_default()
    }

    pub fn pos_info(&self, market: &Symbol) -> PosInfo {
        self.pos_infos().get(market).copied().unwrap_or_default()
    }

    pub fn weighted_collateral(&self) -> Decimal {
        self.amount(Node::WeightedCollateral)
    }

    pub fn deposited_collateral(&self) -> Decimal {
        self.amount(Node::DepositedCollateral)
    }

    pub fn total_borrows(&self) -> Decimal {
        self.amount(Node::TotalBorrows)
    }

    pub fn borrow_notional(&self) -> Decimal {
        self.amount(Node::BorrowNotional)
    }

    pub fn borrow_maintenance_margin_info(&self) -> MarginInfo {
        self.margin_info(Node::BorrowMaintenanceInfo)
    }

    pub fn borrow_initial_margin_info(&self) -> MarginInfo {
        self.margin_info(Node::BorrowInitialInfo)
    }

    pub fn borrow_tied_collateral(&self) -> Decimal {
        self.amount(Node::BorrowTiedCollateral)
    }

    pub fn position_tied_collateral(&self) -> Decimal {
        self.amount(Node::PositionTiedCollateral)
    }

    pub fn free_collateral(&self) -> Decimal {
        self.amount(Node::FreeCollateral)
    }

    /// Percent per year across all balances.
    pub fn net_apy(&self) -> Decimal {
        self.amount(Node::NetApy)
    }

    pub fn account_value(&self) -> Decimal {
        self.amount(Node::AccountValue)
    }

    pub fn true_account_value(&self) -> Decimal {
        self.amount(Node::TrueAccountValue)
    }

    pub fn total_position_notional(&self) -> Decimal {
        self.amount(Node::TotalPositionNotional)
    }

    pub fn total_open_position_notional(&self) -> Decimal {
        self.amount(Node::TotalOpenPositionNotional)
    }

    pub fn maintenance_margin_fraction(&self) -> Decimal {
        self.amount(Node::MaintenanceMarginFraction)
    }

    pub fn initial_margin_fraction(&self) -> Decimal {
        self.amount(Node::InitialMarginFraction)
    }

    pub fn margin_fraction(&self) -> Decimal {
        self.amount(Node::MarginFraction)
    }

    pub fn open_margin_fraction(&self) -> Decimal {
        self.amount(Node::OpenMarginFraction)
    }

    /// Score in [0, 100].
    pub fn risk(&self) -> Decimal {
        self.amount(Node::Risk)
    }

    pub fn account_leverage(&self) -> Decimal {
        self.amount(Node::AccountLeverage)
    }

    pub fn margin_status(&self) -> MarginStatus {
        evaluate_margin_status(
            self.margin_fraction(),
            self.maintenance_margin_fraction(),
            self.initial_margin_fraction(),
        )
    }
}

// user status compares by value, every other part by pointer identity
fn changed_inputs(old: &AccountSnapshot, new: &AccountSnapshot) -> Vec<Node> {
    let mut changed = Vec::new();
    if old.user_status != new.user_status {
        changed.push(Node::UserStatus);
    }
    if !Arc::ptr_eq(&old.assets, &new.assets) {
        changed.push(Node::Assets);
    }
    if !Arc::ptr_eq(&old.markets, &new.markets) {
        changed.push(Node::Markets);
    }
    if !Arc::ptr_eq(&old.balances, &new.balances) {
        changed.push(Node::Balances);
    }
    if !Arc::ptr_eq(&old.positions, &new.positions) {
        changed.push(Node::Positions);
    }
    if !Arc::ptr_eq(&old.orders, &new.orders) {
        changed.push(Node::Orders);
    }
    changed
}
