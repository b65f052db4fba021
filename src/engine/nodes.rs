//! The node table of the account derivation graph.
//!
//! Inputs come first, then every derived node after all of its
//! dependencies. The order is checked at compile time. Each first-layer
//! derived node depends on `UserStatus`, so a status change reaches every
//! node and the neutral short-circuit in [`evaluate`] stays consistent.

use crate::collateral::{self, MarginInfo};
use crate::config::MathConfig;
use crate::graph::{NodeSet, Resolved};
use crate::margin;
use crate::pnl;
use crate::risk::compute_risk;
use crate::snapshot::{AccountSnapshot, BalanceMap};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    // inputs
    UserStatus,
    Assets,
    Markets,
    Balances,
    Positions,
    Orders,

    // pnl and exposure
    RealizedPnl,
    SettledBalances,
    PosInfos,
    CumulativePnl,
    Funding,

    // collateral
    WeightedCollateral,
    DepositedCollateral,
    TotalBorrows,
    BorrowNotional,
    BorrowMaintenanceInfo,
    BorrowInitialInfo,
    BorrowTiedCollateral,
    NetApy,

    // margin and risk
    AccountValue,
    TrueAccountValue,
    TotalPositionNotional,
    TotalOpenPositionNotional,
    PositionTiedCollateral,
    FreeCollateral,
    MaintenanceMarginFraction,
    InitialMarginFraction,
    MarginFraction,
    OpenMarginFraction,
    Risk,
    AccountLeverage,
}

use Node::*;

impl Node {
    pub const ALL: [Node; 31] = [
        UserStatus,
        Assets,
        Markets,
        Balances,
        Positions,
        Orders,
        RealizedPnl,
        SettledBalances,
        PosInfos,
        CumulativePnl,
        Funding,
        WeightedCollateral,
        DepositedCollateral,
        TotalBorrows,
        BorrowNotional,
        BorrowMaintenanceInfo,
        BorrowInitialInfo,
        BorrowTiedCollateral,
        NetApy,
        AccountValue,
        TrueAccountValue,
        TotalPositionNotional,
        TotalOpenPositionNotional,
        PositionTiedCollateral,
        FreeCollateral,
        MaintenanceMarginFraction,
        InitialMarginFraction,
        MarginFraction,
        OpenMarginFraction,
        Risk,
        AccountLeverage,
    ];

    pub const INPUTS: [Node; 6] = [UserStatus, Assets, Markets, Balances, Positions, Orders];

    pub const fn dependencies(self) -> &'static [Node] {
        match self {
            UserStatus | Assets | Markets | Balances | Positions | Orders => &[],

            RealizedPnl => &[UserStatus, Positions],
            SettledBalances => &[UserStatus, Assets, Balances, RealizedPnl],
            PosInfos => &[UserStatus, Markets, Positions, Orders],
            CumulativePnl => &[UserStatus, Markets, Positions],
            Funding => &[UserStatus, Markets, Positions],

            WeightedCollateral => &[Assets, SettledBalances],
            DepositedCollateral => &[UserStatus, Assets, Balances, RealizedPnl],
            TotalBorrows => &[UserStatus, Assets, Balances],
            BorrowNotional => &[Assets, SettledBalances],
            BorrowMaintenanceInfo => &[Assets, SettledBalances],
            BorrowInitialInfo => &[Assets, SettledBalances],
            BorrowTiedCollateral => &[Assets, SettledBalances],
            NetApy => &[UserStatus, Assets, Balances],

            AccountValue => &[WeightedCollateral, CumulativePnl, Funding],
            TrueAccountValue => &[DepositedCollateral, CumulativePnl, Funding],
            TotalPositionNotional => &[Markets, Positions, BorrowNotional],
            TotalOpenPositionNotional => &[Markets, Orders, TotalPositionNotional],
            PositionTiedCollateral => &[Markets, PosInfos],
            FreeCollateral => &[
                AccountValue,
                Funding,
                WeightedCollateral,
                BorrowTiedCollateral,
                PositionTiedCollateral,
            ],
            MaintenanceMarginFraction => &[Markets, PosInfos, BorrowMaintenanceInfo],
            InitialMarginFraction => &[Markets, PosInfos, BorrowInitialInfo],
            MarginFraction => &[AccountValue, TotalPositionNotional],
            OpenMarginFraction => &[AccountValue, WeightedCollateral, TotalOpenPositionNotional],
            Risk => &[MarginFraction, MaintenanceMarginFraction, TotalPositionNotional],
            AccountLeverage => &[AccountValue, TotalOpenPositionNotional],
        }
    }

    /// Value reported while the account is not initialized.
    pub fn neutral(self) -> Derived {
        match self {
            MarginFraction | OpenMarginFraction => Derived::Amount(Decimal::ONE),
            SettledBalances => Derived::Balances(Arc::default()),
            PosInfos => Derived::Exposure(Arc::default()),
            BorrowMaintenanceInfo | BorrowInitialInfo => Derived::Margin(MarginInfo::default()),
            _ => Derived::Amount(Decimal::ZERO),
        }
    }
}

const fn is_topological(table: &[Node]) -> bool {
    let mut i = 0;
    while i < table.len() {
        if table[i] as usize != i {
            return false;
        }
        let deps = table[i].dependencies();
        let mut j = 0;
        while j < deps.len() {
            if deps[j] as usize >= i {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(
    is_topological(&Node::ALL),
    "every node must be declared after its dependencies"
);

impl NodeSet for Node {
    const ALL: &'static [Self] = &Node::ALL;

    fn index(self) -> usize {
        self as usize
    }

    fn deps(self) -> &'static [Self] {
        self.dependencies()
    }
}

/// Value cached in a node slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    Amount(Decimal),
    Margin(MarginInfo),
    Exposure(Arc<pnl::PosInfos>),
    Balances(Arc<BalanceMap>),
}

impl Derived {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Derived::Amount(value) => Some(*value),
            _ => None,
        }
    }

    pub fn margin(&self) -> Option<MarginInfo> {
        match self {
            Derived::Margin(info) => Some(*info),
            _ => None,
        }
    }

    pub fn exposure(&self) -> Option<&Arc<pnl::PosInfos>> {
        match self {
            Derived::Exposure(infos) => Some(infos),
            _ => None,
        }
    }

    pub fn balances(&self) -> Option<&Arc<BalanceMap>> {
        match self {
            Derived::Balances(balances) => Some(balances),
            _ => None,
        }
    }
}

type Deps<'a> = Resolved<'a, Node, Derived>;

fn amount(r: &Deps<'_>, node: Node) -> Decimal {
    r.get(node).and_then(Derived::amount).unwrap_or(Decimal::ZERO)
}

fn margin_info(r: &Deps<'_>, node: Node) -> MarginInfo {
    r.get(node).and_then(Derived::margin).unwrap_or_default()
}

fn exposure(r: &Deps<'_>) -> Arc<pnl::PosInfos> {
    r.get(PosInfos)
        .and_then(Derived::exposure)
        .cloned()
        .unwrap_or_default()
}

fn settled(r: &Deps<'_>) -> Arc<BalanceMap> {
    r.get(SettledBalances)
        .and_then(Derived::balances)
        .cloned()
        .unwrap_or_default()
}

/// Computes one derived node from the snapshot and its resolved dependencies.
pub fn evaluate(node: Node, snapshot: &AccountSnapshot, config: &MathConfig, r: &Deps<'_>) -> Derived {
    if !snapshot.user_status.is_initialized() {
        return node.neutral();
    }

    let assets = &snapshot.assets;
    let markets = &snapshot.markets;

    match node {
        UserStatus | Assets | Markets | Balances | Positions | Orders => node.neutral(),

        RealizedPnl => Derived::Amount(pnl::realized_pnl(snapshot)),
        SettledBalances => Derived::Balances(Arc::new(collateral::settled_balances(
            &snapshot.balances,
            assets,
            &config.quote_symbol,
            amount(r, RealizedPnl),
        ))),
        PosInfos => Derived::Exposure(Arc::new(pnl::pos_infos(snapshot))),
        CumulativePnl => Derived::Amount(pnl::cumulative_pnl(snapshot)),
        Funding => Derived::Amount(pnl::funding(snapshot)),

        WeightedCollateral => {
            Derived::Amount(collateral::weighted_collateral(&settled(r), assets))
        }
        DepositedCollateral => Derived::Amount(collateral::deposited_collateral(
            &snapshot.balances,
            assets,
            amount(r, RealizedPnl),
        )),
        TotalBorrows => Derived::Amount(collateral::total_borrows(&snapshot.balances, assets)),
        BorrowNotional => Derived::Amount(collateral::borrow_notional(&settled(r), assets)),
        BorrowMaintenanceInfo => Derived::Margin(collateral::borrow_maintenance_margin_info(
            &settled(r),
            assets,
            &config.borrow,
        )),
        BorrowInitialInfo => Derived::Margin(collateral::borrow_initial_margin_info(
            &settled(r),
            assets,
            &config.borrow,
        )),
        BorrowTiedCollateral => Derived::Amount(collateral::borrow_tied_collateral(
            &settled(r),
            assets,
            &config.borrow,
        )),
        NetApy => Derived::Amount(collateral::net_apy(&snapshot.balances, assets)),

        AccountValue => Derived::Amount(margin::account_value(
            amount(r, WeightedCollateral),
            amount(r, CumulativePnl),
            amount(r, Funding),
        )),
        TrueAccountValue => Derived::Amount(margin::true_account_value(
            amount(r, DepositedCollateral),
            amount(r, CumulativePnl),
            amount(r, Funding),
        )),
        TotalPositionNotional => Derived::Amount(pnl::total_position_notional(
            snapshot,
            amount(r, BorrowNotional),
        )),
        TotalOpenPositionNotional => Derived::Amount(pnl::total_open_position_notional(
            snapshot,
            amount(r, TotalPositionNotional),
        )),
        PositionTiedCollateral => {
            Derived::Amount(collateral::position_tied_collateral(&exposure(r), markets))
        }
        FreeCollateral => Derived::Amount(collateral::free_collateral(
            amount(r, AccountValue),
            amount(r, Funding),
            amount(r, WeightedCollateral),
            amount(r, BorrowTiedCollateral),
            amount(r, PositionTiedCollateral),
        )),
        MaintenanceMarginFraction => Derived::Amount(margin::maintenance_margin_fraction(
            margin_info(r, BorrowMaintenanceInfo),
            &exposure(r),
            markets,
        )),
        InitialMarginFraction => Derived::Amount(margin::initial_margin_fraction(
            margin_info(r, BorrowInitialInfo),
            &exposure(r),
            markets,
        )),
        MarginFraction => Derived::Amount(margin::margin_fraction(
            amount(r, AccountValue),
            amount(r, TotalPositionNotional),
        )),
        OpenMarginFraction => Derived::Amount(margin::open_margin_fraction(
            amount(r, AccountValue),
            amount(r, WeightedCollateral),
            amount(r, TotalOpenPositionNotional),
        )),
        Risk => {
            let mmf = amount(r, MaintenanceMarginFraction);
            let has_exposure = !amount(r, TotalPositionNotional).is_zero();
            if has_exposure && mmf <= Decimal::ZERO {
                warn!(%mmf, "non-positive maintenance margin fraction with open exposure");
            }
            Derived::Amount(compute_risk(amount(r, MarginFraction), mmf))
        }
        AccountLeverage => Derived::Amount(margin::account_leverage(
            amount(r, TotalOpenPositionNotional),
            amount(r, AccountValue),
        )),
    }
}
