// 5.0 pnl.rs: position-side valuation. pnl, funding, notional, per-market exposure.
// every function here assumes an initialized account, the graph handles the neutral case.
// a position or order whose market is missing from the snapshot contributes nothing.

use crate::position::Position;
use crate::snapshot::{AccountSnapshot, MarketMap};
use crate::types::{Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open exposure in one market: position plus resting orders per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosInfo {
    pub long: Decimal,
    pub short: Decimal,
    /// Position coins only, orders never move it
    pub pos_size: Decimal,
}

impl PosInfo {
    /// Largest one-sided exposure.
    pub fn open_size(&self) -> Decimal {
        self.long.max(self.short)
    }

    pub fn side_size(&self, side: Side) -> Decimal {
        match side {
            Side::Long => self.long,
            Side::Short => self.short,
        }
    }

    fn add(&mut self, side: Side, coins: Decimal) {
        match side {
            Side::Long => self.long += coins,
            Side::Short => self.short += coins,
        }
    }
}

pub type PosInfos = BTreeMap<Symbol, PosInfo>;

// 5.1: one entry per snapshot market, zero when nothing is open there
pub fn pos_infos(snapshot: &AccountSnapshot) -> PosInfos {
    let mut infos: PosInfos = snapshot
        .markets
        .keys()
        .map(|k| (k.clone(), PosInfo::default()))
        .collect();

    for position in snapshot.positions.iter() {
        if let Some(info) = infos.get_mut(&position.market) {
            info.pos_size = position.coins;
            info.add(position.side, position.coins);
        }
    }

    for order in snapshot.orders.iter() {
        if let Some(info) = infos.get_mut(&order.market) {
            info.add(order.side, order.coins);
        }
    }

    infos
}

pub fn position_pnl(markets: &MarketMap, position: &Position) -> Decimal {
    markets
        .get(&position.market)
        .map(|m| position.unrealized_pnl(m))
        .unwrap_or(Decimal::ZERO)
}

pub fn cumulative_pnl(snapshot: &AccountSnapshot) -> Decimal {
    snapshot
        .positions
        .iter()
        .map(|p| position_pnl(&snapshot.markets, p))
        .sum()
}

pub fn realized_pnl(snapshot: &AccountSnapshot) -> Decimal {
    snapshot.positions.iter().map(|p| p.realized_pnl).sum()
}

// 5.2: unsettled funding across positions. positive = owed to the account
pub fn funding(snapshot: &AccountSnapshot) -> Decimal {
    snapshot
        .positions
        .iter()
        .filter_map(|p| snapshot.markets.get(&p.market).map(|m| p.pending_funding(m)))
        .sum()
}

// 5.3: perp notional plus the borrow legs
pub fn total_position_notional(snapshot: &AccountSnapshot, borrow_notional: Decimal) -> Decimal {
    let perp: Decimal = snapshot
        .positions
        .iter()
        .filter_map(|p| snapshot.markets.get(&p.market).map(|m| p.notional_value(m)))
        .sum();
    perp + borrow_notional
}

pub fn total_open_position_notional(
    snapshot: &AccountSnapshot,
    total_position_notional: Decimal,
) -> Decimal {
    let resting: Decimal = snapshot
        .orders
        .iter()
        .filter_map(|o| snapshot.markets.get(&o.market).map(|m| o.notional_value(m)))
        .sum();
    resting + total_position_notional
}

pub fn open_positions(snapshot: &AccountSnapshot) -> Vec<&Position> {
    snapshot.positions.iter().filter(|p| !p.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use crate::position::Order;
    use crate::snapshot::{Asset, UserStatus};
    use rust_decimal_macros::dec;

    fn snapshot(positions: Vec<Position>, orders: Vec<Order>) -> AccountSnapshot {
        let markets = [
            Market::new("SOL-PERP", dec!(100), dec!(100), dec!(0.1), dec!(5)),
            Market::new("BTC-PERP", dec!(20000), dec!(20000), dec!(0.05), dec!(0)),
        ]
        .into_iter()
        .map(|m| (m.symbol.clone(), m))
        .collect();
        let assets = [Asset::new("USDC", dec!(1), dec!(1))]
            .into_iter()
            .map(|a| (a.symbol.clone(), a))
            .collect();
        AccountSnapshot::new(
            UserStatus::Initialized,
            assets,
            markets,
            BTreeMap::new(),
            positions,
            orders,
        )
        .unwrap()
    }

    #[test]
    fn pos_infos_cover_every_market() {
        let s = snapshot(vec![], vec![]);
        let infos = pos_infos(&s);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[&Symbol::from("BTC-PERP")], PosInfo::default());
    }

    #[test]
    fn orders_widen_sides_but_not_pos_size() {
        let s = snapshot(
            vec![Position::new("SOL-PERP", Side::Long, dec!(3), dec!(300), dec!(5))],
            vec![
                Order::new("SOL-PERP", Side::Long, dec!(1)),
                Order::new("SOL-PERP", Side::Short, dec!(5)),
            ],
        );
        let info = pos_infos(&s)[&Symbol::from("SOL-PERP")];
        assert_eq!(info.long, dec!(4));
        assert_eq!(info.short, dec!(5));
        assert_eq!(info.pos_size, dec!(3));
        assert_eq!(info.open_size(), dec!(5));
    }

    #[test]
    fn cumulative_and_realized() {
        let s = snapshot(
            vec![
                Position::new("SOL-PERP", Side::Long, dec!(10), dec!(900), dec!(5))
                    .with_realized_pnl(dec!(12)),
                Position::new("BTC-PERP", Side::Short, dec!(1), dec!(21000), dec!(0))
                    .with_realized_pnl(dec!(-2)),
            ],
            vec![],
        );
        // long: 1000 - 900 = 100. short: -(20000 - 21000) = 1000
        assert_eq!(cumulative_pnl(&s), dec!(1100));
        assert_eq!(realized_pnl(&s), dec!(10));
    }

    #[test]
    fn funding_sums_both_sides() {
        let s = snapshot(
            vec![
                Position::new("SOL-PERP", Side::Long, dec!(2), dec!(200), dec!(3)),
                Position::new("BTC-PERP", Side::Short, dec!(1), dec!(20000), dec!(-1)),
            ],
            vec![],
        );
        // long pays 2 * (5 - 3) = 4, short receives 1 * (0 - -1) = 1
        assert_eq!(funding(&s), dec!(-3));
    }

    #[test]
    fn notionals_include_borrows_and_orders() {
        let s = snapshot(
            vec![Position::new("SOL-PERP", Side::Short, dec!(2), dec!(200), dec!(5))],
            vec![Order::new("BTC-PERP", Side::Long, dec!(0.01))],
        );
        let total = total_position_notional(&s, dec!(50));
        assert_eq!(total, dec!(250));
        assert_eq!(total_open_position_notional(&s, total), dec!(450));
    }

    #[test]
    fn open_positions_skip_empty() {
        let s = snapshot(
            vec![
                Position::new("SOL-PERP", Side::Long, dec!(0), dec!(0), dec!(5)),
                Position::new("BTC-PERP", Side::Long, dec!(1), dec!(20000), dec!(0)),
            ],
            vec![],
        );
        let open = open_positions(&s);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].market, Symbol::from("BTC-PERP"));
    }
}
