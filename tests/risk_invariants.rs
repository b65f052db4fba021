//! Property-based tests for the risk and margin math.
//!
//! Random inputs against the bounds and orderings the risk math must keep.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use xmargin_core::liquidation::liquidation_price;
use xmargin_core::margin::margin_fraction;
use xmargin_core::*;

// Strategies for generating test data
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)) // $0.01 to $10,000
}

fn coins_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|x| Decimal::new(x, 3)) // 0.001 to 100
}

fn margin_fraction_strategy() -> impl Strategy<Value = Decimal> {
    (-20_000i64..50_000i64).prop_map(|x| Decimal::new(x, 4)) // -2 to 5
}

fn mmf_strategy() -> impl Strategy<Value = Decimal> {
    // borrows of low-weight assets push mmf past 1
    (1i64..50_000i64).prop_map(|x| Decimal::new(x, 4)) // (0, 5)
}

fn imf_strategy() -> impl Strategy<Value = Decimal> {
    (10i64..=500i64).prop_map(|x| Decimal::new(x, 3)) // 1% to 50%
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Long), Just(Side::Short)]
}

fn account(usdc: Decimal, coins: Decimal, side: Side, mark: Decimal) -> AccountMath {
    let state = StaticState {
        initialized: true,
        assets: vec![Asset::new("USDC", dec!(1), dec!(1))],
        markets: vec![Market::new("SOL-PERP", mark, mark, dec!(0.1), dec!(0))],
        balances: vec![(Symbol::from("USDC"), usdc)],
        positions: vec![Position::new("SOL-PERP", side, coins, coins * mark, dec!(0))],
        orders: vec![],
    };
    let snapshot = AccountSnapshot::capture(&state).unwrap();
    AccountMath::with_snapshot(MathConfig::default(), snapshot).unwrap()
}

proptest! {
    /// Risk stays in [0, 100] for any margin fraction and mmf
    #[test]
    fn risk_is_bounded(
        mf in margin_fraction_strategy(),
        mmf in (-5_000i64..50_000i64).prop_map(|x| Decimal::new(x, 4)),
    ) {
        let risk = compute_risk(mf, mmf);
        prop_assert!(risk >= Decimal::ZERO, "risk {} below 0", risk);
        prop_assert!(risk <= MAX_RISK, "risk {} above 100", risk);
    }

    /// Falling margin fraction never lowers the score
    #[test]
    fn risk_monotonic_in_margin_fraction(
        mf in (1i64..40_000i64).prop_map(|x| Decimal::new(x, 4)),
        drop in (100i64..10_000i64).prop_map(|x| Decimal::new(x, 4)),
        mmf in mmf_strategy(),
    ) {
        let lower = (mf - drop).max(Decimal::ZERO);
        prop_assert!(compute_risk(lower, mmf) >= compute_risk(mf, mmf));
    }

    /// Rising maintenance fraction never lowers the score
    #[test]
    fn risk_monotonic_in_mmf(
        mf in margin_fraction_strategy(),
        mmf in mmf_strategy(),
        rise in (1i64..30_000i64).prop_map(|x| Decimal::new(x, 4)),
    ) {
        prop_assert!(compute_risk(mf, mmf + rise) >= compute_risk(mf, mmf));
    }

    /// At or past maintenance the score is full
    #[test]
    fn risk_full_at_maintenance(mf in margin_fraction_strategy(), mmf in mmf_strategy()) {
        if mf <= mmf {
            prop_assert_eq!(compute_risk(mf, mmf), MAX_RISK);
        }
    }

    /// Margin fraction is exactly 1 without exposure, below that it falls with notional
    #[test]
    fn margin_fraction_one_without_exposure(
        value in (1i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)),
        notional in price_strategy(),
        extra in price_strategy(),
    ) {
        prop_assert_eq!(margin_fraction(value, Decimal::ZERO), Decimal::ONE);
        prop_assert!(margin_fraction(value, notional + extra) < margin_fraction(value, notional));
    }

    /// Liquidation price is positive or unreachable
    #[test]
    fn liquidation_price_never_negative(
        coins in coins_strategy(),
        mark in price_strategy(),
        side in side_strategy(),
        base_imf in imf_strategy(),
        mf in margin_fraction_strategy(),
        mmf in mmf_strategy(),
        notional in price_strategy(),
    ) {
        let market = Market::new("SOL-PERP", mark, mark, base_imf, dec!(0));
        let position = Position::new("SOL-PERP", side, coins, coins * mark, dec!(0));
        match liquidation_price(&position, &market, mf, mmf, notional) {
            LiquidationPrice::Price(price) => prop_assert!(price > Decimal::ZERO),
            LiquidationPrice::Unreachable => {}
        }
    }

    /// Account graph: no perp exposure and no borrows pins mf at 1 and risk at 0
    #[test]
    fn collateral_only_account_is_riskless(
        usdc in (0i64..10_000_000i64).prop_map(|x| Decimal::new(x, 2)),
    ) {
        let state = StaticState {
            initialized: true,
            assets: vec![Asset::new("USDC", dec!(1), dec!(1))],
            balances: vec![(Symbol::from("USDC"), usdc)],
            ..Default::default()
        };
        let math = AccountMath::with_snapshot(
            MathConfig::default(),
            AccountSnapshot::capture(&state).unwrap(),
        ).unwrap();
        prop_assert_eq!(math.margin_fraction(), Decimal::ONE);
        prop_assert_eq!(math.risk(), Decimal::ZERO);
        prop_assert_eq!(math.account_value(), usdc);
    }

    /// What-if queries never change what the graph reports
    #[test]
    fn impacts_are_pure(
        usdc in (100i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)),
        coins in coins_strategy(),
        side in side_strategy(),
        mark in (100i64..100_000i64).prop_map(|x| Decimal::new(x, 2)),
        share in 1i64..=300i64,
    ) {
        // up to three times the balance, past it the remainder is borrowed
        let amount = usdc * Decimal::new(share, 2);
        let math = account(usdc, coins, side, mark);
        let before = math.report();

        let usdc_symbol = Symbol::from("USDC");
        let withdraw = math.risk_withdraw_asset_impact(&usdc_symbol, amount);
        let deposit = math.risk_deposit_asset_impact(&usdc_symbol, amount);
        let trade = TradeIntent::new("SOL-PERP", side, coins, mark);
        math.risk_perp_impact(&trade);

        prop_assert_eq!(math.report(), before);
        // depositing quote can only help, withdrawing can only hurt
        prop_assert!(deposit <= Decimal::ZERO);
        prop_assert!(withdraw >= Decimal::ZERO);
    }

    /// Withdrawing more never reports a smaller impact, borrowed or not
    #[test]
    fn withdraw_impact_grows_with_amount(
        usdc in (100i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)),
        coins in coins_strategy(),
        side in side_strategy(),
        mark in (100i64..100_000i64).prop_map(|x| Decimal::new(x, 2)),
        share in 1i64..=300i64,
        extra in 1i64..=300i64,
    ) {
        let math = account(usdc, coins, side, mark);
        let usdc_symbol = Symbol::from("USDC");
        let smaller = usdc * Decimal::new(share, 2);
        let larger = smaller + usdc * Decimal::new(extra, 2);
        let small = math.risk_withdraw_asset_impact(&usdc_symbol, smaller);
        let large = math.risk_withdraw_asset_impact(&usdc_symbol, larger);
        prop_assert!(large >= small, "{} < {}", large, small);
    }

    /// Growing the position more never reports a smaller impact
    #[test]
    fn trade_impact_grows_with_coins(
        usdc in (100i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)),
        coins in coins_strategy(),
        side in side_strategy(),
        mark in (100i64..100_000i64).prop_map(|x| Decimal::new(x, 2)),
        trade in coins_strategy(),
        extra in coins_strategy(),
    ) {
        let math = account(usdc, coins, side, mark);
        let small = math.risk_perp_impact(&TradeIntent::new("SOL-PERP", side, trade, mark));
        let large = math.risk_perp_impact(&TradeIntent::new("SOL-PERP", side, trade + extra, mark));
        prop_assert!(large >= small, "{} < {}", large, small);
    }

    /// Capacity is never negative
    #[test]
    fn capacity_non_negative(
        usdc in (0i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)),
        coins in coins_strategy(),
        side in side_strategy(),
        mark in (100i64..100_000i64).prop_map(|x| Decimal::new(x, 2)),
        post_only in any::<bool>(),
    ) {
        let math = account(usdc, coins, side, mark);
        let mut intent = TradeIntent::new("SOL-PERP", side.opposite(), dec!(1), mark);
        intent.post_only = post_only;
        prop_assert!(math.max_contracts_purchaseable(&intent) >= Decimal::ZERO);
        prop_assert!(math.max_collateral_spendable(&intent) >= Decimal::ZERO);
    }
}
