//! Cross-margin risk walkthrough.
//!
//! Builds a handful of account snapshots, installs them into one
//! `AccountMath`, and prints the derived metrics after each step. Pass
//! `--json` to print the full report of every step as JSON.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::error::Error;
use xmargin_core::*;

type SimResult = Result<(), Box<dyn Error>>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let json = std::env::args().any(|a| a == "--json");
    let config = match std::env::var("XMARGIN_ENV").as_deref() {
        Ok("testnet") => Environment::Testnet.config(),
        Ok("mainnet") => Environment::Mainnet.config(),
        _ => Environment::Development.config(),
    };

    println!("Cross-Margin Risk Simulation");
    println!("One account, borrow-lending plus perps\n");

    let scenarios: [(&str, fn(&MathConfig, bool) -> SimResult); 5] = [
        ("Scenario 1: Fresh Account", scenario_1_fresh_account),
        ("Scenario 2: Collateral Only", scenario_2_collateral_only),
        ("Scenario 3: Leveraged Long", scenario_3_leveraged_long),
        ("Scenario 4: Borrowing Against Collateral", scenario_4_borrowing),
        ("Scenario 5: Price Move and Incremental Recompute", scenario_5_price_move),
    ];

    for (title, run) in scenarios {
        println!("{title}\n");
        if let Err(e) = run(&config, json) {
            eprintln!("  failed: {e}");
            std::process::exit(1);
        }
        println!();
    }

    println!("All simulations completed successfully.");
}

fn sol_perp(mark: Decimal) -> Market {
    Market::new("SOL-PERP", mark, mark, dec!(0.1), dec!(0))
}

fn assets() -> Vec<Asset> {
    let rates = RateModel::default();
    vec![
        rates.price_asset(Asset::new("USDC", dec!(1), dec!(1)), dec!(1_000_000), dec!(400_000)),
        rates.price_asset(Asset::new("SOL", dec!(20), dec!(0.8)), dec!(50_000), dec!(45_000)),
    ]
}

fn print_summary(math: &AccountMath, json: bool) -> SimResult {
    let report = math.report();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("  Account value:       ${}", report.account_value.round_dp(4));
    println!("  Weighted collateral: ${}", report.weighted_collateral.round_dp(4));
    println!("  Free collateral:     ${}", report.free_collateral.round_dp(4));
    println!("  Position notional:   ${}", report.total_position_notional.round_dp(4));
    println!("  Margin fraction:     {}", report.margin_fraction.round_dp(6));
    println!("  MMF / IMF:           {} / {}", report.maintenance_margin_fraction.round_dp(6), report.initial_margin_fraction.round_dp(6));
    println!("  Risk:                {:.4} ({:?})", report.risk.to_display_number(), report.margin_status);
    for position in &report.positions {
        println!(
            "  {} {:?} {}: pnl ${}, liquidation {:.4} ({} buffer)",
            position.market,
            position.side,
            position.coins,
            position.pnl.round_dp(4),
            position.liquidation_price.to_display_number(),
            position
                .liquidation_buffer
                .map(|b| format!("{:.2}%", (b * dec!(100)).to_display_number()))
                .unwrap_or_else(|| "no".to_string()),
        );
    }
    Ok(())
}

/// No account yet: every metric is neutral.
fn scenario_1_fresh_account(config: &MathConfig, json: bool) -> SimResult {
    let math = AccountMath::new(config.clone())?;
    println!("  Uninitialized account, nothing deposited");
    print_summary(&math, json)
}

/// Deposits only, margin fraction pinned at 1.
fn scenario_2_collateral_only(config: &MathConfig, json: bool) -> SimResult {
    let state = StaticState {
        initialized: true,
        assets: assets(),
        markets: vec![sol_perp(dec!(100))],
        balances: vec![(Symbol::from("USDC"), dec!(1000))],
        ..Default::default()
    };
    let math = AccountMath::with_snapshot(config.clone(), AccountSnapshot::capture(&state)?)?;
    println!("  Deposit 1000 USDC");
    print_summary(&math, json)?;
    println!("  Net APY: {}%", math.net_apy().round_dp(4));
    Ok(())
}

/// 10 SOL-PERP long on 400 USDC, then every what-if.
fn scenario_3_leveraged_long(config: &MathConfig, json: bool) -> SimResult {
    let state = StaticState {
        initialized: true,
        assets: assets(),
        markets: vec![sol_perp(dec!(100))],
        balances: vec![(Symbol::from("USDC"), dec!(400))],
        positions: vec![Position::new("SOL-PERP", Side::Long, dec!(10), dec!(900), dec!(0))],
        orders: vec![],
    };
    let math = AccountMath::with_snapshot(config.clone(), AccountSnapshot::capture(&state)?)?;
    println!("  Long 10 SOL-PERP @ 90, mark 100, 400 USDC");
    print_summary(&math, json)?;

    let usdc = Symbol::from("USDC");
    println!("\n  Withdrawable USDC:             {}", math.collateral_withdrawable(&usdc).round_dp(4));
    println!("  Withdrawable USDC with borrow: {}", math.collateral_withdrawable_with_borrow(&usdc).round_dp(4));
    println!("  Withdraw 100 USDC risk impact: {:+.4}", math.risk_withdraw_asset_impact(&usdc, dec!(100)).to_display_number());
    println!("  Deposit 100 USDC risk impact:  {:+.4}", math.risk_deposit_asset_impact(&usdc, dec!(100)).to_display_number());

    let swap = SwapIntent::new("USDC", dec!(100), "SOL", dec!(5));
    println!("  Swap 100 USDC to 5 SOL impact: {:+.4}", math.risk_swap_assets_impact(&swap).to_display_number());

    for side in [Side::Long, Side::Short] {
        let intent = TradeIntent::new("SOL-PERP", side, dec!(10), dec!(100));
        println!(
            "  {:?} 10 more: impact {:+.4}, max {} contracts, max spend ${}",
            side,
            math.risk_perp_impact(&intent).to_display_number(),
            math.max_contracts_purchaseable(&intent).round_dp(4),
            math.max_collateral_spendable(&intent).round_dp(4),
        );
    }
    Ok(())
}

/// USDC deposit backing a SOL borrow.
fn scenario_4_borrowing(config: &MathConfig, json: bool) -> SimResult {
    let state = StaticState {
        initialized: true,
        assets: assets(),
        markets: vec![sol_perp(dec!(100))],
        balances: vec![(Symbol::from("USDC"), dec!(2000)), (Symbol::from("SOL"), dec!(-10))],
        ..Default::default()
    };
    let math = AccountMath::with_snapshot(config.clone(), AccountSnapshot::capture(&state)?)?;
    println!("  2000 USDC deposited, 10 SOL borrowed");
    print_summary(&math, json)?;
    println!("  Total borrows:  ${}", math.total_borrows().round_dp(4));
    println!("  Borrow tied:    ${}", math.borrow_tied_collateral().round_dp(4));
    for (asset, notional) in math.borrows_breakdown() {
        println!("  Borrowed {asset}: ${}", notional.round_dp(4));
    }
    Ok(())
}

/// Only the markets change; collateral nodes stay cached.
fn scenario_5_price_move(config: &MathConfig, json: bool) -> SimResult {
    let state = StaticState {
        initialized: true,
        assets: assets(),
        markets: vec![sol_perp(dec!(100))],
        balances: vec![(Symbol::from("USDC"), dec!(400))],
        positions: vec![Position::new("SOL-PERP", Side::Long, dec!(10), dec!(900), dec!(0))],
        orders: vec![Order::new("SOL-PERP", Side::Long, dec!(2))],
    };
    let mut math = AccountMath::with_snapshot(config.clone(), AccountSnapshot::capture(&state)?)?;

    let base = sol_perp(dec!(100));
    for mark in [dec!(90), dec!(75), dec!(60)] {
        let market = base.with_mark_price(mark);
        let next = math
            .snapshot()
            .with_markets(MarketMap::from([(market.symbol.clone(), market)]))?;
        let recomputed = math.update(next);
        println!("  Mark {mark}: {recomputed} nodes recomputed");
        print_summary(&math, json)?;
        println!();
    }

    println!(
        "  Weighted collateral computed {} time(s), risk computed {} time(s)",
        math.evaluations(Node::WeightedCollateral),
        math.evaluations(Node::Risk),
    );
    Ok(())
}
