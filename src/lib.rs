// xmargin-core: cross-margin risk math for one account holding borrow-lending balances and perps.
// a fixed graph of pure, memoized computations over an immutable snapshot.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Symbol, Side, Bps, Timestamp, decimal helpers
//   2.x  market.rs: perp market prices, imf/mmf, funding index
//   3.x  snapshot.rs: assets, balances, user status, state provider, snapshot validation
//   4.x  position.rs: positions and resting orders, pnl, pending funding
//   5.x  pnl.rs: per-market exposure, cumulative pnl, funding, notionals
//   6.x  collateral.rs: weighted/deposited/tied collateral, borrow margin, withdrawals
//   6.1  margin.rs: account value, margin fractions, leverage
//   6.2  risk.rs: risk score and what-if impacts
//   6.3  liquidation.rs: cross-margin liquidation price
//   7.x  config.rs: fees, nerf factor, borrow factors, env presets
//   8.x  capacity.rs: max contracts and max collateral spend
//   8.5  rates.rs: utilization kink model for APYs
//   9.x  graph.rs + engine/: memo evaluator, node table, AccountMath queries

// data model
pub mod market;
pub mod position;
pub mod snapshot;
pub mod types;

// valuation layers
pub mod collateral;
pub mod liquidation;
pub mod margin;
pub mod pnl;
pub mod risk;

// trade sizing and rates
pub mod capacity;
pub mod rates;

// derivation
pub mod config;
pub mod engine;
pub mod graph;

// re exports for convenience
pub use capacity::TradeIntent;
pub use collateral::MarginInfo;
pub use config::{BorrowParams, ConfigError, Environment, FeeConfig, MathConfig};
pub use engine::*;
pub use graph::{Memo, NodeSet, QueryCache};
pub use liquidation::LiquidationPrice;
pub use margin::MarginStatus;
pub use market::*;
pub use pnl::{PosInfo, PosInfos};
pub use position::*;
pub use rates::RateModel;
pub use risk::{compute_risk, RiskInputs, MAX_RISK};
pub use snapshot::*;
pub use types::*;
