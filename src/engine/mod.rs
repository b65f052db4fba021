// 9.0: the account derivation graph. a fixed node table over one snapshot,
// memoized and resolved eagerly on every update. parameterized reads are cached per generation.

mod core;
mod nodes;
mod queries;
mod results;

pub use core::AccountMath;
pub use nodes::{Derived, Node};
pub use results::{PositionReport, RiskReport, SwapIntent};
