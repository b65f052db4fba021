// 7.0 config.rs: every tunable in one place. fees, safety nerf, borrow margin factors.
// 7.1 FeeConfig has maker/taker fees only. the derivation never charges them, it just sizes around them.

use crate::types::{Bps, Symbol};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/** 7.2: fee settings. maker/taker in bps. 100 bps = 1% */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    // Maker fee in basis points (negative = rebate)
    pub maker_fee_bps: i32,
    // Taker fee in basis points
    pub taker_fee_bps: u32,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            maker_fee_bps: 2,  // 0.02%
            taker_fee_bps: 10, // 0.1%
        }
    }
}

impl FeeConfig {
    pub fn fee_fraction(&self, post_only: bool) -> Decimal {
        if post_only {
            Bps::new(self.maker_fee_bps).as_fraction()
        } else {
            Bps::new(self.taker_fee_bps as i32).as_fraction()
        }
    }
}

// 7.3: margin multipliers applied to borrowed assets. factor = C / weight - 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowParams {
    pub maintenance_factor: Decimal,
    pub initial_factor: Decimal,
}

impl Default for BorrowParams {
    fn default() -> Self {
        Self {
            maintenance_factor: dec!(1.03),
            initial_factor: dec!(1.10),
        }
    }
}

impl BorrowParams {
    pub fn maintenance_weighting(&self, weight: Decimal) -> Decimal {
        borrow_factor(self.maintenance_factor, weight)
    }

    pub fn initial_weighting(&self, weight: Decimal) -> Decimal {
        borrow_factor(self.initial_factor, weight)
    }
}

// C / weight - 1. a zero weight never reaches here from a validated snapshot, treat it as no extra margin
fn borrow_factor(c: Decimal, weight: Decimal) -> Decimal {
    if weight.is_zero() {
        return Decimal::ZERO;
    }
    c / weight - Decimal::ONE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathConfig {
    // Asset that absorbs realized pnl (e.g. "USDC")
    pub quote_symbol: Symbol,
    // Empirical shrink applied to withdrawal and purchase limits
    pub nerf_factor: Decimal,
    pub fees: FeeConfig,
    pub borrow: BorrowParams,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            quote_symbol: Symbol::from("USDC"),
            nerf_factor: dec!(0.01),
            fees: FeeConfig::default(),
            borrow: BorrowParams::default(),
        }
    }
}

impl MathConfig {
    // Testnet: free makers, lighter nerf
    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.fees.maker_fee_bps = 0;
        config.fees.taker_fee_bps = 5;
        config.nerf_factor = dec!(0.005);
        config
    }

    // Mainnet: wider safety margin on limits
    pub fn mainnet_conservative() -> Self {
        let mut config = Self::default();
        config.nerf_factor = dec!(0.02);
        config
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nerf_factor < Decimal::ZERO || self.nerf_factor >= Decimal::ONE {
            return Err(ConfigError::InvalidNerf(self.nerf_factor));
        }

        if self.fees.taker_fee_bps > 100 {
            return Err(ConfigError::InvalidFees {
                reason: "Taker fee too high (>1%)".to_string(),
            });
        }
        if self.fees.maker_fee_bps > 100 || self.fees.maker_fee_bps < -100 {
            return Err(ConfigError::InvalidFees {
                reason: "Maker fee outside +-1%".to_string(),
            });
        }

        // C >= 1 keeps every borrow factor non-negative for weights in (0, 1]
        let borrow = &self.borrow;
        if borrow.maintenance_factor < Decimal::ONE {
            return Err(ConfigError::InvalidBorrow {
                reason: "Maintenance factor below 1".to_string(),
            });
        }
        if borrow.initial_factor < borrow.maintenance_factor {
            return Err(ConfigError::InvalidBorrow {
                reason: "Initial factor below maintenance factor".to_string(),
            });
        }

        if self.quote_symbol.as_str().is_empty() {
            return Err(ConfigError::MissingQuoteSymbol);
        }

        Ok(())
    }

    /// `1 - fee - nerf`, the share of a purchase limit actually usable.
    pub fn fee_multiplier(&self, post_only: bool) -> Decimal {
        Decimal::ONE - self.fees.fee_fraction(post_only) - self.nerf_factor
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Nerf factor {0} must be in [0, 1)")]
    InvalidNerf(Decimal),

    #[error("Invalid fees: {reason}")]
    InvalidFees { reason: String },

    #[error("Invalid borrow params: {reason}")]
    InvalidBorrow { reason: String },

    #[error("Quote symbol must not be empty")]
    MissingQuoteSymbol,

    #[error("Could not parse config: {0}")]
    Parse(String),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> MathConfig {
        match self {
            Environment::Development => MathConfig::default(),
            Environment::Testnet => MathConfig::testnet(),
            Environment::Mainnet => MathConfig::mainnet_conservative(),
        }
    }
}
