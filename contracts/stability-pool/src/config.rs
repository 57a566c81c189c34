//! Pool configuration
//!
//! Deployment parameters of a stability pool. Configuration is validated
//! once at construction and can be exchanged with hosts as CBOR.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stabilio_common::{
    constants::{issuance, precision::DECIMAL_PRECISION, stability_pool},
    errors::{PoolError, PoolResult},
    types::{Address, Timestamp, ZERO_ADDRESS},
};

// ============ Precision ============

/// Rescaling parameters for the running product P
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PrecisionConfig {
    /// Factor P is multiplied by on a rescale
    pub scale_factor: u128,
    /// P is rescaled when its next value would fall below this
    pub rescale_threshold: u128,
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self {
            scale_factor: stability_pool::SCALE_FACTOR,
            rescale_threshold: stability_pool::RESCALE_THRESHOLD,
        }
    }
}

impl PrecisionConfig {
    /// Check the rescale parameters keep P within one unit after rescaling
    pub fn validate(&self) -> PoolResult<()> {
        if self.scale_factor < 2 {
            return Err(PoolError::InvalidConfig {
                param: "scale_factor",
                reason: "must be at least 2",
            });
        }
        if self.rescale_threshold == 0 {
            return Err(PoolError::InvalidConfig {
                param: "rescale_threshold",
                reason: "must be non-zero",
            });
        }
        let ceiling = self
            .scale_factor
            .checked_mul(self.rescale_threshold)
            .ok_or(PoolError::InvalidConfig {
                param: "scale_factor",
                reason: "scale_factor * rescale_threshold overflows",
            })?;
        if ceiling > DECIMAL_PRECISION {
            return Err(PoolError::InvalidConfig {
                param: "rescale_threshold",
                reason: "scale_factor * rescale_threshold must not exceed one unit",
            });
        }
        Ok(())
    }
}

// ============ Issuance ============

/// Community reward issuance schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct IssuanceConfig {
    /// Total rewards released as time goes to infinity
    pub supply_cap: u128,
    /// Per-minute decay factor at 18 decimals
    pub issuance_factor: u128,
    /// Issuance clock start
    pub deployment_time: Timestamp,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            supply_cap: issuance::SUPPLY_CAP,
            issuance_factor: issuance::ISSUANCE_FACTOR,
            deployment_time: 0,
        }
    }
}

impl IssuanceConfig {
    /// Default schedule starting at `deployment_time`
    pub fn starting_at(deployment_time: Timestamp) -> Self {
        Self { deployment_time, ..Self::default() }
    }

    /// A schedule that never issues anything
    pub fn disabled() -> Self {
        Self { supply_cap: 0, ..Self::default() }
    }

    pub fn validate(&self) -> PoolResult<()> {
        if self.issuance_factor == 0 || self.issuance_factor >= DECIMAL_PRECISION {
            return Err(PoolError::InvalidConfig {
                param: "issuance_factor",
                reason: "must be strictly between zero and one unit",
            });
        }
        // supply_cap * 1e18 must fit the 256-bit issuance intermediate, which any u128 does
        Ok(())
    }
}

// ============ Pool Config ============

/// Configuration for the Stability Pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PoolConfig {
    /// Only this identity may call offset
    pub liquidation_engine: Address,
    /// Product rescaling parameters
    pub precision: PrecisionConfig,
    /// Reward issuance schedule
    pub issuance: IssuanceConfig,
}

impl PoolConfig {
    /// Default parameters with the given liquidation engine
    pub fn new(liquidation_engine: Address) -> Self {
        Self {
            liquidation_engine,
            precision: PrecisionConfig::default(),
            issuance: IssuanceConfig::default(),
        }
    }

    /// Replace the issuance schedule
    pub fn with_issuance(mut self, issuance: IssuanceConfig) -> Self {
        self.issuance = issuance;
        self
    }

    /// Replace the rescaling parameters
    pub fn with_precision(mut self, precision: PrecisionConfig) -> Self {
        self.precision = precision;
        self
    }

    /// Validate all parameters
    pub fn validate(&self) -> PoolResult<()> {
        if self.liquidation_engine == ZERO_ADDRESS {
            return Err(PoolError::InvalidConfig {
                param: "liquidation_engine",
                reason: "must not be the zero address",
            });
        }
        self.precision.validate()?;
        self.issuance.validate()
    }

    /// Decode and validate a CBOR-encoded configuration
    pub fn from_cbor(bytes: &[u8]) -> PoolResult<Self> {
        let config: Self = ciborium::de::from_reader(bytes).map_err(|e| {
            log::warn!("rejecting pool config: {e}");
            PoolError::MalformedConfig
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Encode as CBOR
    pub fn to_cbor(&self) -> PoolResult<Vec<u8>> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(self, &mut out).map_err(|_| PoolError::MalformedConfig)?;
        Ok(out)
    }
}
