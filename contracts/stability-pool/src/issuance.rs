//! Community Issuance
//!
//! Time-based reward source feeding the `G` accumulator. The cumulative
//! amount issued by time `t` follows
//!
//! `supply_cap * (1 - issuance_factor ^ minutes_since_deployment)`
//!
//! which with the default factor releases half the cap in the first year,
//! half of the remainder in the second, and so on.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stabilio_common::{
    constants::{issuance::SECONDS_IN_ONE_MINUTE, precision::DECIMAL_PRECISION},
    errors::{PoolError, PoolResult},
    math::{dec_pow, mul_div},
    types::Timestamp,
};

use crate::config::IssuanceConfig;

/// Issuance state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CommunityIssuance {
    /// Rewards issued so far
    pub total_issued: u128,
}

impl CommunityIssuance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue everything due up to `now`, returning the newly issued amount
    ///
    /// Timestamps earlier than a previous call issue nothing.
    pub fn issue(&mut self, config: &IssuanceConfig, now: Timestamp) -> PoolResult<u128> {
        let latest_total = cumulative_issued(config, now)?;
        let issuance = latest_total.saturating_sub(self.total_issued);
        if issuance > 0 {
            self.total_issued = latest_total;
        }
        Ok(issuance)
    }
}

/// Fraction of the supply cap due by `now`, scaled by 1e18
pub fn cumulative_issuance_fraction(config: &IssuanceConfig, now: Timestamp) -> PoolResult<u128> {
    let minutes = now.saturating_sub(config.deployment_time) / SECONDS_IN_ONE_MINUTE;
    let remaining = dec_pow(config.issuance_factor, minutes)?;
    DECIMAL_PRECISION.checked_sub(remaining).ok_or(PoolError::Underflow)
}

/// Cumulative rewards due by `now`
pub fn cumulative_issued(config: &IssuanceConfig, now: Timestamp) -> PoolResult<u128> {
    let fraction = cumulative_issuance_fraction(config, now)?;
    mul_div(config.supply_cap, fraction, DECIMAL_PRECISION)
}
