//! Front ends
//!
//! Operators that route deposits into the pool. A tagged depositor keeps
//! `kickback_rate` of its reward gain; the front end earns the rest on the
//! aggregate stake of every deposit tagged with it. The stake compounds with
//! the same `P` as the deposits behind it.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stabilio_common::{
    constants::{precision::DECIMAL_PRECISION, stability_pool::MAX_KICKBACK_RATE},
    errors::{PoolError, PoolResult},
    math::U256,
};

use crate::accumulator::{GlobalAccumulator, SumKind};
use crate::config::PrecisionConfig;
use crate::deposit::{apply_rate, compounded_stake, gain_from_snapshot};

/// Accumulator values captured when a front end's stake last changed
///
/// Front ends earn no collateral, so no `S` is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct FrontEndSnapshot {
    /// Running product `P`
    pub p: u128,
    /// Reward sum `G` at (epoch, scale)
    pub g: U256,
    /// Scale at snapshot time
    pub scale: u64,
    /// Epoch at snapshot time
    pub epoch: u64,
}

impl FrontEndSnapshot {
    pub fn capture(acc: &GlobalAccumulator) -> Self {
        Self {
            p: acc.product_p(),
            g: acc.current_sum_g(),
            scale: acc.current_scale(),
            epoch: acc.current_epoch(),
        }
    }
}

/// A registered front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct FrontEnd {
    /// Share of reward gains passed to tagged depositors (1e18 = 100%)
    pub kickback_rate: u128,
    /// Registration flag
    pub registered: bool,
    /// Aggregate tagged stake at the last snapshot
    pub stake: u128,
    /// Accumulator snapshot for the stake, default while the stake is zero
    pub snapshot: FrontEndSnapshot,
}

impl FrontEnd {
    /// Newly registered front end with no stake
    pub fn register(kickback_rate: u128) -> PoolResult<Self> {
        validate_kickback_rate(kickback_rate)?;
        Ok(Self {
            kickback_rate,
            registered: true,
            stake: 0,
            snapshot: FrontEndSnapshot::default(),
        })
    }

    /// Stake after all losses since the snapshot
    pub fn compounded_stake(
        &self,
        acc: &GlobalAccumulator,
        precision: &PrecisionConfig,
    ) -> PoolResult<u128> {
        compounded_stake(
            self.stake,
            self.snapshot.p,
            self.snapshot.scale,
            self.snapshot.epoch,
            acc,
            precision,
        )
    }

    /// The front end's own reward gain: its stake's gain less the kickback
    pub fn reward_gain(
        &self,
        acc: &GlobalAccumulator,
        precision: &PrecisionConfig,
    ) -> PoolResult<u128> {
        let gross = gain_from_snapshot(
            SumKind::Reward,
            self.stake,
            self.snapshot.p,
            self.snapshot.g,
            self.snapshot.scale,
            self.snapshot.epoch,
            acc,
            precision,
        )?;
        let retained = DECIMAL_PRECISION
            .checked_sub(self.kickback_rate)
            .ok_or(PoolError::Underflow)?;
        apply_rate(gross, retained)
    }

    /// Record a new stake; the snapshot is cleared when the stake reaches zero
    pub fn set_stake(&mut self, stake: u128, acc: &GlobalAccumulator) {
        self.stake = stake;
        self.snapshot = if stake == 0 {
            FrontEndSnapshot::default()
        } else {
            FrontEndSnapshot::capture(acc)
        };
    }
}

/// Reject kickback rates above 100%
pub fn validate_kickback_rate(rate: u128) -> PoolResult<()> {
    if rate > MAX_KICKBACK_RATE {
        return Err(PoolError::InvalidKickbackRate { rate, maximum: MAX_KICKBACK_RATE });
    }
    Ok(())
}
