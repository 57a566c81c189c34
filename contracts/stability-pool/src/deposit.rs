//! Depositor positions and lazy compounding
//!
//! A deposit is stored as its value at the last interaction plus a snapshot
//! of the accumulator. The current balance and pending gains are derived on
//! demand from that snapshot and the live accumulator; nothing is updated
//! per depositor when a liquidation happens.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stabilio_common::{
    constants::precision::DECIMAL_PRECISION,
    errors::{PoolError, PoolResult},
    math::{add_wide, decimal_precision, div_wide, mul_div, mul_wide, narrow, sub_wide, wide, U256},
    types::Address,
};

use crate::accumulator::{GlobalAccumulator, SumKind};
use crate::config::PrecisionConfig;

// ============ Snapshots ============

/// Accumulator values captured at a depositor's last interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DepositSnapshot {
    /// Running product `P`
    pub p: u128,
    /// Collateral sum `S` at (epoch, scale)
    pub s: U256,
    /// Reward sum `G` at (epoch, scale)
    pub g: U256,
    /// Scale at snapshot time
    pub scale: u64,
    /// Epoch at snapshot time
    pub epoch: u64,
}

impl DepositSnapshot {
    /// Snapshot of the live accumulator
    pub fn capture(acc: &GlobalAccumulator) -> Self {
        Self {
            p: acc.product_p(),
            s: acc.current_sum_s(),
            g: acc.current_sum_g(),
            scale: acc.current_scale(),
            epoch: acc.current_epoch(),
        }
    }
}

/// A depositor's position in the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DepositorRecord {
    /// Owner of the deposit
    pub depositor: Address,
    /// Deposit value when the snapshot was taken
    pub initial_value: u128,
    /// Front end the deposit was made through, fixed while non-zero
    pub front_end: Option<Address>,
    /// Accumulator snapshot at the last interaction
    pub snapshot: DepositSnapshot,
}

impl DepositorRecord {
    /// Record with a fresh snapshot of the live accumulator
    pub fn new(
        depositor: Address,
        initial_value: u128,
        front_end: Option<Address>,
        acc: &GlobalAccumulator,
    ) -> Self {
        Self {
            depositor,
            initial_value,
            front_end,
            snapshot: DepositSnapshot::capture(acc),
        }
    }

    /// Current deposit after all losses since the snapshot
    pub fn compounded_value(
        &self,
        acc: &GlobalAccumulator,
        precision: &PrecisionConfig,
    ) -> PoolResult<u128> {
        compounded_stake(
            self.initial_value,
            self.snapshot.p,
            self.snapshot.scale,
            self.snapshot.epoch,
            acc,
            precision,
        )
    }

    /// Collateral earned since the snapshot
    pub fn collateral_gain(
        &self,
        acc: &GlobalAccumulator,
        precision: &PrecisionConfig,
    ) -> PoolResult<u128> {
        gain_from_snapshot(
            SumKind::Collateral,
            self.initial_value,
            self.snapshot.p,
            self.snapshot.s,
            self.snapshot.scale,
            self.snapshot.epoch,
            acc,
            precision,
        )
    }

    /// Total reward earned since the snapshot, before any front-end split
    pub fn reward_gain(
        &self,
        acc: &GlobalAccumulator,
        precision: &PrecisionConfig,
    ) -> PoolResult<u128> {
        gain_from_snapshot(
            SumKind::Reward,
            self.initial_value,
            self.snapshot.p,
            self.snapshot.g,
            self.snapshot.scale,
            self.snapshot.epoch,
            acc,
            precision,
        )
    }
}

// ============ Compounding ============

/// Compound a stake from its snapshot `P`, scale and epoch to the live `P`
///
/// - earlier epoch: the pool has been emptied since, so 0
/// - same scale: `initial * P / snapshot_p`
/// - one scale behind: additionally divided by the scale factor
/// - two or more scales behind: 0
pub fn compounded_stake(
    initial: u128,
    snapshot_p: u128,
    snapshot_scale: u64,
    snapshot_epoch: u64,
    acc: &GlobalAccumulator,
    precision: &PrecisionConfig,
) -> PoolResult<u128> {
    if initial == 0 || snapshot_epoch < acc.current_epoch() {
        return Ok(0);
    }
    if snapshot_p == 0 {
        return Err(PoolError::DivisionByZero);
    }

    let scale_diff = acc.current_scale().saturating_sub(snapshot_scale);
    let compounded = match scale_diff {
        0 => mul_div(initial, acc.product_p(), snapshot_p)?,
        1 => {
            let across = div_wide(
                mul_wide(wide(initial), wide(acc.product_p()))?,
                wide(snapshot_p),
            )?;
            narrow(div_wide(across, wide(precision.scale_factor))?)?
        }
        _ => 0,
    };
    Ok(compounded)
}

/// Gain in `S` or `G` units accrued by `initial` since the given snapshot
///
/// Sums the remainder of the snapshot's own scale and the first scale after
/// it; gains further out are below precision.
#[allow(clippy::too_many_arguments)]
pub fn gain_from_snapshot(
    kind: SumKind,
    initial: u128,
    snapshot_p: u128,
    snapshot_sum: U256,
    snapshot_scale: u64,
    snapshot_epoch: u64,
    acc: &GlobalAccumulator,
    precision: &PrecisionConfig,
) -> PoolResult<u128> {
    if initial == 0 {
        return Ok(0);
    }
    if snapshot_p == 0 {
        return Err(PoolError::DivisionByZero);
    }

    let first_portion = sub_wide(acc.sum(kind, snapshot_epoch, snapshot_scale), snapshot_sum)?;
    let next_scale = snapshot_scale.checked_add(1).ok_or(PoolError::Overflow)?;
    let second_portion = div_wide(
        acc.sum(kind, snapshot_epoch, next_scale),
        wide(precision.scale_factor),
    )?;

    let gained = mul_wide(wide(initial), add_wide(first_portion, second_portion)?)?;
    let gain = div_wide(div_wide(gained, wide(snapshot_p))?, decimal_precision())?;
    narrow(gain)
}

/// Apply a fixed-point `rate` (1e18 = 100%) to an amount, rounding down
pub fn apply_rate(amount: u128, rate: u128) -> PoolResult<u128> {
    mul_div(amount, rate, DECIMAL_PRECISION)
}
