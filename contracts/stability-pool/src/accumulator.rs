//! Global Accumulator
//!
//! The pool-wide state that lets every liquidation be absorbed in O(1):
//!
//! - `P`, the running product of `(1 - loss fraction)` over all offsets
//! - `S[epoch][scale]`, cumulative collateral gain per unit staked
//! - `G[epoch][scale]`, cumulative reward gain per unit staked
//! - the current epoch and scale
//!
//! Depositors keep a snapshot of these values and derive their compounded
//! balance and pending gains lazily from the difference.
//!
//! ## Key Features
//!
//! - **Error feedback**: division remainders are carried into the next update
//! - **Pool-favouring rounding**: the loss per unit is rounded up
//! - **Rescaling**: `P` is multiplied by the scale factor before it loses precision
//! - **Staged updates**: offsets are computed in full before anything is written

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stabilio_common::{
    constants::{precision::DECIMAL_PRECISION, stability_pool::INITIAL_PRODUCT},
    errors::{PoolError, PoolResult},
    events::{EventLog, PoolEvent},
    math::{add_wide, decimal_precision, div_wide, mul_div, mul_wide, narrow, sub_wide, wide, U256},
};

use crate::config::PrecisionConfig;

/// Key of the `S` and `G` tables
pub type EpochScale = (u64, u64);

/// Which cumulative sum table to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SumKind {
    /// `S`: collateral gain per unit staked
    Collateral,
    /// `G`: reward gain per unit staked
    Reward,
}

/// Per-unit figures of a single offset, with the remainders to carry forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardsPerUnit {
    /// Collateral gained per unit staked, scaled by 1e18
    pub collateral_gain: U256,
    /// Fraction of each unit lost, scaled by 1e18 and rounded up
    pub debt_loss: u128,
    collateral_error: u128,
    debt_loss_error: u128,
}

/// How `P` moves in response to a loss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductChange {
    /// `P` shrinks within the current scale
    Compound { product_p: u128 },
    /// `P` was rescaled and the scale advances by one
    Rescale { product_p: u128 },
    /// The pool was emptied: new epoch, scale 0, `P` back to one
    NewEpoch,
}

/// Summary of an applied offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetOutcome {
    /// Per-unit figures used for the update
    pub per_unit: RewardsPerUnit,
    /// New value of `S` at the pre-offset epoch and scale
    pub sum_s: U256,
    /// Resulting movement of `P`
    pub product_change: ProductChange,
}

/// Values that let an `apply_reward` be undone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardCheckpoint {
    key: EpochScale,
    previous_g: Option<U256>,
    last_reward_error: u128,
}

/// Global accumulator state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GlobalAccumulator {
    /// Running product, 1e18 at the start of every epoch
    product_p: u128,
    /// Incremented each time the pool is emptied
    current_epoch: u64,
    /// Incremented each time `P` is rescaled
    current_scale: u64,
    /// `S` values keyed by (epoch, scale)
    collateral_sums: BTreeMap<EpochScale, U256>,
    /// `G` values keyed by (epoch, scale)
    reward_sums: BTreeMap<EpochScale, U256>,
    /// Remainder of the last collateral-per-unit division
    last_collateral_error: u128,
    /// Over-count of the last rounded-up loss-per-unit division
    last_debt_loss_error: u128,
    /// Remainder of the last reward-per-unit division
    last_reward_error: u128,
}

impl Default for GlobalAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalAccumulator {
    /// Fresh accumulator: `P = 1`, epoch 0, scale 0, empty sums
    pub fn new() -> Self {
        Self {
            product_p: INITIAL_PRODUCT,
            current_epoch: 0,
            current_scale: 0,
            collateral_sums: BTreeMap::new(),
            reward_sums: BTreeMap::new(),
            last_collateral_error: 0,
            last_debt_loss_error: 0,
            last_reward_error: 0,
        }
    }

    pub fn product_p(&self) -> u128 {
        self.product_p
    }

    pub fn current_epoch(&self) -> u64 {
        self.current_epoch
    }

    pub fn current_scale(&self) -> u64 {
        self.current_scale
    }

    /// The (epoch, scale) new snapshots are taken at
    pub fn current_key(&self) -> EpochScale {
        (self.current_epoch, self.current_scale)
    }

    /// Value of `S` or `G` at a key; zero if never written
    pub fn sum(&self, kind: SumKind, epoch: u64, scale: u64) -> U256 {
        let table = match kind {
            SumKind::Collateral => &self.collateral_sums,
            SumKind::Reward => &self.reward_sums,
        };
        table.get(&(epoch, scale)).copied().unwrap_or_default()
    }

    /// `S` at the current epoch and scale
    pub fn current_sum_s(&self) -> U256 {
        self.sum(SumKind::Collateral, self.current_epoch, self.current_scale)
    }

    /// `G` at the current epoch and scale
    pub fn current_sum_g(&self) -> U256 {
        self.sum(SumKind::Reward, self.current_epoch, self.current_scale)
    }

    /// Error-feedback remainders `(collateral, debt loss, reward)`
    pub fn error_terms(&self) -> (u128, u128, u128) {
        (self.last_collateral_error, self.last_debt_loss_error, self.last_reward_error)
    }

    // ============ Offset ============

    /// Per-unit collateral gain and debt loss for an offset against `total`
    ///
    /// Pure: the remainders are returned in the result and only written back
    /// when the offset is committed.
    pub fn compute_rewards_per_unit(
        &self,
        collateral: u128,
        debt: u128,
        total: u128,
    ) -> PoolResult<RewardsPerUnit> {
        if total == 0 {
            return Err(PoolError::DivisionByZero);
        }
        if debt > total {
            return Err(PoolError::InsufficientPoolBalance { available: total, required: debt });
        }
        let total_wide = wide(total);

        let collateral_numerator = add_wide(
            mul_wide(wide(collateral), decimal_precision())?,
            wide(self.last_collateral_error),
        )?;
        let collateral_gain = div_wide(collateral_numerator, total_wide)?;
        let collateral_error =
            narrow(sub_wide(collateral_numerator, mul_wide(collateral_gain, total_wide)?)?)?;

        let (debt_loss, debt_loss_error) = if debt == total {
            (DECIMAL_PRECISION, 0)
        } else {
            let loss_numerator = mul_wide(wide(debt), decimal_precision())?
                .saturating_sub(wide(self.last_debt_loss_error));
            let loss = add_wide(div_wide(loss_numerator, total_wide)?, U256::one())?;
            let error = sub_wide(mul_wide(loss, total_wide)?, loss_numerator)?;
            (narrow(loss)?, narrow(error)?)
        };

        Ok(RewardsPerUnit { collateral_gain, debt_loss, collateral_error, debt_loss_error })
    }

    /// New value of `S` after crediting `gain_per_unit` at the current `P`
    pub fn staged_gain(&self, gain_per_unit: U256) -> PoolResult<U256> {
        let marginal = mul_wide(gain_per_unit, wide(self.product_p))?;
        add_wide(self.current_sum_s(), marginal)
    }

    /// Movement of `P` for a loss of `loss_per_unit` (scaled by 1e18)
    ///
    /// Rescales at most once. A rescale multiplies by the scale factor only,
    /// so after a near-total loss `P` can stay below the threshold; if a
    /// later loss then rounds `P` to zero this fails with
    /// [`PoolError::ProductCollapsed`] and the offset must be rejected.
    pub fn staged_loss(
        &self,
        loss_per_unit: u128,
        precision: &PrecisionConfig,
    ) -> PoolResult<ProductChange> {
        let new_product_factor =
            DECIMAL_PRECISION.checked_sub(loss_per_unit).ok_or(PoolError::Underflow)?;

        if new_product_factor == 0 {
            return Ok(ProductChange::NewEpoch);
        }

        let compounded = mul_div(self.product_p, new_product_factor, DECIMAL_PRECISION)?;
        let change = if compounded < precision.rescale_threshold {
            let rescaled = div_wide(
                mul_wide(
                    mul_wide(wide(self.product_p), wide(new_product_factor))?,
                    wide(precision.scale_factor),
                )?,
                decimal_precision(),
            )?;
            ProductChange::Rescale { product_p: narrow(rescaled)? }
        } else {
            ProductChange::Compound { product_p: compounded }
        };

        match change {
            ProductChange::Compound { product_p: 0 } | ProductChange::Rescale { product_p: 0 } => {
                Err(PoolError::ProductCollapsed)
            }
            _ => Ok(change),
        }
    }

    /// Absorb `debt` and distribute `collateral` across `total` staked
    ///
    /// Every figure is computed before any field is written, so an error
    /// leaves the accumulator untouched. The gain is credited at the
    /// pre-loss `P`.
    pub fn apply_offset(
        &mut self,
        debt: u128,
        collateral: u128,
        total: u128,
        precision: &PrecisionConfig,
        events: &mut EventLog,
    ) -> PoolResult<OffsetOutcome> {
        let per_unit = self.compute_rewards_per_unit(collateral, debt, total)?;
        let sum_s = self.staged_gain(per_unit.collateral_gain)?;
        let product_change = self.staged_loss(per_unit.debt_loss, precision)?;

        // Commit
        self.last_collateral_error = per_unit.collateral_error;
        // The over-charge is refunded against the surviving deposits, so it
        // is bounded by them
        self.last_debt_loss_error = per_unit.debt_loss_error.min(total - debt);

        let (epoch, scale) = self.current_key();
        self.collateral_sums.insert((epoch, scale), sum_s);
        events.emit(PoolEvent::SumUpdated { epoch, scale, sum_s });

        self.apply_product_change(product_change, events);

        Ok(OffsetOutcome { per_unit, sum_s, product_change })
    }

    fn apply_product_change(&mut self, change: ProductChange, events: &mut EventLog) {
        match change {
            ProductChange::Compound { product_p } => {
                self.product_p = product_p;
            }
            ProductChange::Rescale { product_p } => {
                self.product_p = product_p;
                self.current_scale += 1;
                log::debug!("P rescaled to {product_p}, scale now {}", self.current_scale);
                events.emit(PoolEvent::ScaleUpdated { scale: self.current_scale });
            }
            ProductChange::NewEpoch => {
                self.product_p = INITIAL_PRODUCT;
                self.current_epoch += 1;
                self.current_scale = 0;
                log::debug!("pool emptied, epoch now {}", self.current_epoch);
                events.emit(PoolEvent::EpochUpdated { epoch: self.current_epoch });
                events.emit(PoolEvent::ScaleUpdated { scale: 0 });
            }
        }
        events.emit(PoolEvent::ProductUpdated { product_p: self.product_p });
    }

    // ============ Rewards ============

    /// Credit `reward` across `total` staked into `G` at the current key
    ///
    /// No-op when either is zero. Returns the new `G` when it changed.
    pub fn apply_reward(
        &mut self,
        reward: u128,
        total: u128,
        events: &mut EventLog,
    ) -> PoolResult<Option<U256>> {
        if total == 0 || reward == 0 {
            return Ok(None);
        }
        let total_wide = wide(total);

        let numerator =
            add_wide(mul_wide(wide(reward), decimal_precision())?, wide(self.last_reward_error))?;
        let per_unit = div_wide(numerator, total_wide)?;
        let error = narrow(sub_wide(numerator, mul_wide(per_unit, total_wide)?)?)?;

        let marginal = mul_wide(per_unit, wide(self.product_p))?;
        let sum_g = add_wide(self.current_sum_g(), marginal)?;

        self.last_reward_error = error;
        let (epoch, scale) = self.current_key();
        self.reward_sums.insert((epoch, scale), sum_g);
        events.emit(PoolEvent::RewardSumUpdated { epoch, scale, sum_g });

        Ok(Some(sum_g))
    }

    /// Capture what `apply_reward` may overwrite
    pub fn reward_checkpoint(&self) -> RewardCheckpoint {
        let key = self.current_key();
        RewardCheckpoint {
            key,
            previous_g: self.reward_sums.get(&key).copied(),
            last_reward_error: self.last_reward_error,
        }
    }

    /// Undo an `apply_reward` made since `checkpoint`
    pub fn restore_reward(&mut self, checkpoint: RewardCheckpoint) {
        match checkpoint.previous_g {
            Some(g) => {
                self.reward_sums.insert(checkpoint.key, g);
            }
            None => {
                self.reward_sums.remove(&checkpoint.key);
            }
        }
        self.last_reward_error = checkpoint.last_reward_error;
    }
}
