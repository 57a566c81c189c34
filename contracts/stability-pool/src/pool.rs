//! Stability Pool
//!
//! Orchestrates the accumulator, depositor records, front ends and reward
//! issuance behind the pool's public operations.
//!
//! ## Operation Ordering
//!
//! Every mutating operation first validates, then commits all internal
//! accounting, and only then moves value through the [`AssetLedger`]. If
//! any movement fails the operation's accounting is restored from an undo
//! checkpoint and its events are discarded.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stabilio_common::{
    constants::precision::DECIMAL_PRECISION,
    errors::{PoolError, PoolResult},
    events::{EventLog, PoolEvent},
    math::{safe_add, safe_sub},
    types::{Address, Asset, Timestamp, Transfer},
};

use crate::accumulator::{GlobalAccumulator, ProductChange, RewardCheckpoint};
use crate::config::PoolConfig;
use crate::deposit::{apply_rate, DepositorRecord};
use crate::front_end::FrontEnd;
use crate::issuance::CommunityIssuance;
use crate::ledger::{settle, AssetLedger};

// ============ Requests ============

/// Deposit stable tokens into the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DepositRequest {
    /// Depositor address
    pub depositor: Address,
    /// Amount of stable tokens to add
    pub amount: u128,
    /// Front end to tag a new deposit with
    pub front_end: Option<Address>,
    /// Current time
    pub timestamp: Timestamp,
}

/// Withdraw stable tokens from the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct WithdrawRequest {
    /// Depositor address
    pub depositor: Address,
    /// Amount requested; clamped to the compounded deposit, 0 claims gains only
    pub amount: u128,
    /// Current time
    pub timestamp: Timestamp,
}

/// Absorb liquidated debt and distribute its collateral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct OffsetRequest {
    /// Calling identity, must be the configured liquidation engine
    pub caller: Address,
    /// Debt cancelled against the pool's stable tokens
    pub debt: u128,
    /// Collateral handed to the pool for depositors
    pub collateral: u128,
    /// Current time
    pub timestamp: Timestamp,
}

// ============ Results ============

/// Gains realized when a deposit is touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RealizedGains {
    /// Collateral paid to the depositor
    pub collateral_gain: u128,
    /// Reward paid to the depositor
    pub depositor_reward: u128,
    /// Reward paid to the depositor's front end
    pub front_end_reward: u128,
    /// Stable tokens lost to liquidations since the last snapshot
    pub deposit_loss: u128,
}

/// Result of a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositResult {
    /// Deposit after the operation
    pub new_deposit: u128,
    /// Gains realized and paid out
    pub gains: RealizedGains,
    /// Pool total after the operation
    pub new_pool_total: u128,
}

/// Result of a withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawResult {
    /// Stable tokens sent to the depositor
    pub amount_withdrawn: u128,
    /// Deposit left after the operation
    pub remaining_deposit: u128,
    /// Gains realized and paid out
    pub gains: RealizedGains,
    /// Pool total after the operation
    pub new_pool_total: u128,
}

/// Result of an offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetResult {
    /// Debt absorbed by the pool
    pub debt_absorbed: u128,
    /// Collateral credited to depositors
    pub collateral_distributed: u128,
    /// Pool total after the offset
    pub new_pool_total: u128,
    /// Running product after the offset
    pub product_p: u128,
    /// Epoch after the offset
    pub epoch: u64,
    /// Scale after the offset
    pub scale: u64,
}

// ============ Undo Checkpoint ============

/// Everything a single operation may change, captured before it starts
struct Checkpoint {
    reward: RewardCheckpoint,
    issuance: CommunityIssuance,
    total_deposits: u128,
    collateral_balance: u128,
    depositor: Option<(Address, Option<DepositorRecord>)>,
    front_end: Option<(Address, Option<FrontEnd>)>,
    events_len: usize,
}

// ============ Stability Pool ============

/// The stability pool
#[derive(Debug, Clone)]
pub struct StabilityPool {
    pub(crate) config: PoolConfig,
    pub(crate) accumulator: GlobalAccumulator,
    pub(crate) issuance: CommunityIssuance,
    pub(crate) total_deposits: u128,
    pub(crate) collateral_balance: u128,
    pub(crate) deposits: BTreeMap<Address, DepositorRecord>,
    pub(crate) front_ends: BTreeMap<Address, FrontEnd>,
    pub(crate) events: EventLog,
}

impl StabilityPool {
    /// Create an empty pool
    pub fn new(config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            accumulator: GlobalAccumulator::new(),
            issuance: CommunityIssuance::new(),
            total_deposits: 0,
            collateral_balance: 0,
            deposits: BTreeMap::new(),
            front_ends: BTreeMap::new(),
            events: EventLog::new(),
        })
    }

    // ============ Getters ============

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn accumulator(&self) -> &GlobalAccumulator {
        &self.accumulator
    }

    /// Stable tokens held for depositors
    pub fn total_deposits(&self) -> u128 {
        self.total_deposits
    }

    /// Collateral held and owed to depositors as gains
    pub fn collateral_balance(&self) -> u128 {
        self.collateral_balance
    }

    /// Rewards issued into the pool so far
    pub fn total_rewards_issued(&self) -> u128 {
        self.issuance.total_issued
    }

    /// Stored record of a depositor
    pub fn deposit_record(&self, depositor: &Address) -> Option<&DepositorRecord> {
        self.deposits.get(depositor)
    }

    /// Stored state of a front end
    pub fn front_end(&self, front_end: &Address) -> Option<&FrontEnd> {
        self.front_ends.get(front_end)
    }

    /// Number of open deposits
    pub fn depositor_count(&self) -> usize {
        self.deposits.len()
    }

    /// Open deposits in address order
    pub fn depositors(&self) -> impl Iterator<Item = &Address> {
        self.deposits.keys()
    }

    /// Depositor's current balance after losses
    pub fn compounded_deposit(&self, depositor: &Address) -> PoolResult<u128> {
        match self.deposits.get(depositor) {
            Some(record) => record.compounded_value(&self.accumulator, &self.config.precision),
            None => Ok(0),
        }
    }

    /// Collateral the depositor would receive if it touched its deposit now
    pub fn depositor_collateral_gain(&self, depositor: &Address) -> PoolResult<u128> {
        match self.deposits.get(depositor) {
            Some(record) => record.collateral_gain(&self.accumulator, &self.config.precision),
            None => Ok(0),
        }
    }

    /// Reward the depositor would receive, after its front end's cut
    pub fn depositor_reward_gain(&self, depositor: &Address) -> PoolResult<u128> {
        let Some(record) = self.deposits.get(depositor) else {
            return Ok(0);
        };
        let gross = record.reward_gain(&self.accumulator, &self.config.precision)?;
        let kickback_rate = match record.front_end {
            Some(tag) => self.front_ends.get(&tag).map_or(DECIMAL_PRECISION, |f| f.kickback_rate),
            None => DECIMAL_PRECISION,
        };
        apply_rate(gross, kickback_rate)
    }

    /// Reward a front end would receive on its own stake
    pub fn front_end_reward_gain(&self, front_end: &Address) -> PoolResult<u128> {
        match self.front_ends.get(front_end) {
            Some(state) => state.reward_gain(&self.accumulator, &self.config.precision),
            None => Ok(0),
        }
    }

    /// Front end's aggregate tagged stake after losses
    pub fn compounded_front_end_stake(&self, front_end: &Address) -> PoolResult<u128> {
        match self.front_ends.get(front_end) {
            Some(state) => state.compounded_stake(&self.accumulator, &self.config.precision),
            None => Ok(0),
        }
    }

    /// Events emitted since the last drain
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Drain emitted events
    pub fn take_events(&mut self) -> Vec<PoolEvent> {
        self.events.take()
    }

    // ============ Offset ============

    /// Absorb liquidated debt and distribute its collateral
    ///
    /// O(1) in the number of depositors. Moves no value itself: the caller
    /// has already sent `collateral` to the pool and burns `debt` worth of
    /// the pool's stable tokens.
    ///
    /// P is rescaled at most once per offset. After near-total losses it can
    /// sit far below the rescale threshold, and a later offset whose product
    /// would round to zero is rejected with [`PoolError::ProductCollapsed`],
    /// leaving the pool unchanged.
    pub fn offset(&mut self, request: &OffsetRequest) -> PoolResult<OffsetResult> {
        // 1. Only the liquidation engine can call offset
        if request.caller != self.config.liquidation_engine {
            return Err(PoolError::Unauthorized {
                expected: self.config.liquidation_engine,
                actual: request.caller,
            });
        }

        // 2. Pool must have enough stable tokens
        let total = self.total_deposits;
        if request.debt > total {
            return Err(PoolError::InsufficientPoolBalance {
                available: total,
                required: request.debt,
            });
        }

        // 3. Nothing to absorb
        if total == 0 || request.debt == 0 {
            return Ok(self.offset_result(0, 0));
        }

        let checkpoint = self.checkpoint(None, None);
        match self.commit_offset(request) {
            Ok(result) => Ok(result),
            Err(err) => {
                log::warn!("offset of {} rolled back: {err}", request.debt);
                self.restore(checkpoint);
                Err(err)
            }
        }
    }

    fn commit_offset(&mut self, request: &OffsetRequest) -> PoolResult<OffsetResult> {
        // Bring G up to date against the pre-offset deposits
        self.trigger_issuance_inner(request.timestamp)?;

        let total = self.total_deposits;
        let new_total = safe_sub(total, request.debt)?;
        let new_collateral = safe_add(self.collateral_balance, request.collateral)?;

        let outcome = self.accumulator.apply_offset(
            request.debt,
            request.collateral,
            total,
            &self.config.precision,
            &mut self.events,
        )?;

        self.total_deposits = new_total;
        self.collateral_balance = new_collateral;

        if let ProductChange::NewEpoch = outcome.product_change {
            log::debug!("offset of {} emptied the pool", request.debt);
        }
        log::trace!(
            "offset debt={} coll={} loss/unit={} P={}",
            request.debt,
            request.collateral,
            outcome.per_unit.debt_loss,
            self.accumulator.product_p()
        );

        self.events.emit(PoolEvent::TotalDepositsUpdated { total: new_total });
        self.events.emit(PoolEvent::CollateralBalanceUpdated { balance: new_collateral });
        self.events.emit(PoolEvent::LiquidationOffset {
            debt_offset: request.debt,
            collateral_gained: request.collateral,
            new_pool_total: new_total,
            timestamp: request.timestamp,
        });

        Ok(self.offset_result(request.debt, request.collateral))
    }

    fn offset_result(&self, debt: u128, collateral: u128) -> OffsetResult {
        OffsetResult {
            debt_absorbed: debt,
            collateral_distributed: collateral,
            new_pool_total: self.total_deposits,
            product_p: self.accumulator.product_p(),
            epoch: self.accumulator.current_epoch(),
            scale: self.accumulator.current_scale(),
        }
    }

    // ============ Deposit ============

    /// Add stable tokens to a deposit, paying out all pending gains
    pub fn deposit<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        request: &DepositRequest,
    ) -> PoolResult<DepositResult> {
        // 1. Amount must be positive
        if request.amount == 0 {
            return Err(PoolError::ZeroAmount);
        }

        // 2. Front ends cannot deposit
        if self.is_registered_front_end(&request.depositor) {
            return Err(PoolError::FrontEndCannotDeposit { front_end: request.depositor });
        }

        // 3. A supplied tag must be a registered front end
        if let Some(tag) = request.front_end {
            if !self.is_registered_front_end(&tag) {
                return Err(PoolError::FrontEndNotRegistered { front_end: tag });
            }
        }

        // 4. The tag only applies to a new deposit
        let front_end = match self.deposits.get(&request.depositor) {
            Some(record) => record.front_end,
            None => request.front_end,
        };

        let checkpoint = self.checkpoint(Some(request.depositor), front_end);
        let outcome = self.commit_deposit(request, front_end).and_then(|(result, transfers)| {
            settle(ledger, &transfers)?;
            Ok(result)
        });
        if let Err(err) = &outcome {
            log::warn!("deposit of {} rolled back: {err}", request.amount);
            self.restore(checkpoint);
        }
        outcome
    }

    fn commit_deposit(
        &mut self,
        request: &DepositRequest,
        front_end: Option<Address>,
    ) -> PoolResult<(DepositResult, Vec<Transfer>)> {
        let depositor = request.depositor;
        let is_new = !self.deposits.contains_key(&depositor);

        self.trigger_issuance_inner(request.timestamp)?;

        let gains = self.realize_gains(&depositor, front_end, request.timestamp)?;
        let compounded = self.compounded_deposit(&depositor)?;

        // Front end stake follows the deposit
        if let Some(tag) = front_end {
            let stake = safe_add(self.compounded_front_end_stake(&tag)?, request.amount)?;
            self.update_front_end_stake(&tag, stake, request.timestamp);
        }

        let new_deposit = safe_add(compounded, request.amount)?;
        let new_total = safe_add(self.total_deposits, request.amount)?;
        self.total_deposits = new_total;
        self.update_deposit(&depositor, new_deposit, front_end, request.timestamp);

        if is_new {
            if let Some(tag) = front_end {
                self.events.emit(PoolEvent::FrontEndTagSet {
                    depositor,
                    front_end: tag,
                    timestamp: request.timestamp,
                });
            }
        }
        self.events.emit(PoolEvent::TotalDepositsUpdated { total: new_total });

        let mut transfers = vec![Transfer::inbound(Asset::Stable, depositor, request.amount)];
        transfers.extend(self.payout_transfers(&depositor, front_end, &gains));

        let result = DepositResult { new_deposit, gains, new_pool_total: new_total };
        Ok((result, transfers))
    }

    // ============ Withdraw ============

    /// Withdraw up to `amount` of a deposit, paying out all pending gains
    pub fn withdraw<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        request: &WithdrawRequest,
    ) -> PoolResult<WithdrawResult> {
        // 1. Deposit must exist
        let front_end = match self.deposits.get(&request.depositor) {
            Some(record) => record.front_end,
            None => return Err(PoolError::DepositNotFound { depositor: request.depositor }),
        };

        let checkpoint = self.checkpoint(Some(request.depositor), front_end);
        let outcome = self.commit_withdraw(request, front_end).and_then(|(result, transfers)| {
            settle(ledger, &transfers)?;
            Ok(result)
        });
        if let Err(err) = &outcome {
            log::warn!("withdrawal of {} rolled back: {err}", request.amount);
            self.restore(checkpoint);
        }
        outcome
    }

    /// Pay out pending gains without changing the deposit
    pub fn claim_gains<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        depositor: &Address,
        timestamp: Timestamp,
    ) -> PoolResult<WithdrawResult> {
        self.withdraw(ledger, &WithdrawRequest { depositor: *depositor, amount: 0, timestamp })
    }

    fn commit_withdraw(
        &mut self,
        request: &WithdrawRequest,
        front_end: Option<Address>,
    ) -> PoolResult<(WithdrawResult, Vec<Transfer>)> {
        let depositor = request.depositor;

        self.trigger_issuance_inner(request.timestamp)?;

        let gains = self.realize_gains(&depositor, front_end, request.timestamp)?;
        let compounded = self.compounded_deposit(&depositor)?;
        // Rounding can leave the last depositor a few wei above the pool total
        let withdrawn = request.amount.min(compounded).min(self.total_deposits);

        if let Some(tag) = front_end {
            let stake = self.compounded_front_end_stake(&tag)?.saturating_sub(withdrawn);
            self.update_front_end_stake(&tag, stake, request.timestamp);
        }

        let remaining = safe_sub(compounded, withdrawn)?;
        let new_total = safe_sub(self.total_deposits, withdrawn)?;
        self.total_deposits = new_total;
        self.update_deposit(&depositor, remaining, front_end, request.timestamp);
        if withdrawn > 0 {
            self.events.emit(PoolEvent::TotalDepositsUpdated { total: new_total });
        }

        let mut transfers = vec![Transfer::outbound(Asset::Stable, depositor, withdrawn)];
        transfers.extend(self.payout_transfers(&depositor, front_end, &gains));

        let result = WithdrawResult {
            amount_withdrawn: withdrawn,
            remaining_deposit: remaining,
            gains,
            new_pool_total: new_total,
        };
        Ok((result, transfers))
    }

    // ============ Front Ends ============

    /// Register `front_end` with the share of rewards it passes on to depositors
    pub fn register_front_end(
        &mut self,
        front_end: &Address,
        kickback_rate: u128,
        timestamp: Timestamp,
    ) -> PoolResult<()> {
        if self.is_registered_front_end(front_end) {
            return Err(PoolError::FrontEndAlreadyRegistered { front_end: *front_end });
        }
        if self.deposits.contains_key(front_end) {
            return Err(PoolError::DepositAlreadyExists { depositor: *front_end });
        }

        let state = FrontEnd::register(kickback_rate)?;
        self.front_ends.insert(*front_end, state);
        self.events.emit(PoolEvent::FrontEndRegistered {
            front_end: *front_end,
            kickback_rate,
            timestamp,
        });
        log::debug!("front end {:02x?} registered", &front_end[..4]);
        Ok(())
    }

    fn is_registered_front_end(&self, address: &Address) -> bool {
        self.front_ends.get(address).is_some_and(|f| f.registered)
    }

    // ============ Issuance ============

    /// Issue rewards due up to `timestamp` into `G`, returning the amount issued
    ///
    /// Rewards issued while the pool is empty are not credited to anyone.
    pub fn trigger_issuance(&mut self, timestamp: Timestamp) -> PoolResult<u128> {
        let checkpoint = self.checkpoint(None, None);
        let outcome = self.trigger_issuance_inner(timestamp);
        if outcome.is_err() {
            self.restore(checkpoint);
        }
        outcome
    }

    fn trigger_issuance_inner(&mut self, timestamp: Timestamp) -> PoolResult<u128> {
        let issued = self.issuance.issue(&self.config.issuance, timestamp)?;
        if issued == 0 {
            return Ok(0);
        }
        self.accumulator.apply_reward(issued, self.total_deposits, &mut self.events)?;
        self.events.emit(PoolEvent::RewardIssued {
            amount: issued,
            total_issued: self.issuance.total_issued,
            timestamp,
        });
        log::trace!("issued {issued} rewards at {timestamp}");
        Ok(issued)
    }

    // ============ Internals ============

    /// Compute all gains pending on a deposit and take them off the pool's books
    fn realize_gains(
        &mut self,
        depositor: &Address,
        front_end: Option<Address>,
        timestamp: Timestamp,
    ) -> PoolResult<RealizedGains> {
        let precision = &self.config.precision;

        // A new deposit has nothing pending itself, but its front end may
        let (collateral_gain, deposit_loss, depositor_reward) = match self.deposits.get(depositor) {
            Some(record) => {
                let collateral_gain = record.collateral_gain(&self.accumulator, precision)?;
                let compounded = record.compounded_value(&self.accumulator, precision)?;
                let deposit_loss = safe_sub(record.initial_value, compounded)?;
                (collateral_gain, deposit_loss, self.depositor_reward_gain(depositor)?)
            }
            None => (0, 0, 0),
        };
        let front_end_reward = match front_end {
            Some(tag) => self.front_end_reward_gain(&tag)?,
            None => 0,
        };

        let collateral_gain = if collateral_gain > self.collateral_balance {
            log::debug!(
                "collateral gain {collateral_gain} capped at pool balance {}",
                self.collateral_balance
            );
            self.collateral_balance
        } else {
            collateral_gain
        };
        self.collateral_balance -= collateral_gain;

        if collateral_gain > 0 {
            self.events.emit(PoolEvent::CollateralBalanceUpdated { balance: self.collateral_balance });
            self.events.emit(PoolEvent::CollateralGainWithdrawn {
                depositor: *depositor,
                collateral: collateral_gain,
                deposit_loss,
                timestamp,
            });
        }
        if depositor_reward > 0 {
            self.events.emit(PoolEvent::RewardPaidToDepositor {
                depositor: *depositor,
                amount: depositor_reward,
                timestamp,
            });
        }
        if let (Some(tag), true) = (front_end, front_end_reward > 0) {
            self.events.emit(PoolEvent::RewardPaidToFrontEnd {
                front_end: tag,
                amount: front_end_reward,
                timestamp,
            });
        }

        Ok(RealizedGains { collateral_gain, depositor_reward, front_end_reward, deposit_loss })
    }

    fn payout_transfers(
        &self,
        depositor: &Address,
        front_end: Option<Address>,
        gains: &RealizedGains,
    ) -> Vec<Transfer> {
        let mut transfers = vec![
            Transfer::outbound(Asset::Collateral, *depositor, gains.collateral_gain),
            Transfer::outbound(Asset::Reward, *depositor, gains.depositor_reward),
        ];
        if let Some(tag) = front_end {
            transfers.push(Transfer::outbound(Asset::Reward, tag, gains.front_end_reward));
        }
        transfers
    }

    /// Store a deposit value with a fresh snapshot, or drop the record at zero
    fn update_deposit(
        &mut self,
        depositor: &Address,
        new_value: u128,
        front_end: Option<Address>,
        timestamp: Timestamp,
    ) {
        if new_value == 0 {
            self.deposits.remove(depositor);
            self.events.emit(PoolEvent::DepositSnapshotUpdated {
                depositor: *depositor,
                product_p: 0,
                sum_s: Default::default(),
                sum_g: Default::default(),
            });
        } else {
            let record = DepositorRecord::new(*depositor, new_value, front_end, &self.accumulator);
            self.events.emit(PoolEvent::DepositSnapshotUpdated {
                depositor: *depositor,
                product_p: record.snapshot.p,
                sum_s: record.snapshot.s,
                sum_g: record.snapshot.g,
            });
            self.deposits.insert(*depositor, record);
        }
        self.events.emit(PoolEvent::DepositChanged {
            depositor: *depositor,
            new_deposit: new_value,
            timestamp,
        });
    }

    fn update_front_end_stake(&mut self, front_end: &Address, stake: u128, timestamp: Timestamp) {
        let Some(state) = self.front_ends.get_mut(front_end) else {
            return;
        };
        state.set_stake(stake, &self.accumulator);
        self.events.emit(PoolEvent::FrontEndSnapshotUpdated {
            front_end: *front_end,
            product_p: state.snapshot.p,
            sum_g: state.snapshot.g,
        });
        self.events.emit(PoolEvent::FrontEndStakeChanged {
            front_end: *front_end,
            new_stake: stake,
            timestamp,
        });
    }

    fn checkpoint(&self, depositor: Option<Address>, front_end: Option<Address>) -> Checkpoint {
        Checkpoint {
            reward: self.accumulator.reward_checkpoint(),
            issuance: self.issuance,
            total_deposits: self.total_deposits,
            collateral_balance: self.collateral_balance,
            depositor: depositor.map(|d| (d, self.deposits.get(&d).cloned())),
            front_end: front_end.map(|f| (f, self.front_ends.get(&f).cloned())),
            events_len: self.events.len(),
        }
    }

    /// Undo a deposit, withdrawal or issuance
    ///
    /// Offsets write the accumulator only after all their figures are
    /// computed, so only the reward update can precede a failure.
    fn restore(&mut self, checkpoint: Checkpoint) {
        self.accumulator.restore_reward(checkpoint.reward);
        self.issuance = checkpoint.issuance;
        self.total_deposits = checkpoint.total_deposits;
        self.collateral_balance = checkpoint.collateral_balance;
        if let Some((address, record)) = checkpoint.depositor {
            match record {
                Some(record) => self.deposits.insert(address, record),
                None => self.deposits.remove(&address),
            };
        }
        if let Some((address, state)) = checkpoint.front_end {
            match state {
                Some(state) => self.front_ends.insert(address, state),
                None => self.front_ends.remove(&address),
            };
        }
        self.events.truncate(checkpoint.events_len);
    }
}
