//! Pool Events for Stabilio
//!
//! Events are emitted while the pool executes an operation and can be
//! indexed off-chain for UIs, analytics, and reconciliation. Events of an
//! operation that is rolled back are discarded with it.

use crate::math::U256;
use crate::types::{Address, Timestamp};
use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Depositor Events (0x20 - 0x2F)
    DepositChanged = 0x20,
    DepositSnapshotUpdated = 0x21,
    CollateralGainWithdrawn = 0x22,
    RewardPaidToDepositor = 0x23,

    // Front End Events (0x30 - 0x3F)
    FrontEndRegistered = 0x30,
    FrontEndTagSet = 0x31,
    FrontEndStakeChanged = 0x32,
    FrontEndSnapshotUpdated = 0x33,
    RewardPaidToFrontEnd = 0x34,

    // Accumulator Events (0x40 - 0x4F)
    ProductUpdated = 0x40,
    SumUpdated = 0x41,
    RewardSumUpdated = 0x42,
    EpochUpdated = 0x43,
    ScaleUpdated = 0x44,

    // Pool Events (0x50 - 0x5F)
    LiquidationOffset = 0x50,
    TotalDepositsUpdated = 0x51,
    CollateralBalanceUpdated = 0x52,
    RewardIssued = 0x53,
}

/// Main event enum containing all stability pool events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum PoolEvent {
    // ============ Depositor Events ============

    /// Emitted when a depositor's recorded deposit changes
    DepositChanged {
        depositor: Address,
        new_deposit: u128,
        timestamp: Timestamp,
    },

    /// Emitted when a depositor's snapshot is taken or cleared
    DepositSnapshotUpdated {
        depositor: Address,
        product_p: u128,
        sum_s: U256,
        sum_g: U256,
    },

    /// Emitted when collateral gain is paid out
    CollateralGainWithdrawn {
        depositor: Address,
        collateral: u128,
        deposit_loss: u128,
        timestamp: Timestamp,
    },

    /// Emitted when community rewards are paid to a depositor
    RewardPaidToDepositor {
        depositor: Address,
        amount: u128,
        timestamp: Timestamp,
    },

    // ============ Front End Events ============

    /// Emitted when a front end registers
    FrontEndRegistered {
        front_end: Address,
        kickback_rate: u128,
        timestamp: Timestamp,
    },

    /// Emitted when a depositor is tagged with a front end
    FrontEndTagSet {
        depositor: Address,
        front_end: Address,
        timestamp: Timestamp,
    },

    /// Emitted when the aggregate stake of a front end changes
    FrontEndStakeChanged {
        front_end: Address,
        new_stake: u128,
        timestamp: Timestamp,
    },

    /// Emitted when a front end's snapshot is taken or cleared
    FrontEndSnapshotUpdated {
        front_end: Address,
        product_p: u128,
        sum_g: U256,
    },

    /// Emitted when community rewards are paid to a front end
    RewardPaidToFrontEnd {
        front_end: Address,
        amount: u128,
        timestamp: Timestamp,
    },

    // ============ Accumulator Events ============

    /// Emitted when the running product changes
    ProductUpdated { product_p: u128 },

    /// Emitted when the collateral sum of an epoch and scale changes
    SumUpdated { epoch: u64, scale: u64, sum_s: U256 },

    /// Emitted when the reward sum of an epoch and scale changes
    RewardSumUpdated { epoch: u64, scale: u64, sum_g: U256 },

    /// Emitted when the pool is emptied and a new epoch starts
    EpochUpdated { epoch: u64 },

    /// Emitted when the running product is rescaled
    ScaleUpdated { scale: u64 },

    // ============ Pool Events ============

    /// Emitted when the pool absorbs a liquidation
    LiquidationOffset {
        debt_offset: u128,
        collateral_gained: u128,
        new_pool_total: u128,
        timestamp: Timestamp,
    },

    /// Emitted when the pool's stable token total changes
    TotalDepositsUpdated { total: u128 },

    /// Emitted when the pool's tracked collateral changes
    CollateralBalanceUpdated { balance: u128 },

    /// Emitted when community rewards are issued into the pool
    RewardIssued {
        amount: u128,
        total_issued: u128,
        timestamp: Timestamp,
    },
}

impl PoolEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::DepositChanged { .. } => EventType::DepositChanged,
            Self::DepositSnapshotUpdated { .. } => EventType::DepositSnapshotUpdated,
            Self::CollateralGainWithdrawn { .. } => EventType::CollateralGainWithdrawn,
            Self::RewardPaidToDepositor { .. } => EventType::RewardPaidToDepositor,
            Self::FrontEndRegistered { .. } => EventType::FrontEndRegistered,
            Self::FrontEndTagSet { .. } => EventType::FrontEndTagSet,
            Self::FrontEndStakeChanged { .. } => EventType::FrontEndStakeChanged,
            Self::FrontEndSnapshotUpdated { .. } => EventType::FrontEndSnapshotUpdated,
            Self::RewardPaidToFrontEnd { .. } => EventType::RewardPaidToFrontEnd,
            Self::ProductUpdated { .. } => EventType::ProductUpdated,
            Self::SumUpdated { .. } => EventType::SumUpdated,
            Self::RewardSumUpdated { .. } => EventType::RewardSumUpdated,
            Self::EpochUpdated { .. } => EventType::EpochUpdated,
            Self::ScaleUpdated { .. } => EventType::ScaleUpdated,
            Self::LiquidationOffset { .. } => EventType::LiquidationOffset,
            Self::TotalDepositsUpdated { .. } => EventType::TotalDepositsUpdated,
            Self::CollateralBalanceUpdated { .. } => EventType::CollateralBalanceUpdated,
            Self::RewardIssued { .. } => EventType::RewardIssued,
        }
    }

    /// Timestamp of the operation that emitted this event, if it carries one
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::DepositChanged { timestamp, .. }
            | Self::CollateralGainWithdrawn { timestamp, .. }
            | Self::RewardPaidToDepositor { timestamp, .. }
            | Self::FrontEndRegistered { timestamp, .. }
            | Self::FrontEndTagSet { timestamp, .. }
            | Self::FrontEndStakeChanged { timestamp, .. }
            | Self::RewardPaidToFrontEnd { timestamp, .. }
            | Self::LiquidationOffset { timestamp, .. }
            | Self::RewardIssued { timestamp, .. } => Some(*timestamp),
            _ => None,
        }
    }

    /// Serialize event to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<PoolEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: PoolEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<PoolEvent> {
        self.events
    }

    /// Drain all events, leaving the log empty
    pub fn take(&mut self) -> Vec<PoolEvent> {
        core::mem::take(&mut self.events)
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&PoolEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Discard events emitted after the log held `len` entries
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
