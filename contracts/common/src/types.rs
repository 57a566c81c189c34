//! Core Types for the Stabilio stability pool
//!
//! Fundamental identifiers and value types shared by the pool crates.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Type alias for account addresses (32-byte hash)
pub type Address = [u8; 32];

/// Token amount with 18 implied decimals
pub type Amount = u128;

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// The all-zero address, never a valid participant
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Assets the pool moves through the external ledger
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum Asset {
    /// The stable token depositors lock in the pool
    Stable = 0,
    /// Collateral received from liquidations
    Collateral = 1,
    /// Community-issued reward token
    Reward = 2,
}

impl Asset {
    /// Short ticker used in log lines
    pub fn ticker(&self) -> &'static str {
        match self {
            Self::Stable => "STABLE",
            Self::Collateral => "COLL",
            Self::Reward => "REWARD",
        }
    }
}

/// Direction of a ledger movement, seen from the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum TransferDirection {
    /// From an account into the pool
    In,
    /// From the pool out to an account
    Out,
}

/// A single movement of value between the pool and an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Transfer {
    /// Asset being moved
    pub asset: Asset,
    /// Counterparty account
    pub account: Address,
    /// Amount moved
    pub amount: Amount,
    /// Direction relative to the pool
    pub direction: TransferDirection,
}

impl Transfer {
    /// Transfer from `account` into the pool
    pub fn inbound(asset: Asset, account: Address, amount: Amount) -> Self {
        Self { asset, account, amount, direction: TransferDirection::In }
    }

    /// Transfer from the pool to `account`
    pub fn outbound(asset: Asset, account: Address, amount: Amount) -> Self {
        Self { asset, account, amount, direction: TransferDirection::Out }
    }

    /// The movement that undoes this one
    pub fn reversed(&self) -> Self {
        let direction = match self.direction {
            TransferDirection::In => TransferDirection::Out,
            TransferDirection::Out => TransferDirection::In,
        };
        Self { direction, ..self.clone() }
    }
}
