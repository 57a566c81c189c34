//! Error Types for the Stabilio stability pool
//!
//! Typed errors with stable codes for logging and off-chain indexing.

use crate::types::{Address, Asset};

/// Result type alias for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

/// Main error enum for all stability pool errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    // ============ Amount Errors ============
    /// Zero amount not allowed
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Debt to absorb exceeds the stable tokens held by the pool
    #[error("pool holds {available} but {required} is required")]
    InsufficientPoolBalance { available: u128, required: u128 },

    // ============ Deposit Errors ============
    /// Deposit not found for depositor
    #[error("no deposit found for {depositor:02x?}")]
    DepositNotFound { depositor: Address },

    /// Address already holds a deposit
    #[error("{depositor:02x?} already holds a deposit")]
    DepositAlreadyExists { depositor: Address },

    // ============ Front End Errors ============
    /// Registered front ends may not deposit
    #[error("front end {front_end:02x?} cannot deposit")]
    FrontEndCannotDeposit { front_end: Address },

    /// Tag points to an address that is not a registered front end
    #[error("front end {front_end:02x?} is not registered")]
    FrontEndNotRegistered { front_end: Address },

    /// Front end registered twice
    #[error("front end {front_end:02x?} is already registered")]
    FrontEndAlreadyRegistered { front_end: Address },

    /// Kickback rate above 100%
    #[error("kickback rate {rate} exceeds maximum {maximum}")]
    InvalidKickbackRate { rate: u128, maximum: u128 },

    // ============ Authorization Errors ============
    /// Caller is not authorized for this operation
    #[error("caller {actual:02x?} is not authorized, expected {expected:02x?}")]
    Unauthorized { expected: Address, actual: Address },

    // ============ Ledger Errors ============
    /// External ledger refused a movement
    #[error("transfer of {amount} {asset:?} for {account:02x?} failed")]
    TransferFailed { asset: Asset, account: Address, amount: u128 },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow occurred
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Running product reached zero without an epoch change
    #[error("running product collapsed to zero")]
    ProductCollapsed,

    // ============ Configuration Errors ============
    /// Invalid configuration parameter
    #[error("invalid config `{param}`: {reason}")]
    InvalidConfig { param: &'static str, reason: &'static str },

    /// Configuration could not be decoded
    #[error("malformed config encoding")]
    MalformedConfig,

    // ============ State Errors ============
    /// Persisted state failed its integrity check or could not be decoded
    #[error("corrupt pool state: {reason}")]
    CorruptState { reason: &'static str },

    /// Persisted state was written by an unknown format version
    #[error("unsupported state version {found}, expected {expected}")]
    UnsupportedVersion { found: u8, expected: u8 },

    /// Shared pool lock was poisoned by a panicking holder
    #[error("pool state lock poisoned")]
    StateLockPoisoned,
}

impl PoolError {
    /// Returns a human-readable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "E014_ZERO_AMOUNT",
            Self::InsufficientPoolBalance { .. } => "E050_POOL_INSUFFICIENT",
            Self::DepositNotFound { .. } => "E051_DEPOSIT_NOT_FOUND",
            Self::DepositAlreadyExists { .. } => "E053_DEPOSIT_EXISTS",
            Self::FrontEndCannotDeposit { .. } => "E055_FRONT_END_DEPOSIT",
            Self::FrontEndNotRegistered { .. } => "E056_FRONT_END_UNKNOWN",
            Self::FrontEndAlreadyRegistered { .. } => "E057_FRONT_END_EXISTS",
            Self::InvalidKickbackRate { .. } => "E058_INVALID_KICKBACK",
            Self::Unauthorized { .. } => "E020_UNAUTHORIZED",
            Self::TransferFailed { .. } => "E070_TRANSFER_FAILED",
            Self::Overflow => "E080_OVERFLOW",
            Self::Underflow => "E081_UNDERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
            Self::ProductCollapsed => "E083_PRODUCT_ZERO",
            Self::InvalidConfig { .. } => "E090_INVALID_CONFIG",
            Self::MalformedConfig => "E091_MALFORMED_CONFIG",
            Self::CorruptState { .. } => "E100_CORRUPT_STATE",
            Self::UnsupportedVersion { .. } => "E101_UNSUPPORTED_VERSION",
            Self::StateLockPoisoned => "E102_LOCK_POISONED",
        }
    }

    /// Returns true if this error is recoverable (caller can fix it and retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ZeroAmount => true,
            Self::TransferFailed { .. } => true, // Fund the account
            Self::FrontEndNotRegistered { .. } => true,
            Self::InsufficientPoolBalance { .. } => true, // Smaller offset
            _ => false,
        }
    }
}
