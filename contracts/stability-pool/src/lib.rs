//! Stability Pool
//!
//! First line of defense against undercollateralized debt. Depositors lock
//! stable tokens that are burned to cancel liquidated debt, and in return
//! receive the liquidated collateral pro rata, plus community rewards.
//!
//! ## Scalable Distribution
//!
//! Liquidations never iterate over depositors. The pool keeps a running
//! product `P` and cumulative sums `S` (collateral) and `G` (rewards), keyed
//! by epoch and scale; each deposit stores a snapshot of them and derives
//! its compounded balance and gains on demand:
//!
//! - compounded deposit = `initial * P / P_snapshot`
//! - collateral gain = `initial * (S - S_snapshot) / P_snapshot`
//!
//! ## Modules
//!
//! - [`accumulator`]: `P`, `S`, `G`, epoch and scale
//! - [`deposit`]: depositor records and compounding
//! - [`front_end`]: front-end registration and reward kickbacks
//! - [`issuance`]: community reward schedule
//! - [`ledger`]: the transfer seam to the host's token ledgers
//! - [`pool`]: public operations
//! - [`persistence`]: integrity-checked state encoding
//! - [`sync`]: thread-safe shared handle

pub mod accumulator;
pub mod config;
pub mod deposit;
pub mod front_end;
pub mod issuance;
pub mod ledger;
pub mod persistence;
pub mod pool;
pub mod sync;

#[cfg(test)]
mod integration_tests;

pub use config::{IssuanceConfig, PoolConfig, PrecisionConfig};
pub use ledger::{AssetLedger, InMemoryLedger};
pub use pool::{
    DepositRequest, DepositResult, OffsetRequest, OffsetResult, RealizedGains, StabilityPool,
    WithdrawRequest, WithdrawResult,
};
pub use sync::SharedStabilityPool;

pub use stabilio_common::{
    errors::{PoolError, PoolResult},
    events::{EventType, PoolEvent},
    types::{Address, Asset},
};
