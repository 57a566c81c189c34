//! Shared access
//!
//! [`SharedStabilityPool`] serializes every operation on one pool behind a
//! mutex so hosts can hand clones of the handle to several threads. Each
//! operation holds the lock until its transfers have settled or been
//! rolled back, giving all operations a single total order.

use std::sync::{Arc, Mutex, MutexGuard};

use stabilio_common::{
    errors::{PoolError, PoolResult},
    events::PoolEvent,
    types::{Address, Timestamp},
};

use crate::ledger::AssetLedger;
use crate::pool::{
    DepositRequest, DepositResult, OffsetRequest, OffsetResult, StabilityPool, WithdrawRequest,
    WithdrawResult,
};

/// Cloneable handle to a pool shared between threads
///
/// A ledger passed to an operation runs while the lock is held and must not
/// call back into the same handle.
#[derive(Debug, Clone)]
pub struct SharedStabilityPool {
    inner: Arc<Mutex<StabilityPool>>,
}

impl SharedStabilityPool {
    pub fn new(pool: StabilityPool) -> Self {
        Self { inner: Arc::new(Mutex::new(pool)) }
    }

    fn lock(&self) -> PoolResult<MutexGuard<'_, StabilityPool>> {
        self.inner.lock().map_err(|_| {
            log::warn!("stability pool lock poisoned");
            PoolError::StateLockPoisoned
        })
    }

    /// Run a read-only query against committed state
    pub fn read<T>(&self, f: impl FnOnce(&StabilityPool) -> T) -> PoolResult<T> {
        let pool = self.lock()?;
        Ok(f(&pool))
    }

    pub fn offset(&self, request: &OffsetRequest) -> PoolResult<OffsetResult> {
        self.lock()?.offset(request)
    }

    pub fn deposit<L: AssetLedger + ?Sized>(
        &self,
        ledger: &mut L,
        request: &DepositRequest,
    ) -> PoolResult<DepositResult> {
        self.lock()?.deposit(ledger, request)
    }

    pub fn withdraw<L: AssetLedger + ?Sized>(
        &self,
        ledger: &mut L,
        request: &WithdrawRequest,
    ) -> PoolResult<WithdrawResult> {
        self.lock()?.withdraw(ledger, request)
    }

    pub fn claim_gains<L: AssetLedger + ?Sized>(
        &self,
        ledger: &mut L,
        depositor: &Address,
        timestamp: Timestamp,
    ) -> PoolResult<WithdrawResult> {
        self.lock()?.claim_gains(ledger, depositor, timestamp)
    }

    pub fn register_front_end(
        &self,
        front_end: &Address,
        kickback_rate: u128,
        timestamp: Timestamp,
    ) -> PoolResult<()> {
        self.lock()?.register_front_end(front_end, kickback_rate, timestamp)
    }

    pub fn trigger_issuance(&self, timestamp: Timestamp) -> PoolResult<u128> {
        self.lock()?.trigger_issuance(timestamp)
    }

    pub fn compounded_deposit(&self, depositor: &Address) -> PoolResult<u128> {
        self.lock()?.compounded_deposit(depositor)
    }

    pub fn total_deposits(&self) -> PoolResult<u128> {
        self.read(|pool| pool.total_deposits())
    }

    pub fn take_events(&self) -> PoolResult<Vec<PoolEvent>> {
        Ok(self.lock()?.take_events())
    }
}
