//! Asset ledger seam
//!
//! The pool never holds balances of its own; every movement of stable
//! tokens, collateral or rewards goes through an [`AssetLedger`] supplied by
//! the host. Transfers of an operation run after its accounting is
//! committed, and a failed batch is unwound in reverse order.

use std::collections::BTreeMap;

use stabilio_common::{
    errors::{PoolError, PoolResult},
    math::{safe_add, safe_sub},
    types::{Address, Asset, Transfer, TransferDirection},
};

/// External token movements performed on behalf of the pool
pub trait AssetLedger {
    /// Move `amount` of `asset` from `from` into the pool
    fn transfer_in(&mut self, asset: Asset, from: &Address, amount: u128) -> PoolResult<()>;

    /// Move `amount` of `asset` from the pool to `to`
    fn transfer_out(&mut self, asset: Asset, to: &Address, amount: u128) -> PoolResult<()>;
}

fn execute<L: AssetLedger + ?Sized>(ledger: &mut L, transfer: &Transfer) -> PoolResult<()> {
    match transfer.direction {
        TransferDirection::In => ledger.transfer_in(transfer.asset, &transfer.account, transfer.amount),
        TransferDirection::Out => ledger.transfer_out(transfer.asset, &transfer.account, transfer.amount),
    }
}

/// Run `transfers` in order, skipping zero amounts
///
/// On the first failure the transfers already made are reversed, last
/// first, and the failure is returned.
pub fn settle<L: AssetLedger + ?Sized>(ledger: &mut L, transfers: &[Transfer]) -> PoolResult<()> {
    for (index, transfer) in transfers.iter().enumerate() {
        if transfer.amount == 0 {
            continue;
        }
        log::trace!(
            "{:?} {} {} for {:02x?}",
            transfer.direction,
            transfer.amount,
            transfer.asset.ticker(),
            &transfer.account[..4]
        );
        if let Err(err) = execute(ledger, transfer) {
            unwind(ledger, &transfers[..index]);
            return Err(err);
        }
    }
    Ok(())
}

fn unwind<L: AssetLedger + ?Sized>(ledger: &mut L, completed: &[Transfer]) {
    for transfer in completed.iter().rev().filter(|t| t.amount > 0) {
        if let Err(err) = execute(ledger, &transfer.reversed()) {
            log::warn!("could not reverse {:?}: {err}", transfer);
        }
    }
}

// ============ In-Memory Ledger ============

/// Ledger keeping balances in memory
///
/// Balances of the pool itself are tracked separately from accounts so the
/// pool's holdings can be reconciled against its own accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryLedger {
    accounts: BTreeMap<(Asset, Address), u128>,
    pool: BTreeMap<Asset, u128>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `amount` of `asset` to `account`
    pub fn credit(&mut self, asset: Asset, account: Address, amount: u128) -> PoolResult<()> {
        let balance = self.accounts.entry((asset, account)).or_default();
        *balance = safe_add(*balance, amount)?;
        Ok(())
    }

    /// Mint `amount` of `asset` directly to the pool
    pub fn credit_pool(&mut self, asset: Asset, amount: u128) -> PoolResult<()> {
        let balance = self.pool.entry(asset).or_default();
        *balance = safe_add(*balance, amount)?;
        Ok(())
    }

    /// Balance of `account`
    pub fn balance(&self, asset: Asset, account: &Address) -> u128 {
        self.accounts.get(&(asset, *account)).copied().unwrap_or(0)
    }

    /// Balance held by the pool
    pub fn pool_balance(&self, asset: Asset) -> u128 {
        self.pool.get(&asset).copied().unwrap_or(0)
    }

    // Empty balances are dropped so equal holdings compare equal
    fn set_balance(&mut self, asset: Asset, account: &Address, amount: u128) {
        if amount == 0 {
            self.accounts.remove(&(asset, *account));
        } else {
            self.accounts.insert((asset, *account), amount);
        }
    }

    fn set_pool_balance(&mut self, asset: Asset, amount: u128) {
        if amount == 0 {
            self.pool.remove(&asset);
        } else {
            self.pool.insert(asset, amount);
        }
    }
}

impl AssetLedger for InMemoryLedger {
    fn transfer_in(&mut self, asset: Asset, from: &Address, amount: u128) -> PoolResult<()> {
        let failed = PoolError::TransferFailed { asset, account: *from, amount };
        let available = self.balance(asset, from);
        let remaining = safe_sub(available, amount).map_err(|_| failed.clone())?;
        let pool_total = safe_add(self.pool_balance(asset), amount).map_err(|_| failed)?;

        self.set_balance(asset, from, remaining);
        self.set_pool_balance(asset, pool_total);
        Ok(())
    }

    fn transfer_out(&mut self, asset: Asset, to: &Address, amount: u128) -> PoolResult<()> {
        let failed = PoolError::TransferFailed { asset, account: *to, amount };
        let remaining = safe_sub(self.pool_balance(asset), amount).map_err(|_| failed.clone())?;
        let received = safe_add(self.balance(asset, to), amount).map_err(|_| failed)?;

        self.set_pool_balance(asset, remaining);
        self.set_balance(asset, to, received);
        Ok(())
    }
}
