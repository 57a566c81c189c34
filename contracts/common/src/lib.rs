//! Stabilio Common Library
//!
//! Shared types, constants, and utilities for the Stabilio stability pool.
//! This crate provides the fixed-point foundation the pool is built on.
//!
//! ## Contents
//!
//! - **Constants**: Decimal precision, scale factor, issuance parameters
//! - **Errors**: Typed [`PoolError`] with stable error codes
//! - **Math**: 256-bit intermediates, checked fixed-point helpers, `dec_pow`
//! - **Types**: Addresses, amounts, assets moved through the ledger
//! - **Events**: Indexable pool events and an in-memory event log
//!
//! This crate is `no_std` compatible when built without the `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export Vec for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::vec::Vec;
#[cfg(feature = "std")]
pub use std::vec::Vec;

pub mod constants;
pub mod errors;
pub mod events;
pub mod math;
pub mod types;

pub use constants::*;
pub use errors::*;
pub use events::*;
pub use math::*;
pub use types::*;
