//! Mathematical Utilities for the Stabilio stability pool
//!
//! Checked fixed-point arithmetic at 18 decimals. Products of two 18-decimal
//! quantities overflow `u128`, so intermediates are carried in a 256-bit
//! unsigned integer and narrowed back only when the result is known to fit.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{issuance, precision};
use crate::errors::{PoolError, PoolResult};

#[allow(clippy::assign_op_pattern, clippy::ptr_offset_with_cast, clippy::manual_range_contains)]
mod wide {
    uint::construct_uint! {
        /// 256-bit unsigned integer, four little-endian 64-bit limbs
        pub struct U256(4);
    }
}

pub use wide::U256;

// ============ Encoding ============

impl Serialize for U256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <[u64; 4] as Deserialize>::deserialize(deserializer).map(U256)
    }
}

impl BorshSerialize for U256 {
    fn serialize<W: borsh::io::Write>(&self, writer: &mut W) -> borsh::io::Result<()> {
        BorshSerialize::serialize(&self.0, writer)
    }
}

impl BorshDeserialize for U256 {
    fn deserialize_reader<R: borsh::io::Read>(reader: &mut R) -> borsh::io::Result<Self> {
        <[u64; 4] as BorshDeserialize>::deserialize_reader(reader).map(U256)
    }
}

// ============ Conversions ============

/// Widen a `u128` into a 256-bit intermediate
#[inline]
pub fn wide(x: u128) -> U256 {
    U256::from(x)
}

/// Narrow a 256-bit value back to `u128`, failing if it does not fit
#[inline]
pub fn narrow(x: U256) -> PoolResult<u128> {
    if x.bits() > 128 {
        return Err(PoolError::Overflow);
    }
    Ok(x.low_u128())
}

/// One whole unit as a 256-bit value
#[inline]
pub fn decimal_precision() -> U256 {
    wide(precision::DECIMAL_PRECISION)
}

// ============ Checked 256-bit Arithmetic ============

/// a + b
pub fn add_wide(a: U256, b: U256) -> PoolResult<U256> {
    a.checked_add(b).ok_or(PoolError::Overflow)
}

/// a - b
pub fn sub_wide(a: U256, b: U256) -> PoolResult<U256> {
    a.checked_sub(b).ok_or(PoolError::Underflow)
}

/// a * b
pub fn mul_wide(a: U256, b: U256) -> PoolResult<U256> {
    a.checked_mul(b).ok_or(PoolError::Overflow)
}

/// a / b, floored
pub fn div_wide(a: U256, b: U256) -> PoolResult<U256> {
    a.checked_div(b).ok_or(PoolError::DivisionByZero)
}

/// floor(a * b / d) with a 256-bit intermediate
pub fn mul_div(a: u128, b: u128, d: u128) -> PoolResult<u128> {
    narrow(div_wide(mul_wide(wide(a), wide(b))?, wide(d))?)
}

// ============ Checked u128 Arithmetic ============

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> PoolResult<u128> {
    a.checked_add(b).ok_or(PoolError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> PoolResult<u128> {
    a.checked_sub(b).ok_or(PoolError::Underflow)
}

// ============ Decimal Math ============

/// Multiply two 18-decimal values, rounding half up
///
/// `dec_mul(x, y) = (x * y + 0.5e18) / 1e18`
pub fn dec_mul(x: u128, y: u128) -> PoolResult<u128> {
    let product = mul_wide(wide(x), wide(y))?;
    let rounded = add_wide(product, wide(precision::HALF_DECIMAL_PRECISION))?;
    narrow(div_wide(rounded, decimal_precision())?)
}

/// Raise an 18-decimal `base` to an integer power by repeated squaring
///
/// The exponent is capped at [`issuance::MAX_MINUTES`], past which any base
/// below one has long since decayed to zero. Each multiplication rounds half
/// up, matching the reference issuance curve.
pub fn dec_pow(base: u128, minutes: u64) -> PoolResult<u128> {
    let mut n = minutes.min(issuance::MAX_MINUTES);

    if n == 0 {
        return Ok(precision::DECIMAL_PRECISION);
    }

    let mut y = precision::DECIMAL_PRECISION;
    let mut x = base;

    while n > 1 {
        if n % 2 == 0 {
            x = dec_mul(x, x)?;
            n /= 2;
        } else {
            y = dec_mul(x, y)?;
            x = dec_mul(x, x)?;
            n = (n - 1) / 2;
        }
    }

    dec_mul(x, y)
}
