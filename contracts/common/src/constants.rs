//! Protocol Constants
//!
//! All magic numbers for the stability pool and its community issuance.
//!
//! Amounts are unsigned integers with 18 implied decimals.

/// Fixed-point precision
pub mod precision {
    /// One whole unit at 18 decimals (1.0 == 1e18)
    pub const DECIMAL_PRECISION: u128 = 1_000_000_000_000_000_000;

    /// Half a unit, used for round-half-up multiplication
    pub const HALF_DECIMAL_PRECISION: u128 = DECIMAL_PRECISION / 2;
}

/// Running product and scale parameters
pub mod stability_pool {
    /// Factor P is multiplied by when it is rescaled (1e9)
    pub const SCALE_FACTOR: u128 = 1_000_000_000;

    /// P is rescaled when its next value would fall below this (1e9)
    pub const RESCALE_THRESHOLD: u128 = 1_000_000_000;

    /// Initial value of P for every new epoch (1.0)
    pub const INITIAL_PRODUCT: u128 = super::precision::DECIMAL_PRECISION;

    /// Maximum front-end kickback rate (100%)
    pub const MAX_KICKBACK_RATE: u128 = super::precision::DECIMAL_PRECISION;
}

/// Community issuance schedule
pub mod issuance {
    use super::precision::DECIMAL_PRECISION;

    /// Seconds per issuance period
    pub const SECONDS_IN_ONE_MINUTE: u64 = 60;

    /// Total reward supply released to depositors over time (32 million)
    pub const SUPPLY_CAP: u128 = 32_000_000 * DECIMAL_PRECISION;

    /// Per-minute decay factor. Half of the supply is issued in the first year.
    pub const ISSUANCE_FACTOR: u128 = 999_998_681_227_695_000;

    /// Upper bound on the exponent passed to `dec_pow` (1000 years in minutes)
    pub const MAX_MINUTES: u64 = 525_600_000;
}

/// Persistence format
pub mod persistence {
    /// Current version byte written in front of encoded state
    pub const STATE_VERSION: u8 = 1;

    /// Length of the SHA-256 digest that prefixes encoded state
    pub const DIGEST_LEN: usize = 32;
}
