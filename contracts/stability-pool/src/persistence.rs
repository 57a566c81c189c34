//! State persistence
//!
//! The full pool state is written as a versioned borsh body prefixed with
//! the SHA-256 digest of that body:
//!
//! ```text
//! [ digest: 32 bytes ][ version: 1 byte ][ borsh payload ]
//! ```
//!
//! Maps are ordered, so equal pools always encode to equal bytes and the
//! digest doubles as a commitment to the pool state. Pending events are not
//! persisted.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

use stabilio_common::{
    constants::persistence::{DIGEST_LEN, STATE_VERSION},
    errors::{PoolError, PoolResult},
    events::EventLog,
    types::Address,
};

use crate::accumulator::GlobalAccumulator;
use crate::config::PoolConfig;
use crate::deposit::DepositorRecord;
use crate::front_end::FrontEnd;
use crate::issuance::CommunityIssuance;
use crate::pool::StabilityPool;

/// Payload layout; field order is the wire order
#[derive(BorshDeserialize)]
struct PersistedPool {
    config: PoolConfig,
    accumulator: GlobalAccumulator,
    issuance: CommunityIssuance,
    total_deposits: u128,
    collateral_balance: u128,
    deposits: BTreeMap<Address, DepositorRecord>,
    front_ends: BTreeMap<Address, FrontEnd>,
}

fn write_field<T: BorshSerialize>(body: &mut Vec<u8>, field: &T) -> PoolResult<()> {
    borsh::to_writer(body, field).map_err(|_| PoolError::CorruptState { reason: "encoding failed" })
}

fn encode_body(pool: &StabilityPool) -> PoolResult<Vec<u8>> {
    let mut body = vec![STATE_VERSION];
    write_field(&mut body, &pool.config)?;
    write_field(&mut body, &pool.accumulator)?;
    write_field(&mut body, &pool.issuance)?;
    write_field(&mut body, &pool.total_deposits)?;
    write_field(&mut body, &pool.collateral_balance)?;
    write_field(&mut body, &pool.deposits)?;
    write_field(&mut body, &pool.front_ends)?;
    Ok(body)
}

fn digest(body: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(body);
    let result = hasher.finalize();
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&result);
    out
}

/// Encode the complete pool state
pub fn encode(pool: &StabilityPool) -> PoolResult<Vec<u8>> {
    let body = encode_body(pool)?;
    let mut out = Vec::with_capacity(DIGEST_LEN + body.len());
    out.extend_from_slice(&digest(&body));
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a pool written by [`encode`], verifying digest, version and config
pub fn decode(bytes: &[u8]) -> PoolResult<StabilityPool> {
    if bytes.len() <= DIGEST_LEN {
        return Err(PoolError::CorruptState { reason: "truncated" });
    }
    let (expected, body) = bytes.split_at(DIGEST_LEN);
    if digest(body).as_slice() != expected {
        log::warn!("rejecting persisted pool state: digest mismatch");
        return Err(PoolError::CorruptState { reason: "digest mismatch" });
    }

    let version = body[0];
    if version != STATE_VERSION {
        return Err(PoolError::UnsupportedVersion { found: version, expected: STATE_VERSION });
    }

    let persisted: PersistedPool = borsh::from_slice(&body[1..])
        .map_err(|_| PoolError::CorruptState { reason: "malformed payload" })?;
    persisted.config.validate()?;
    check_consistency(&persisted)?;

    Ok(StabilityPool {
        config: persisted.config,
        accumulator: persisted.accumulator,
        issuance: persisted.issuance,
        total_deposits: persisted.total_deposits,
        collateral_balance: persisted.collateral_balance,
        deposits: persisted.deposits,
        front_ends: persisted.front_ends,
        events: EventLog::new(),
    })
}

fn check_consistency(persisted: &PersistedPool) -> PoolResult<()> {
    let acc = &persisted.accumulator;
    if acc.product_p() == 0 {
        return Err(PoolError::CorruptState { reason: "zero running product" });
    }

    for (address, record) in &persisted.deposits {
        if record.depositor != *address {
            return Err(PoolError::CorruptState { reason: "record keyed by wrong address" });
        }
        if record.initial_value == 0 || record.snapshot.p == 0 {
            return Err(PoolError::CorruptState { reason: "empty deposit record" });
        }
        if record.snapshot.epoch > acc.current_epoch() {
            return Err(PoolError::CorruptState { reason: "snapshot from a future epoch" });
        }
        if let Some(tag) = record.front_end {
            if !persisted.front_ends.contains_key(&tag) {
                return Err(PoolError::CorruptState { reason: "unknown front end tag" });
            }
        }
    }
    Ok(())
}

impl StabilityPool {
    /// SHA-256 commitment to the complete pool state
    pub fn state_digest(&self) -> PoolResult<[u8; 32]> {
        Ok(digest(&encode_body(self)?))
    }
}
