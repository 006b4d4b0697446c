//! # Key Encoding
//!
//! Hex never contains `:`, so `job:<hex>:` never prefixes another group's keys.

use crate::domain::entities::JobId;
use crate::domain::errors::KVStoreError;
use shared_types::GroupId;

pub const JOB_PREFIX: &[u8] = b"job:";
pub const INDEX_PREFIX: &[u8] = b"idx:";
pub const COUNT_PREFIX: &[u8] = b"cnt:";
pub const NEXT_JOB_ID_KEY: &[u8] = b"meta:next_job_id";

/// `job:<hex group>:` prefix for a group-ordered scan.
pub fn group_prefix(group_id: &GroupId) -> Vec<u8> {
    let hex = group_id.to_hex();
    let mut key = Vec::with_capacity(JOB_PREFIX.len() + hex.len() + 1);
    key.extend_from_slice(JOB_PREFIX);
    key.extend_from_slice(hex.as_bytes());
    key.push(b':');
    key
}

/// `job:<hex group>:<id BE>`.
pub fn job_key(group_id: &GroupId, id: JobId) -> Vec<u8> {
    let mut key = group_prefix(group_id);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// `idx:<id BE>`.
pub fn index_key(id: JobId) -> Vec<u8> {
    let mut key = Vec::with_capacity(INDEX_PREFIX.len() + 8);
    key.extend_from_slice(INDEX_PREFIX);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// `cnt:<hex group>`.
pub fn count_key(group_id: &GroupId) -> Vec<u8> {
    let mut key = COUNT_PREFIX.to_vec();
    key.extend_from_slice(group_id.to_hex().as_bytes());
    key
}

/// Recover the group id from a `cnt:` key.
pub fn group_from_count_key(key: &[u8]) -> Result<GroupId, KVStoreError> {
    let hex = key
        .strip_prefix(COUNT_PREFIX)
        .and_then(|rest| std::str::from_utf8(rest).ok())
        .ok_or_else(|| KVStoreError::CorruptionError {
            message: "malformed count key".to_string(),
        })?;
    GroupId::from_hex(hex).map_err(|e| KVStoreError::CorruptionError {
        message: e.to_string(),
    })
}

pub fn encode_u64(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn decode_u64(bytes: &[u8]) -> Result<u64, KVStoreError> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| KVStoreError::CorruptionError {
        message: format!("expected 8-byte counter, got {} bytes", bytes.len()),
    })?;
    Ok(u64::from_be_bytes(arr))
}
