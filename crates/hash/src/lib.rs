//! Lookup-key derivation for export checks.
//!
//! Exports never contain raw IDs. Each record is keyed by a salted hash of
//! the ID, computed with the parameters recorded in the export's
//! `export_config.json`. Reproducing a key locally requires the exact same
//! algorithm, salt, cost parameters, **and** byte encoding of the ID: the
//! 64-bit ID is always hashed as its 8-byte little-endian representation.
//!
//! Two algorithms are supported:
//! - [`HashType::Argon2id`]: memory-hard, single lane, 32-byte output.
//! - [`HashType::Sha256`]: iterated feedback digest,
//!   `acc = salt; repeat n: acc = SHA256(id ‖ acc)`.

pub mod error;

use crate::error::{Error, ErrorKind, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Byte length of every digest produced by this crate.
pub const DIGEST_LEN: usize = 32;

/// Hash algorithm used to build an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    Argon2id,
    Sha256,
}
impl HashType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Argon2id => "argon2id",
            Self::Sha256 => "sha256",
        }
    }
}
impl FromStr for HashType {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "argon2id" => Self::Argon2id,
            "sha256" => Self::Sha256,
            _ => exn::bail!(ErrorKind::UnknownHashType(s.to_string())),
        })
    }
}
impl Display for HashType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// The full set of parameters needed to reproduce an export's lookup keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashParams {
    pub salt: String,
    pub hash_type: HashType,
    pub iterations: u32,
    /// Memory cost in mebibytes (only used by Argon2id).
    pub memory_mib: u32,
}
impl HashParams {
    /// Hash a single ID with these parameters.
    pub fn hash(&self, id: u64) -> Result<String> {
        hash_id(id, &self.salt, self.hash_type, self.iterations, self.memory_mib)
    }
}

/// Hash an ID into the lowercase hex lookup key used by exports.
///
/// ```
/// use rotten_hash::{HashType, hash_id};
///
/// let key = hash_id(12345, "test_salt", HashType::Sha256, 1, 1).unwrap();
/// assert_eq!(key, "ce3807a728757fad6c9eb6f3934c71363857bca5f8f9d7a67452543acf47ac42");
/// ```
pub fn hash_id(id: u64, salt: &str, hash_type: HashType, iterations: u32, memory_mib: u32) -> Result<String> {
    let id_bytes = id.to_le_bytes();
    let digest = match hash_type {
        HashType::Argon2id => argon2id(&id_bytes, salt.as_bytes(), iterations, memory_mib)?.to_vec(),
        HashType::Sha256 => iterated_sha256(&id_bytes, salt.as_bytes(), iterations),
    };
    Ok(hex::encode(digest))
}

fn argon2id(id_bytes: &[u8], salt: &[u8], iterations: u32, memory_mib: u32) -> Result<[u8; DIGEST_LEN]> {
    let memory_kib = memory_mib
        .checked_mul(1024)
        .ok_or_else(|| Error::from(ErrorKind::InvalidParameters("argon2id")))?;
    let params = Params::new(memory_kib, iterations, 1, Some(DIGEST_LEN))
        .or_raise(|| ErrorKind::InvalidParameters("argon2id"))?;
    let mut output = [0u8; DIGEST_LEN];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(id_bytes, salt, &mut output)
        .or_raise(|| ErrorKind::InvalidParameters("argon2id"))?;
    Ok(output)
}

fn iterated_sha256(id_bytes: &[u8], salt: &[u8], iterations: u32) -> Vec<u8> {
    // Zero iterations leaves the accumulator as the raw salt.
    let mut accumulator = salt.to_vec();
    for _ in 0..iterations {
        let mut hasher = Sha256::new();
        hasher.update(id_bytes);
        hasher.update(&accumulator);
        accumulator = hasher.finalize().to_vec();
    }
    accumulator
}
