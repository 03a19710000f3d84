//! Encryption of credential payloads sent to the admin API.
//!
//! MinIO expects secrets in admin requests to be sealed with a key derived
//! from the caller's own secret key. Layout of the sealed payload:
//!
//! ```text
//! salt (32) | algorithm id (1) | nonce prefix (8) | fragment*
//! ```
//!
//! The key is Argon2id(secret key, salt). Plaintext is split into fragments
//! of at most 16 KiB, each sealed with AES-256-GCM under the nonce
//! `prefix | seq` (little-endian u32). Sequence 0 seals the empty message
//! and its tag becomes the stream's associated data: every fragment is
//! authenticated with `flag | tag`, where `flag` is `0x80` on the final
//! fragment and `0x00` otherwise. Data fragments are numbered from 1.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{AdminError, AdminResult};

const SALT_SIZE: usize = 32;
const NONCE_PREFIX_SIZE: usize = 8;
const KEY_SIZE: usize = 32;
const TAG_SIZE: usize = 16;
const HEADER_SIZE: usize = SALT_SIZE + 1 + NONCE_PREFIX_SIZE;

/// Plaintext bytes per sealed fragment.
const FRAGMENT_SIZE: usize = 1 << 14;

/// Algorithm id for Argon2id key derivation + AES-256-GCM.
const ARGON2ID_AES_GCM: u8 = 0x00;

const FINAL_FLAG: u8 = 0x80;

// Argon2id cost parameters expected by the server.
const ARGON2_MEMORY_KIB: u32 = 64 * 1024;
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_LANES: u32 = 4;

/// Seal `data` for the admin API using `password` as key material.
pub fn encrypt_data(password: &str, data: &[u8]) -> AdminResult<Vec<u8>> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    let mut nonce_prefix = [0u8; NONCE_PREFIX_SIZE];
    OsRng.fill_bytes(&mut nonce_prefix);

    let key = derive_key(password, &salt)?;
    seal(&key, &salt, &nonce_prefix, data)
}

fn seal(
    key: &[u8; KEY_SIZE],
    salt: &[u8; SALT_SIZE],
    nonce_prefix: &[u8; NONCE_PREFIX_SIZE],
    data: &[u8],
) -> AdminResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| AdminError::Encryption(format!("invalid key: {e}")))?;

    let fragments: Vec<&[u8]> = if data.is_empty() {
        vec![data]
    } else {
        data.chunks(FRAGMENT_SIZE).collect()
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + data.len() + TAG_SIZE * fragments.len());
    out.extend_from_slice(salt);
    out.push(ARGON2ID_AES_GCM);
    out.extend_from_slice(nonce_prefix);

    let mut aad = [0u8; 1 + TAG_SIZE];
    aad[1..].copy_from_slice(&seal_fragment(&cipher, nonce_prefix, 0, b"", &[])?);

    let last = fragments.len() - 1;
    for (i, fragment) in fragments.into_iter().enumerate() {
        let seq = u32::try_from(i + 1)
            .map_err(|_| AdminError::Encryption("payload too large".to_string()))?;
        if i == last {
            aad[0] = FINAL_FLAG;
        }
        out.extend_from_slice(&seal_fragment(&cipher, nonce_prefix, seq, fragment, &aad)?);
    }

    Ok(out)
}

fn seal_fragment(
    cipher: &Aes256Gcm,
    nonce_prefix: &[u8; NONCE_PREFIX_SIZE],
    seq: u32,
    msg: &[u8],
    aad: &[u8],
) -> AdminResult<Vec<u8>> {
    cipher
        .encrypt(
            Nonce::from_slice(&fragment_nonce(nonce_prefix, seq)),
            Payload { msg, aad },
        )
        .map_err(|e| AdminError::Encryption(e.to_string()))
}

fn derive_key(password: &str, salt: &[u8]) -> AdminResult<[u8; KEY_SIZE]> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_LANES,
        Some(KEY_SIZE),
    )
    .map_err(|e| AdminError::Encryption(format!("invalid argon2 parameters: {e}")))?;

    let mut key = [0u8; KEY_SIZE];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| AdminError::Encryption(format!("key derivation failed: {e}")))?;
    Ok(key)
}

fn fragment_nonce(prefix: &[u8; NONCE_PREFIX_SIZE], seq: u32) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[..NONCE_PREFIX_SIZE].copy_from_slice(prefix);
    nonce[NONCE_PREFIX_SIZE..].copy_from_slice(&seq.to_le_bytes());
    nonce
}
