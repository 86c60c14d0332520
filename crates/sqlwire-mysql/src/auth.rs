//! Authentication plugin implementations.
//!
//! Supported plugins:
//! - `mysql_native_password`: SHA1-based (MySQL < 8.0 default)
//! - `caching_sha2_password`: SHA256-based (MySQL 8.0+ default)
//! - `mysql_clear_password`: plaintext, only sensible over TLS
//!
//! # mysql_native_password
//!
//! ```text
//! SHA1(password) XOR SHA1(seed + SHA1(SHA1(password)))
//! ```
//!
//! # caching_sha2_password
//!
//! Fast path (server has the credential cached):
//! ```text
//! XOR(SHA256(password), SHA256(SHA256(SHA256(password)) + seed))
//! ```
//!
//! Full path requires either TLS (plaintext password over the encrypted
//! channel) or RSA encryption with the server's public key.

use sha1::Sha1;
use sha2::{Digest, Sha256};

use rand::rngs::OsRng;

use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;

use sqlwire_core::{Error, Result};

/// Well-known authentication plugin names.
pub mod plugins {
    /// SHA1-based authentication (legacy default)
    pub const MYSQL_NATIVE_PASSWORD: &str = "mysql_native_password";
    /// SHA256-based authentication (MySQL 8.0+ default)
    pub const CACHING_SHA2_PASSWORD: &str = "caching_sha2_password";
    /// RSA-based SHA256 authentication
    pub const SHA256_PASSWORD: &str = "sha256_password";
    /// Plaintext password (debugging/testing, or over TLS)
    pub const MYSQL_CLEAR_PASSWORD: &str = "mysql_clear_password";
}

/// Status bytes in caching_sha2_password AuthMoreData packets.
pub mod caching_sha2 {
    /// Client asks for the server's RSA public key
    pub const REQUEST_PUBLIC_KEY: u8 = 0x02;
    /// Fast auth succeeded; a final OK follows
    pub const FAST_AUTH_SUCCESS: u8 = 0x03;
    /// Full auth needed (TLS plaintext or RSA)
    pub const PERFORM_FULL_AUTH: u8 = 0x04;
}

/// Compute a `mysql_native_password` response.
///
/// `SHA1(password) XOR SHA1(seed + SHA1(SHA1(password)))`, where `seed` is
/// the first 20 bytes of the server scramble. Empty passwords produce an
/// empty response.
pub fn mysql_native_password(password: &str, auth_data: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return vec![];
    }

    let seed = if auth_data.len() > 20 {
        &auth_data[..20]
    } else {
        auth_data
    };

    let mut hasher = Sha1::new();
    hasher.update(password.as_bytes());
    let stage1: [u8; 20] = hasher.finalize().into();

    let mut hasher = Sha1::new();
    hasher.update(stage1);
    let stage2: [u8; 20] = hasher.finalize().into();

    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(stage2);
    let stage3: [u8; 20] = hasher.finalize().into();

    stage1
        .iter()
        .zip(stage3.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}

/// Compute a `caching_sha2_password` fast-auth response.
///
/// `XOR(SHA256(password), SHA256(SHA256(SHA256(password)) + seed))`.
/// Empty passwords produce an empty response.
pub fn caching_sha2_password(password: &str, auth_data: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return vec![];
    }

    // The server sends a 20-byte scramble plus a trailing NUL; strip it
    // only in that exact shape so valid 20-byte seeds pass through.
    let seed = if auth_data.len() == 21 && auth_data.last() == Some(&0) {
        &auth_data[..20]
    } else {
        auth_data
    };

    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    let password_hash: [u8; 32] = hasher.finalize().into();

    let mut hasher = Sha256::new();
    hasher.update(password_hash);
    let password_hash_hash: [u8; 32] = hasher.finalize().into();

    let mut hasher = Sha256::new();
    hasher.update(password_hash_hash);
    hasher.update(seed);
    let scramble: [u8; 32] = hasher.finalize().into();

    password_hash
        .iter()
        .zip(scramble.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}

/// Plaintext password response for `mysql_clear_password` (NUL-terminated).
pub fn clear_password(password: &str) -> Vec<u8> {
    let mut response = password.as_bytes().to_vec();
    response.push(0);
    response
}

/// RSA-encrypted password for full `caching_sha2_password` /
/// `sha256_password` authentication over an unencrypted channel.
///
/// The password (NUL-terminated) is XORed with the repeating seed and then
/// encrypted with the server's public key: OAEP padding for MySQL 8.0.5+
/// (`use_oaep`), PKCS1v1.5 for older servers.
pub fn rsa_encrypted_password(
    password: &str,
    seed: &[u8],
    public_key_pem: &[u8],
    use_oaep: bool,
) -> Result<Vec<u8>> {
    if seed.is_empty() {
        return Err(Error::protocol("empty auth seed for RSA password exchange"));
    }

    let mut pw = password.as_bytes().to_vec();
    pw.push(0);
    for (i, b) in pw.iter_mut().enumerate() {
        *b ^= seed[i % seed.len()];
    }

    let pem = std::str::from_utf8(public_key_pem)
        .map_err(|e| Error::protocol(format!("server public key is not valid PEM: {e}")))?;

    // Servers hand out either PKCS#8 or PKCS#1 encoded keys.
    let pub_key = RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| Error::protocol(format!("failed to parse server RSA public key: {e}")))?;

    let encrypted = if use_oaep {
        pub_key
            .encrypt(&mut OsRng, rsa::Oaep::new::<Sha1>(), &pw)
            .map_err(|e| Error::connection(format!("RSA OAEP encryption failed: {e}")))?
    } else {
        pub_key
            .encrypt(&mut OsRng, rsa::Pkcs1v15Encrypt, &pw)
            .map_err(|e| Error::connection(format!("RSA PKCS1v1.5 encryption failed: {e}")))?
    };

    Ok(encrypted)
}

/// XOR the password with the repeating seed, NUL-terminated.
///
/// Used when a full-auth exchange runs over TLS and the plaintext form is
/// acceptable on the wire.
pub fn xor_password_with_seed(password: &str, seed: &[u8]) -> Vec<u8> {
    let password_bytes = password.as_bytes();
    let mut result = Vec::with_capacity(password_bytes.len() + 1);

    for (i, &byte) in password_bytes.iter().enumerate() {
        let seed_byte = seed.get(i % seed.len()).copied().unwrap_or(0);
        result.push(byte ^ seed_byte);
    }
    result.push(0);

    result
}
