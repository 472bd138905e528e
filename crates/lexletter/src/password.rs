// Password hashing.
//
// scrypt with a random 16-byte salt; stored as `hex(salt):hex(key)`.
// Verification derives the key again and compares in constant time.

use anyhow::anyhow;
use lexletter_core::error::{Error, Result};
use rand::RngCore;
use scrypt::{scrypt, Params};
use subtle::ConstantTimeEq;

// Interactive-login cost profile: N = 2^15, r = 8, p = 1, 32-byte key.
const LOG_N: u8 = 15;
const R: u32 = 8;
const P: u32 = 1;
const KEY_LEN: usize = 32;

/// Hash a password, returning `salt:key` with both parts hex-encoded.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);
    let key = derive_key(password, &salt_hex)?;
    Ok(format!("{salt_hex}:{}", hex::encode(key)))
}

/// Verify a password against a hash produced by [`hash_password`].
pub fn verify_password(hash: &str, password: &str) -> Result<bool> {
    let (salt, key_hex) = hash
        .split_once(':')
        .ok_or_else(|| Error::Internal(anyhow!("malformed password hash")))?;
    let expected =
        hex::decode(key_hex).map_err(|e| Error::Internal(anyhow!("malformed password hash: {e}")))?;
    let derived = derive_key(password, salt)?;
    Ok(bool::from(derived.as_slice().ct_eq(expected.as_slice())))
}

fn derive_key(password: &str, salt: &str) -> Result<Vec<u8>> {
    let params =
        Params::new(LOG_N, R, P, KEY_LEN).map_err(|e| Error::Internal(anyhow!("scrypt params: {e}")))?;
    let mut key = vec![0u8; KEY_LEN];
    scrypt(password.as_bytes(), salt.as_bytes(), &params, &mut key)
        .map_err(|e| Error::Internal(anyhow!("scrypt: {e}")))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_format_and_verify() {
        let hash = hash_password("Correct-Horse1").unwrap();
        let (salt, key) = hash.split_once(':').unwrap();
        assert_eq!(salt.len(), 32); // 16 bytes hex
        assert_eq!(key.len(), KEY_LEN * 2);

        assert!(verify_password(&hash, "Correct-Horse1").unwrap());
        assert!(!verify_password(&hash, "wrong-password").unwrap());
    }

    #[test]
    fn test_salts_differ_between_calls() {
        let h1 = hash_password("Same-Password1").unwrap();
        let h2 = hash_password("Same-Password1").unwrap();
        assert_ne!(h1, h2);
        assert!(verify_password(&h1, "Same-Password1").unwrap());
        assert!(verify_password(&h2, "Same-Password1").unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("no-separator", "pw").is_err());
        assert!(verify_password("salt:not-hex!", "pw").is_err());
    }
}
