//! Passphrase-based key derivation
//!
//! This is the PBKDF2 construction of RFC 2898 with one deliberate
//! difference: each output block is the result of the *last* PRF round, not
//! the XOR of all rounds. Tokens already in the field were provisioned with
//! this variant, so it must be reproduced exactly.
//!
//! Derivation works in a scratch buffer owned by this module and only copies
//! into the caller's output once every block has been computed.

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{ConfigError, Result};

/// Iteration count used for token keys
pub const PBKDF2_ITERATIONS: u32 = 1024;

/// Salt length used for token keys
pub const SALT_LEN: usize = 8;

/// Size of the per-block working buffer
///
/// Both `salt.len() + 4` and the PRF digest must fit, which caps the salt
/// at 252 bytes.
pub const BLOCK_CAPACITY: usize = 256;

/// SHA-1 digest size
pub const SHA1_DIGEST_SIZE: usize = 20;

type HmacSha1Mac = Hmac<Sha1>;

/// Pseudorandom function plugged into [`pbkdf2`]
pub trait Prf {
    /// Number of bytes `compute` produces
    fn digest_size(&self) -> usize;

    /// Compute `PRF(key, text)` into `out[..digest_size()]`
    fn compute(&self, key: &[u8], text: &[u8], out: &mut [u8]) -> Result<()>;
}

/// HMAC-SHA-1, the default PRF
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha1;

impl Prf for HmacSha1 {
    fn digest_size(&self) -> usize {
        SHA1_DIGEST_SIZE
    }

    fn compute(&self, key: &[u8], text: &[u8], out: &mut [u8]) -> Result<()> {
        if out.len() < SHA1_DIGEST_SIZE {
            return Err(ConfigError::InvalidValue.into());
        }
        let digest = hmac_sha1(key, text)?;
        out[..SHA1_DIGEST_SIZE].copy_from_slice(&digest);
        Ok(())
    }
}

/// HMAC-SHA-1 of `text` under `key`
pub fn hmac_sha1(key: &[u8], text: &[u8]) -> Result<[u8; SHA1_DIGEST_SIZE]> {
    let mut mac =
        HmacSha1Mac::new_from_slice(key).map_err(|_| ConfigError::InvalidValue)?;
    mac.update(text);
    let mut digest = [0u8; SHA1_DIGEST_SIZE];
    digest.copy_from_slice(mac.finalize().into_bytes().as_slice());
    Ok(digest)
}

/// Fill `out` with key material derived from `passphrase` and `salt`
///
/// Block `i` (1-based) starts as `salt || be32(i)` and is replaced by
/// `PRF(passphrase, block)` `iterations` times; the final value is the
/// block's output. The last block is truncated to the bytes remaining.
///
/// Fails without touching `out` when `salt.len() + 4` or the PRF digest size
/// exceeds [`BLOCK_CAPACITY`].
pub fn pbkdf2<P: Prf + ?Sized>(
    passphrase: &[u8],
    salt: &[u8],
    iterations: u32,
    out: &mut [u8],
    prf: &P,
) -> Result<()> {
    let digest_size = prf.digest_size();
    if salt.len() + 4 > BLOCK_CAPACITY || digest_size > BLOCK_CAPACITY || digest_size == 0 {
        return Err(ConfigError::InvalidValue.into());
    }

    let mut derived = alloc::vec![0u8; out.len()];
    let mut block = [0u8; BLOCK_CAPACITY];
    let mut scratch = [0u8; BLOCK_CAPACITY];

    for (index, chunk) in derived.chunks_mut(digest_size).enumerate() {
        let block_index = (index as u32) + 1;
        block[..salt.len()].copy_from_slice(salt);
        block[salt.len()..salt.len() + 4].copy_from_slice(&block_index.to_be_bytes());
        let mut block_len = salt.len() + 4;

        for _ in 0..iterations {
            prf.compute(passphrase, &block[..block_len], &mut scratch)?;
            block[..digest_size].copy_from_slice(&scratch[..digest_size]);
            block_len = digest_size;
        }

        let take = chunk.len().min(block_len);
        chunk[..take].copy_from_slice(&block[..take]);
    }

    out.copy_from_slice(&derived);
    Ok(())
}

/// Where the salt of a derivation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaltSource {
    /// Given by the caller
    Supplied,
    /// Read from an operating-system randomness device
    System(&'static str),
    /// Derived from the wall-clock time; not cryptographically sound
    TimeFallback,
}

impl SaltSource {
    /// Whether this salt gives degraded security assurance
    pub fn is_degraded(&self) -> bool {
        matches!(self, SaltSource::TimeFallback)
    }
}

/// Derive key material with a caller-supplied salt
///
/// Only the first [`SALT_LEN`] bytes of `salt` are used.
pub fn derive_with_salt(passphrase: &str, salt: &[u8], out: &mut [u8]) -> Result<()> {
    let salt = &salt[..salt.len().min(SALT_LEN)];
    pbkdf2(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, out, &HmacSha1)
}

/// Randomness devices tried, in order, when no salt is supplied
#[cfg(feature = "std")]
pub const RANDOM_SOURCES: [&str; 3] = ["/dev/srandom", "/dev/urandom", "/dev/random"];

/// Produce a salt from the first randomness device that can be read, or
/// from the clock when none can
#[cfg(feature = "std")]
pub fn generate_salt(passphrase: &str, sources: &[&'static str]) -> Result<([u8; SALT_LEN], SaltSource)> {
    use std::io::Read;

    let mut salt = [0u8; SALT_LEN];
    for &path in sources {
        let mut file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(_) => continue,
        };
        match file.read_exact(&mut salt) {
            Ok(()) => {
                log::debug!("Salt read from {}", path);
                return Ok((salt, SaltSource::System(path)));
            }
            Err(e) => log::warn!("Failed to read salt from {}: {}", path, e),
        }
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let digest = hmac_sha1(passphrase.as_bytes(), &now.to_le_bytes())?;
    salt.copy_from_slice(&digest[..SALT_LEN]);
    log::warn!("No randomness source available, salt derived from the current time (weak)");
    Ok((salt, SaltSource::TimeFallback))
}

/// Derive key material from a passphrase, generating a salt when none is
/// given
///
/// The returned [`SaltSource`] tells whether the weak time-based fallback
/// was used.
#[cfg(feature = "std")]
pub fn derive_key(passphrase: &str, salt: Option<&[u8]>, out: &mut [u8]) -> Result<SaltSource> {
    derive_key_from_sources(passphrase, salt, &RANDOM_SOURCES, out)
}

/// [`derive_key`] with an explicit list of randomness devices
#[cfg(feature = "std")]
pub fn derive_key_from_sources(
    passphrase: &str,
    salt: Option<&[u8]>,
    sources: &[&'static str],
    out: &mut [u8],
) -> Result<SaltSource> {
    match salt.filter(|s| !s.is_empty()) {
        Some(salt) => {
            derive_with_salt(passphrase, salt, out)?;
            Ok(SaltSource::Supplied)
        }
        None => {
            let (salt, source) = generate_salt(passphrase, sources)?;
            derive_with_salt(passphrase, &salt, out)?;
            Ok(source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> alloc::vec::Vec<u8> {
        crate::codec::hex_decode(s).unwrap()
    }

    #[test]
    fn test_reference_vector() {
        let mut key = [0u8; 16];
        pbkdf2(b"password", b"salt1234", 1024, &mut key, &HmacSha1).unwrap();
        assert_eq!(key.to_vec(), hex("c6cf932325b8e4215f3375c585fc8af7"));
    }

    #[test]
    fn test_multi_block_truncation() {
        let mut key = [0u8; 32];
        pbkdf2(b"password", b"salt1234", 1024, &mut key, &HmacSha1).unwrap();
        assert_eq!(
            key.to_vec(),
            hex("c6cf932325b8e4215f3375c585fc8af7db97aed2c8426d757f28d4969706f1ca")
        );
    }

    #[test]
    fn test_single_iteration_is_plain_hmac() {
        let mut key = [0u8; 20];
        pbkdf2(b"password", b"salt1234", 1, &mut key, &HmacSha1).unwrap();
        let expected = hmac_sha1(b"password", b"salt1234\x00\x00\x00\x01").unwrap();
        assert_eq!(key, expected);
    }

    #[test]
    fn test_not_xor_accumulated() {
        // Two rounds: output is PRF(PRF(salt||1)), not PRF(..) ^ PRF(PRF(..))
        let mut key = [0u8; 16];
        pbkdf2(b"password", b"salt1234", 2, &mut key, &HmacSha1).unwrap();
        assert_eq!(key.to_vec(), hex("57f57e99db1fc96e2708cbf698ed1d0c"));
    }

    #[test]
    fn test_deterministic() {
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        derive_with_salt("secret", b"abcdefgh", &mut a).unwrap();
        derive_with_salt("secret", b"abcdefghTRUNCATED", &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_salt_too_long_leaves_output_untouched() {
        let salt = [0x55u8; 253];
        let mut key = [0xAAu8; 16];
        assert!(pbkdf2(b"pw", &salt, 1, &mut key, &HmacSha1).is_err());
        assert_eq!(key, [0xAAu8; 16]);

        let salt = [0x55u8; 252];
        assert!(pbkdf2(b"pw", &salt, 1, &mut key, &HmacSha1).is_ok());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_time_fallback_is_degraded() {
        let mut key = [0u8; 16];
        let source =
            derive_key_from_sources("pw", None, &["/nonexistent/ykpers-random"], &mut key).unwrap();
        assert_eq!(source, SaltSource::TimeFallback);
        assert!(source.is_degraded());
        assert_ne!(key, [0u8; 16]);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_empty_salt_is_generated() {
        let mut key = [0u8; 16];
        let source =
            derive_key_from_sources("pw", Some(&[]), &["/nonexistent/ykpers-random"], &mut key)
                .unwrap();
        assert_eq!(source, SaltSource::TimeFallback);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_supplied_salt_source() {
        let mut key = [0u8; 16];
        let source = derive_key("password", Some(b"salt1234"), &mut key).unwrap();
        assert_eq!(source, SaltSource::Supplied);
        assert!(!source.is_degraded());
        assert_eq!(key.to_vec(), hex("c6cf932325b8e4215f3375c585fc8af7"));
    }
}
