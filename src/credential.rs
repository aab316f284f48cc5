//! Password credential storage and verification.
//!
//! Passwords are never stored, only memory-hard digests of them. A hash here
//! is a self-describing PHC string (algorithm, version, cost parameters, salt,
//! digest all embedded), so verification reads its parameters back out of the
//! stored value and old hashes keep verifying after the defaults change.

use crate::error::{Error, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::{rngs::OsRng, CryptoRng, RngCore, SeedableRng};
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use subtle::{Choice, ConstantTimeEq};

/// Cost parameters for the password hash. CPU difficulty (number of passes)
/// and memory difficulty (KiB of scratch space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashCost {
    /// CPU difficulty (argon2 `t_cost`)
    ops: u32,
    /// Memory difficulty in KiB (argon2 `m_cost`)
    mem: u32,
}

impl HashCost {
    /// Costs suitable for hashing during an interactive request, i.e. a login
    /// endpoint that needs to respond in tens of milliseconds.
    pub const INTERACTIVE: Self = Self { ops: 2, mem: 65536 };
    /// Middle of the road costs.
    pub const MODERATE: Self = Self { ops: 3, mem: 262144 };
    /// Costs for hashes guarding something important enough that nobody minds
    /// waiting around while we grind through a gig of ram.
    pub const SENSITIVE: Self = Self {
        ops: 4,
        mem: 1048576,
    };

    /// Create a custom cost. Values outside what argon2 accepts surface as
    /// [`Error::CredentialHashFailed`] when hashing.
    pub fn new(ops: u32, mem: u32) -> Self {
        Self { ops, mem }
    }
}

impl Default for HashCost {
    fn default() -> Self {
        Self::INTERACTIVE
    }
}

/// A stored password digest in PHC string format, eg
/// `$argon2id$v=19$m=65536,t=2,p=1$<salt>$<digest>`.
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Wrap a PHC string loaded from storage. No validation happens here. A
    /// mangled value is caught by [`verify`][CredentialHash::verify], which
    /// treats it as a mismatch.
    pub fn from_stored<T: Into<String>>(stored: T) -> Self {
        Self(stored.into())
    }

    /// The PHC string itself, for handing to storage.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check a plaintext password against this stored hash. Total: a hash
    /// that fails to parse, or was made by parameters we can't run, reports
    /// `false` the same as a wrong password.
    pub fn verify(&self, plaintext: &str) -> bool {
        let parsed = match PasswordHash::new(&self.0) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };
        argon2::Argon2::default().verify_password(plaintext.as_bytes(), &parsed).is_ok()
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialHash(..)")
    }
}

impl ConstantTimeEq for CredentialHash {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.as_bytes().ct_eq(other.0.as_bytes())
    }
}

impl PartialEq for CredentialHash {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).unwrap_u8() == 1
    }
}

impl Eq for CredentialHash {}

/// Hash a plaintext password for storage, pulling a fresh random salt from
/// `rng`.
pub fn hash_password<R: RngCore + CryptoRng>(rng: &mut R, plaintext: &str, cost: HashCost) -> Result<CredentialHash> {
    let salt = SaltString::generate(&mut *rng);
    let params = argon2::Params::new(cost.mem, cost.ops, 1, None).map_err(|_| Error::CredentialHashFailed)?;
    let argon2_ctx = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
    let hashed = argon2_ctx
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|_| Error::CredentialHashFailed)?;
    Ok(CredentialHash(hashed.to_string()))
}

/// A convenience function that returns a ChaCha20 CSRNG seeded with OS random
/// bytes. Use this if you want a nice, strong random number generator, you
/// don't want to wire one up yourself, and your platform provides good
/// entropy.
///
/// This can be used as an input to any function here that accepts `&mut rng`.
/// Otherwise, you can bring your own RNG that implements [`RngCore`].
pub fn rng_chacha20() -> rand_chacha::ChaCha20Rng {
    let mut seed_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut seed_bytes);
    rand_chacha::ChaCha20Rng::from_seed(seed_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let mut rng = crate::util::test::rng();
        let hash = hash_password(&mut rng, "hunter2", HashCost::INTERACTIVE).unwrap();
        assert!(hash.verify("hunter2"));
        assert!(!hash.verify("hunter3"));
        assert!(!hash.verify(""));
        assert!(!hash.verify("hunter2 "));
    }

    #[test]
    fn phc_format() {
        let mut rng = crate::util::test::rng_seeded(b"get a job");
        let hash = hash_password(&mut rng, "ZONING IS COMMUNISM", HashCost::INTERACTIVE).unwrap();
        assert!(hash.as_str().starts_with("$argon2id$v=19$m=65536,t=2,p=1$"));
    }

    #[test]
    fn salted_hashes_differ() {
        let mut rng = crate::util::test::rng();
        let hash1 = hash_password(&mut rng, "swordfish", HashCost::INTERACTIVE).unwrap();
        let hash2 = hash_password(&mut rng, "swordfish", HashCost::INTERACTIVE).unwrap();
        assert!(hash1 != hash2);
        assert!(hash1.verify("swordfish"));
        assert!(hash2.verify("swordfish"));
    }

    #[test]
    fn deterministic_with_seeded_rng() {
        let mut rng1 = crate::util::test::rng_seeded(b"hi im jerry");
        let mut rng2 = crate::util::test::rng_seeded(b"hi im jerry");
        let hash1 = hash_password(&mut rng1, "open sesame", HashCost::INTERACTIVE).unwrap();
        let hash2 = hash_password(&mut rng2, "open sesame", HashCost::INTERACTIVE).unwrap();
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn mangled_stored_hash_never_verifies() {
        for stored in ["", "garbage", "$argon2id$nope", "$2b$12$abcdefghijklmnopqrstuv"] {
            let hash = CredentialHash::from_stored(stored);
            assert!(!hash.verify("anything"));
        }
    }

    #[test]
    fn verify_reads_params_from_stored_string() {
        // hash at one cost, verify through the default-configured verifier.
        let mut rng = crate::util::test::rng();
        let hash = hash_password(&mut rng, "correct horse battery staple", HashCost::new(1, 8192)).unwrap();
        assert!(hash.as_str().contains("m=8192,t=1"));
        assert!(hash.verify("correct horse battery staple"));
    }

    #[test]
    fn bad_cost_surfaces_as_error() {
        let mut rng = crate::util::test::rng();
        let res = hash_password(&mut rng, "whatever", HashCost::new(0, 0));
        assert_eq!(res.err(), Some(Error::CredentialHashFailed));
    }

    #[test]
    fn cost_presets() {
        assert_eq!(HashCost::default(), HashCost::INTERACTIVE);
        assert_eq!(HashCost::INTERACTIVE, HashCost::new(2, 65536));
        assert_eq!(HashCost::MODERATE, HashCost::new(3, 262144));
        assert_eq!(HashCost::SENSITIVE, HashCost::new(4, 1048576));
    }
}
