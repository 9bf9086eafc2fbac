//! SRP-6a verifier and salt derivation.
//!
//! # Responsibilities
//! - Hold the deployment's public group parameters (prime, generator, hash)
//! - Derive a fresh `{salt, verifier}` pair from a username and password
//! - Check a candidate password against a stored pair
//!
//! The password is consumed by the hash inside this module and appears in no
//! return value. The server only ever sees and stores `{salt, verifier}`;
//! neither can be inverted to the password, and possession of both does not
//! allow impersonation without the password itself.

use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

/// Salt length in bytes. Regenerated on every derivation.
pub const SALT_LEN: usize = 16;

/// 2048-bit MODP group (RFC 3526, group 14), generator 2.
const GROUP_PRIME_HEX: &str = "\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D\
C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F\
83655D23DCA3AD961C62F356208552BB9ED529077096966D\
670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9\
DE2BCBF6955817183995497CEA956AE515D2261898FA0510\
15728E5A8AACAA68FFFFFFFFFFFFFFFF";

/// The algorithm's public constants: safe prime, generator, hash. Fixed for
/// the lifetime of a deployment and shared by both sides; never secret.
#[derive(Debug, Clone)]
pub struct SrpParameters {
    n: BigUint,
    g: BigUint,
}

impl SrpParameters {
    /// The shipped group: 2048-bit MODP with SHA-512, matching the web
    /// frontend's SRP routines.
    pub fn group_2048() -> Self {
        let n = BigUint::parse_bytes(GROUP_PRIME_HEX.as_bytes(), 16)
            .expect("group prime constant is valid hex");
        Self { n, g: BigUint::from(2u8) }
    }

    /// Width of the prime in bytes; used for fixed-width encodings.
    fn n_bytes(&self) -> usize {
        (self.n.bits() as usize + 7) / 8
    }
}

impl Default for SrpParameters {
    fn default() -> Self {
        Self::group_2048()
    }
}

/// The only artifact a password change produces: opaque salt plus the
/// verifier as a decimal string (the wire form the frontend routines use).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierRecord {
    pub salt: Vec<u8>,
    pub verifier: String,
}

/// Derive a fresh `{salt, verifier}` for a new password.
///
/// `x = H(salt || H(username ":" password))`, `v = g^x mod N`, with a
/// cryptographically random salt unique to this invocation.
pub fn derive_verifier(params: &SrpParameters, username: &str, password: &str) -> VerifierRecord {
    let mut salt = vec![0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let v = verifier_for_salt(params, username, password, &salt);
    VerifierRecord { salt, verifier: v.to_str_radix(10) }
}

/// Check a candidate password against a stored `{salt, verifier}` pair.
///
/// Recomputes the verifier for the stored salt and compares in constant
/// time. A stored verifier that does not parse never matches.
pub fn verify_password(
    params: &SrpParameters,
    username: &str,
    candidate: &str,
    salt: &[u8],
    stored_verifier: &str,
) -> bool {
    let Some(stored) = BigUint::parse_bytes(stored_verifier.as_bytes(), 10) else {
        return false;
    };
    let computed = verifier_for_salt(params, username, candidate, salt);

    let width = params.n_bytes();
    let a = to_fixed_width(&computed, width);
    let b = to_fixed_width(&stored, width);
    a.ct_eq(&b).into()
}

/// `g^x mod N` for the private key derived from `(username, password, salt)`.
fn verifier_for_salt(params: &SrpParameters, username: &str, password: &str, salt: &[u8]) -> BigUint {
    let x = private_key(username, password, salt);
    params.g.modpow(&x, &params.n)
}

/// `x = H(salt || H(username ":" password))` per SRP-6a with SHA-512.
fn private_key(username: &str, password: &str, salt: &[u8]) -> BigUint {
    let identity = Sha512::new()
        .chain_update(username.as_bytes())
        .chain_update(b":")
        .chain_update(password.as_bytes())
        .finalize();
    let x = Sha512::new().chain_update(salt).chain_update(identity).finalize();
    BigUint::from_bytes_be(&x)
}

fn to_fixed_width(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes.len() >= width {
        return bytes;
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(&bytes);
    out
}
