#![forbid(unsafe_code)]

//! Cryptographic building blocks for the Nyckel key-management library.
//!
//! Wraps the RSA engine (key generation, CRT key reconstruction, PKCS#1 v1.5
//! signatures) and provides the self-tests and parameter validators shared
//! by key managers.

pub mod keyid;
pub mod selftest;
pub mod sign;
pub mod validators;

pub use sign::{RsaCrtPrivateKey, RsaPrivateComponents};

/// Re-exported so callers can build key components without naming the bignum crate.
pub use num_bigint_dig::BigUint;
