#![forbid(unsafe_code)]

//! JSON Web Token signing for the Nyckel key-management library.
//!
//! Provides the compact JWS encoding and the RSA PKCS#1 v1.5 signer that key
//! managers hand out as a primitive.

pub mod format;
pub mod signer;

pub use format::RawJwt;
pub use signer::JwtRsaSsaPkcs1Signer;
