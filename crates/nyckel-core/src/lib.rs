#![forbid(unsafe_code)]

//! Core types for the Nyckel key-management library.

pub mod algorithm;
pub mod error;
pub mod fips;

pub use algorithm::{HashType, JwtRsaAlgorithm};
pub use error::{Error, Result};
pub use fips::{FipsCompatibility, FipsPolicy};
