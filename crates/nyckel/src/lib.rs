#![forbid(unsafe_code)]

pub use nyckel_core as core;
pub use nyckel_crypto as crypto;
pub use nyckel_jwt as jwt;
pub use nyckel_keys as keys;
