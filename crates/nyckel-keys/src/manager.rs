#![forbid(unsafe_code)]

//! The contract every key manager implements.

use crate::key::{KeyData, KeyMaterialType};
use crate::primitive::{Primitive, PrimitiveKind};
use nyckel_core::{Error, FipsCompatibility, FipsPolicy};

/// Bridges serialized keys of one key type and runtime primitives.
///
/// Registered in a [`KeyManagerRegistry`](crate::KeyManagerRegistry) under
/// [`key_type`](Self::key_type). Implementations are immutable after
/// construction and shared between threads.
pub trait KeyManager: Send + Sync {
    /// Type URL of the private (or only) key schema this manager handles.
    fn key_type(&self) -> &'static str;

    /// Highest key version this manager accepts and the version it writes.
    fn version(&self) -> u32;

    /// Primitive kinds [`primitive`](Self::primitive) can build.
    fn primitive_kinds(&self) -> &'static [PrimitiveKind];

    fn key_material_type(&self) -> KeyMaterialType;

    /// Whether the algorithm may be used once the process is FIPS-restricted.
    fn fips_status(&self) -> FipsCompatibility;

    /// Parse, validate and self-test `serialized_key`, then build its primitive.
    fn primitive(&self, serialized_key: &[u8]) -> Result<Primitive, Error>;

    /// Generate a new key from a serialized key format.
    fn new_key_data(&self, serialized_key_format: &[u8]) -> Result<KeyData, Error>;

    /// Extract the public key of a serialized private key.
    fn public_key_data(&self, _serialized_key: &[u8]) -> Result<KeyData, Error> {
        Err(Error::UnsupportedAlgorithm(format!(
            "{} does not manage private keys",
            self.key_type()
        )))
    }

    /// Adopt the FIPS policy of the registry the manager is being stored in.
    ///
    /// Managers whose validation depends on FIPS mode must keep `policy`.
    fn bind_fips_policy(&mut self, _policy: &FipsPolicy) {}

    fn does_support(&self, type_url: &str) -> bool {
        type_url == self.key_type()
    }
}
