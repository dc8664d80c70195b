#![forbid(unsafe_code)]

//! Key managers and registries for the Nyckel key-management library.
//!
//! A [`KeyManagerRegistry`] maps key type URLs to [`KeyManager`]s and turns
//! serialized keys into [`Primitive`]s. A [`ParametersRegistry`] maps template
//! names such as `JWT_RS256_2048_F4` to key-generation parameters.

pub mod config;
pub mod jwt_rsa;
pub mod key;
pub mod manager;
pub mod parameters;
pub mod primitive;
pub mod proto;
pub mod registry;

pub use config::RegistryConfig;
pub use jwt_rsa::JwtRsaSsaPkcs1SignKeyManager;
pub use key::{KeyData, KeyMaterialType, KeysetKey, OutputPrefixType};
pub use manager::KeyManager;
pub use parameters::{Parameters, ParametersRegistry};
pub use primitive::{Primitive, PrimitiveKind};
pub use registry::KeyManagerRegistry;

use nyckel_core::Error;

/// Register every key manager in this crate, allowing new keys.
pub fn register_all(
    registry: &KeyManagerRegistry,
    parameters: &ParametersRegistry,
) -> Result<(), Error> {
    JwtRsaSsaPkcs1SignKeyManager::register_pair(registry, parameters, true)
}
