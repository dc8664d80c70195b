#![forbid(unsafe_code)]

//! Key manager for JWT RSASSA-PKCS1-v1_5 private keys.
//!
//! Generates `JwtRsaSsaPkcs1PrivateKey` keys and produces
//! [`JwtRsaSsaPkcs1Signer`] primitives from them.

pub mod parameters;

use crate::key::{KeyData, KeyMaterialType};
use crate::manager::KeyManager;
use crate::parameters::ParametersRegistry;
use crate::primitive::{Primitive, PrimitiveKind};
use crate::proto::{CustomKid, JwtRsaSsaPkcs1KeyFormat, JwtRsaSsaPkcs1PrivateKey, JwtRsaSsaPkcs1PublicKey};
use crate::registry::KeyManagerRegistry;
use nyckel_core::algorithm::{JWT_RSA_SSA_PKCS1_PRIVATE_KEY, JWT_RSA_SSA_PKCS1_PUBLIC_KEY};
use nyckel_core::{Error, FipsCompatibility, FipsPolicy};
use nyckel_crypto::{selftest, sign, validators, BigUint, RsaPrivateComponents};
use nyckel_jwt::JwtRsaSsaPkcs1Signer;
use parameters::{algorithm_from_proto, named_parameters};
use prost::Message;
use tracing::debug;

pub(crate) const VERSION: u32 = 0;

const PRIMITIVE_KINDS: &[PrimitiveKind] = &[PrimitiveKind::JwtPublicKeySign];

/// Signing-side key manager for JWT RSA PKCS#1 v1.5 keys.
///
/// `Default` gives an unrestricted policy. A manager stored in a
/// [`KeyManagerRegistry`] takes over the registry's policy on registration.
#[derive(Debug, Clone, Default)]
pub struct JwtRsaSsaPkcs1SignKeyManager {
    fips: FipsPolicy,
}

impl JwtRsaSsaPkcs1SignKeyManager {
    /// A manager that applies the restrictions of `fips` when validating keys.
    pub fn new(fips: FipsPolicy) -> Self {
        Self { fips }
    }

    /// Register this manager and its named templates.
    pub fn register_pair(
        registry: &KeyManagerRegistry,
        parameters: &ParametersRegistry,
        new_key_allowed: bool,
    ) -> Result<(), Error> {
        let manager = Self::new(registry.fips_policy().clone());
        let fips_status = manager.fips_status();
        registry.register(manager, fips_status, new_key_allowed)?;
        parameters.put_all(named_parameters()?)
    }

    pub fn parse_key(&self, serialized: &[u8]) -> Result<JwtRsaSsaPkcs1PrivateKey, Error> {
        JwtRsaSsaPkcs1PrivateKey::decode(serialized)
            .map_err(|e| Error::MalformedKeyData(format!("{JWT_RSA_SSA_PKCS1_PRIVATE_KEY}: {e}")))
    }

    pub fn parse_key_format(&self, serialized: &[u8]) -> Result<JwtRsaSsaPkcs1KeyFormat, Error> {
        JwtRsaSsaPkcs1KeyFormat::decode(serialized).map_err(|e| {
            Error::MalformedKeyData(format!("{JWT_RSA_SSA_PKCS1_PRIVATE_KEY} key format: {e}"))
        })
    }

    pub fn validate_key(&self, key: &JwtRsaSsaPkcs1PrivateKey) -> Result<(), Error> {
        validators::validate_version(key.version, VERSION)?;
        let public = embedded_public_key(key)?;
        validators::validate_version(public.version, VERSION)?;
        let n = BigUint::from_bytes_be(&public.n);
        validators::validate_rsa_modulus_size(n.bits(), &self.fips)?;
        validators::validate_rsa_public_exponent(&BigUint::from_bytes_be(&public.e))
    }

    pub fn validate_key_format(&self, format: &JwtRsaSsaPkcs1KeyFormat) -> Result<(), Error> {
        algorithm_from_proto(format.algorithm)?;
        validators::validate_rsa_modulus_size(format.modulus_size_in_bits as usize, &self.fips)?;
        validators::validate_rsa_public_exponent(&BigUint::from_bytes_be(&format.public_exponent))
    }

    /// Generate a new private key. Slow for large moduli.
    pub fn create_key(
        &self,
        format: &JwtRsaSsaPkcs1KeyFormat,
    ) -> Result<JwtRsaSsaPkcs1PrivateKey, Error> {
        self.validate_key_format(format)?;
        let exponent = BigUint::from_bytes_be(&format.public_exponent);
        let c = sign::generate_rsa_key_pair(format.modulus_size_in_bits as usize, &exponent)?;

        let public_key = JwtRsaSsaPkcs1PublicKey {
            version: VERSION,
            algorithm: format.algorithm,
            n: c.n.to_bytes_be(),
            e: c.e.to_bytes_be(),
            custom_kid: None,
        };
        Ok(JwtRsaSsaPkcs1PrivateKey {
            version: VERSION,
            public_key: Some(public_key),
            d: c.d.to_bytes_be(),
            p: c.p.to_bytes_be(),
            q: c.q.to_bytes_be(),
            dp: c.dp.to_bytes_be(),
            dq: c.dq.to_bytes_be(),
            crt: c.qinv.to_bytes_be(),
        })
    }

    pub fn public_key(
        &self,
        key: &JwtRsaSsaPkcs1PrivateKey,
    ) -> Result<JwtRsaSsaPkcs1PublicKey, Error> {
        embedded_public_key(key).cloned()
    }

    /// Build a signer from `key`.
    ///
    /// The key is rebuilt from its stored components and must pass a
    /// sign/verify self-test before the signer is returned.
    pub fn create_primitive(
        &self,
        key: &JwtRsaSsaPkcs1PrivateKey,
    ) -> Result<JwtRsaSsaPkcs1Signer, Error> {
        self.validate_key(key)?;
        let public = embedded_public_key(key)?;
        let components = RsaPrivateComponents {
            n: BigUint::from_bytes_be(&public.n),
            e: BigUint::from_bytes_be(&public.e),
            d: BigUint::from_bytes_be(&key.d),
            p: BigUint::from_bytes_be(&key.p),
            q: BigUint::from_bytes_be(&key.q),
            dp: BigUint::from_bytes_be(&key.dp),
            dq: BigUint::from_bytes_be(&key.dq),
            qinv: BigUint::from_bytes_be(&key.crt),
        };
        let private_key = sign::reconstruct_private_key(&components)?;
        let algorithm = algorithm_from_proto(public.algorithm)?;

        let public_key = sign::public_key_from_components(&components.n, &components.e)?;
        selftest::validate_rsa_ssa_pkcs1(&private_key, &public_key, algorithm.hash())?;

        let custom_kid = public.custom_kid.as_ref().map(|kid| kid.value.clone());
        debug!(
            alg = algorithm.name(),
            modulus_bits = private_key.modulus_bits(),
            custom_kid = custom_kid.is_some(),
            "created JWT RSA signer"
        );
        Ok(JwtRsaSsaPkcs1Signer::new(private_key, algorithm, custom_kid))
    }
}

/// Attach a custom kid to a key's public part.
pub fn with_custom_kid(
    mut key: JwtRsaSsaPkcs1PrivateKey,
    kid: impl Into<String>,
) -> Result<JwtRsaSsaPkcs1PrivateKey, Error> {
    let public = key
        .public_key
        .as_mut()
        .ok_or_else(|| Error::MalformedKeyData("private key has no public_key".into()))?;
    public.custom_kid = Some(CustomKid { value: kid.into() });
    Ok(key)
}

fn embedded_public_key(key: &JwtRsaSsaPkcs1PrivateKey) -> Result<&JwtRsaSsaPkcs1PublicKey, Error> {
    key.public_key
        .as_ref()
        .ok_or_else(|| Error::MalformedKeyData("private key has no public_key".into()))
}

impl KeyManager for JwtRsaSsaPkcs1SignKeyManager {
    fn key_type(&self) -> &'static str {
        JWT_RSA_SSA_PKCS1_PRIVATE_KEY
    }

    fn version(&self) -> u32 {
        VERSION
    }

    fn primitive_kinds(&self) -> &'static [PrimitiveKind] {
        PRIMITIVE_KINDS
    }

    fn key_material_type(&self) -> KeyMaterialType {
        KeyMaterialType::AsymmetricPrivate
    }

    fn fips_status(&self) -> FipsCompatibility {
        FipsCompatibility::RequiresCertifiedModule
    }

    fn bind_fips_policy(&mut self, policy: &FipsPolicy) {
        self.fips = policy.clone();
    }

    fn primitive(&self, serialized_key: &[u8]) -> Result<Primitive, Error> {
        let key = self.parse_key(serialized_key)?;
        Ok(Primitive::JwtPublicKeySign(self.create_primitive(&key)?))
    }

    fn new_key_data(&self, serialized_key_format: &[u8]) -> Result<KeyData, Error> {
        let format = self.parse_key_format(serialized_key_format)?;
        let key = self.create_key(&format)?;
        Ok(KeyData::new(
            JWT_RSA_SSA_PKCS1_PRIVATE_KEY,
            key.encode_to_vec(),
            KeyMaterialType::AsymmetricPrivate,
        ))
    }

    fn public_key_data(&self, serialized_key: &[u8]) -> Result<KeyData, Error> {
        let key = self.parse_key(serialized_key)?;
        self.validate_key(&key)?;
        Ok(KeyData::new(
            JWT_RSA_SSA_PKCS1_PUBLIC_KEY,
            self.public_key(&key)?.encode_to_vec(),
            KeyMaterialType::AsymmetricPublic,
        ))
    }
}
