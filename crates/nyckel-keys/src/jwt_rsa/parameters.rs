#![forbid(unsafe_code)]

//! Key-generation parameters and named templates for JWT RSA signing keys.

use crate::key::OutputPrefixType;
use crate::parameters::Parameters;
use crate::proto::{JwtRsaSsaPkcs1Algorithm, JwtRsaSsaPkcs1KeyFormat};
use nyckel_core::{Error, FipsPolicy, JwtRsaAlgorithm};
use nyckel_crypto::{validators, BigUint};
use std::collections::HashMap;

/// The public exponent 65537.
pub const F4: u32 = 65537;

/// How the `kid` header of produced tokens is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KidStrategy {
    /// No `kid` header unless the caller supplies one.
    Ignored,
    /// `kid` is the base64url encoding of the key's id within its keyset.
    Base64EncodedKeyId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtRsaSsaPkcs1Parameters {
    modulus_size_bits: u32,
    public_exponent: BigUint,
    algorithm: JwtRsaAlgorithm,
    kid_strategy: KidStrategy,
}

impl JwtRsaSsaPkcs1Parameters {
    pub fn new(
        modulus_size_bits: u32,
        public_exponent: BigUint,
        algorithm: JwtRsaAlgorithm,
        kid_strategy: KidStrategy,
    ) -> Result<Self, Error> {
        validators::validate_rsa_modulus_size(
            modulus_size_bits as usize,
            &FipsPolicy::unrestricted(),
        )?;
        validators::validate_rsa_public_exponent(&public_exponent)?;
        Ok(Self {
            modulus_size_bits,
            public_exponent,
            algorithm,
            kid_strategy,
        })
    }

    pub fn modulus_size_bits(&self) -> u32 {
        self.modulus_size_bits
    }

    pub fn public_exponent(&self) -> &BigUint {
        &self.public_exponent
    }

    pub fn algorithm(&self) -> JwtRsaAlgorithm {
        self.algorithm
    }

    pub fn kid_strategy(&self) -> KidStrategy {
        self.kid_strategy
    }

    /// Whether keys built from these parameters need a keyset key id.
    pub fn has_id_requirement(&self) -> bool {
        self.kid_strategy == KidStrategy::Base64EncodedKeyId
    }

    /// Output prefix of keyset keys generated from these parameters.
    pub fn output_prefix_type(&self) -> OutputPrefixType {
        match self.kid_strategy {
            KidStrategy::Ignored => OutputPrefixType::Raw,
            KidStrategy::Base64EncodedKeyId => OutputPrefixType::Tink,
        }
    }

    pub fn to_key_format(&self) -> JwtRsaSsaPkcs1KeyFormat {
        JwtRsaSsaPkcs1KeyFormat {
            version: super::VERSION,
            algorithm: algorithm_to_proto(self.algorithm) as i32,
            modulus_size_in_bits: self.modulus_size_bits,
            public_exponent: self.public_exponent.to_bytes_be(),
        }
    }
}

pub(crate) fn algorithm_to_proto(algorithm: JwtRsaAlgorithm) -> JwtRsaSsaPkcs1Algorithm {
    match algorithm {
        JwtRsaAlgorithm::Rs256 => JwtRsaSsaPkcs1Algorithm::Rs256,
        JwtRsaAlgorithm::Rs384 => JwtRsaSsaPkcs1Algorithm::Rs384,
        JwtRsaAlgorithm::Rs512 => JwtRsaSsaPkcs1Algorithm::Rs512,
    }
}

/// Decode the stored algorithm enum value.
pub(crate) fn algorithm_from_proto(value: i32) -> Result<JwtRsaAlgorithm, Error> {
    match JwtRsaSsaPkcs1Algorithm::try_from(value) {
        Ok(JwtRsaSsaPkcs1Algorithm::Rs256) => Ok(JwtRsaAlgorithm::Rs256),
        Ok(JwtRsaSsaPkcs1Algorithm::Rs384) => Ok(JwtRsaAlgorithm::Rs384),
        Ok(JwtRsaSsaPkcs1Algorithm::Rs512) => Ok(JwtRsaAlgorithm::Rs512),
        _ => Err(Error::UnsupportedAlgorithm(format!(
            "JWT RSA SSA PKCS1 algorithm value {value}"
        ))),
    }
}

/// Default templates for RS256, RS384 and RS512 tokens.
///
/// Templates with the `_RAW` suffix produce tokens without a `kid` header.
pub fn named_parameters() -> Result<HashMap<String, Parameters>, Error> {
    let templates = [
        ("JWT_RS256_2048_F4", 2048, JwtRsaAlgorithm::Rs256),
        ("JWT_RS256_3072_F4", 3072, JwtRsaAlgorithm::Rs256),
        ("JWT_RS384_3072_F4", 3072, JwtRsaAlgorithm::Rs384),
        ("JWT_RS512_4096_F4", 4096, JwtRsaAlgorithm::Rs512),
    ];

    let mut result = HashMap::new();
    for (name, bits, algorithm) in templates {
        for (suffix, kid_strategy) in [
            ("_RAW", KidStrategy::Ignored),
            ("", KidStrategy::Base64EncodedKeyId),
        ] {
            let params =
                JwtRsaSsaPkcs1Parameters::new(bits, BigUint::from(F4), algorithm, kid_strategy)?;
            result.insert(format!("{name}{suffix}"), Parameters::JwtRsaSsaPkcs1(params));
        }
    }
    Ok(result)
}
