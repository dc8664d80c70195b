#![forbid(unsafe_code)]

//! RSASSA-PKCS1-v1_5 JWT signer.

use crate::format::{self, RawJwt};
use nyckel_core::{Error, JwtRsaAlgorithm};
use nyckel_crypto::sign;
use nyckel_crypto::RsaCrtPrivateKey;
use tracing::debug;

/// Signs JWTs and encodes them in compact form.
///
/// Built by a key manager only after the key has passed its self-test.
#[derive(Debug, Clone)]
pub struct JwtRsaSsaPkcs1Signer {
    key: RsaCrtPrivateKey,
    algorithm: JwtRsaAlgorithm,
    custom_kid: Option<String>,
    keyset_kid: Option<String>,
}

impl JwtRsaSsaPkcs1Signer {
    pub fn new(
        key: RsaCrtPrivateKey,
        algorithm: JwtRsaAlgorithm,
        custom_kid: Option<String>,
    ) -> Self {
        Self {
            key,
            algorithm,
            custom_kid,
            keyset_kid: None,
        }
    }

    /// Attach the kid derived from the key's keyset id. [`sign_and_encode`]
    /// writes it into every token.
    ///
    /// [`sign_and_encode`]: Self::sign_and_encode
    pub fn with_keyset_kid(mut self, kid: impl Into<String>) -> Self {
        self.keyset_kid = Some(kid.into());
        self
    }

    pub fn algorithm(&self) -> JwtRsaAlgorithm {
        self.algorithm
    }

    pub fn custom_kid(&self) -> Option<&str> {
        self.custom_kid.as_deref()
    }

    pub fn keyset_kid(&self) -> Option<&str> {
        self.keyset_kid.as_deref()
    }

    /// Sign `raw_jwt` and return the compact token.
    ///
    /// A key with a custom kid always writes that kid and rejects a
    /// caller-supplied one. Otherwise `kid` is written verbatim when present.
    pub fn sign_and_encode_with_kid(
        &self,
        raw_jwt: &RawJwt,
        kid: Option<&str>,
    ) -> Result<String, Error> {
        let kid = match (self.custom_kid.as_deref(), kid) {
            (Some(custom), Some(requested)) => {
                return Err(Error::ConflictingKeyId(format!(
                    "key has custom kid {custom:?} but kid {requested:?} was also supplied; \
                     custom_kid can only be set for keys that do not emit a kid"
                )));
            }
            (Some(custom), None) => Some(custom),
            (None, requested) => requested,
        };

        let unsigned = format::create_unsigned_compact(self.algorithm.name(), kid, raw_jwt)?;
        let signature = sign::sign(&self.key, self.algorithm.hash(), unsigned.as_bytes())?;
        debug!(alg = self.algorithm.name(), has_kid = kid.is_some(), "signed JWT");
        Ok(format::create_signed_compact(&unsigned, &signature))
    }

    /// Sign `raw_jwt` with the keyset kid, if one is attached.
    pub fn sign_and_encode(&self, raw_jwt: &RawJwt) -> Result<String, Error> {
        self.sign_and_encode_with_kid(raw_jwt, self.keyset_kid.as_deref())
    }
}
