#![forbid(unsafe_code)]

//! Primitive kinds and the primitives key managers construct.

use nyckel_jwt::JwtRsaSsaPkcs1Signer;

/// The capability a primitive provides. Registry entries advertise the kinds
/// their manager can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    JwtPublicKeySign,
    JwtPublicKeyVerify,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::JwtPublicKeySign => "JwtPublicKeySign",
            Self::JwtPublicKeyVerify => "JwtPublicKeyVerify",
        }
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A runtime cryptographic object. Never serialized; owned by the caller.
#[derive(Debug, Clone)]
pub enum Primitive {
    JwtPublicKeySign(JwtRsaSsaPkcs1Signer),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::JwtPublicKeySign(_) => PrimitiveKind::JwtPublicKeySign,
        }
    }

    /// Attach the kid a keyset entry assigns to its output.
    pub fn with_keyset_kid(self, kid: String) -> Self {
        match self {
            Self::JwtPublicKeySign(signer) => Self::JwtPublicKeySign(signer.with_keyset_kid(kid)),
        }
    }

    pub fn into_jwt_signer(self) -> Option<JwtRsaSsaPkcs1Signer> {
        match self {
            Self::JwtPublicKeySign(signer) => Some(signer),
        }
    }
}
