#![forbid(unsafe_code)]

//! Algorithm identifiers and key type URLs.
//!
//! Each key type URL names one serialized key schema and is the lookup key
//! of the key manager registry.

// ── Key type URLs ────────────────────────────────────────────────────

pub const JWT_RSA_SSA_PKCS1_PRIVATE_KEY: &str =
    "type.googleapis.com/google.crypto.tink.JwtRsaSsaPkcs1PrivateKey";
pub const JWT_RSA_SSA_PKCS1_PUBLIC_KEY: &str =
    "type.googleapis.com/google.crypto.tink.JwtRsaSsaPkcs1PublicKey";

// ── Hash functions ───────────────────────────────────────────────────

/// Hash function used by a signature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    Sha256,
    Sha384,
    Sha512,
}

impl HashType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }
}

// ── JWT RSA algorithms ───────────────────────────────────────────────

/// RSASSA-PKCS1-v1_5 JWT algorithms (RFC 7518 §3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JwtRsaAlgorithm {
    Rs256,
    Rs384,
    Rs512,
}

impl JwtRsaAlgorithm {
    /// The `alg` header value.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
        }
    }

    pub fn hash(self) -> HashType {
        match self {
            Self::Rs256 => HashType::Sha256,
            Self::Rs384 => HashType::Sha384,
            Self::Rs512 => HashType::Sha512,
        }
    }
}

impl std::fmt::Display for JwtRsaAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
