#![forbid(unsafe_code)]

/// Errors produced by the Nyckel key-management library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed key data: {0}")]
    MalformedKeyData(String),

    #[error("key has version {found}; only keys with version in range [0..{max}] are supported")]
    InvalidKeyVersion { found: u32, max: u32 },

    #[error("invalid RSA modulus size: {0}")]
    InvalidModulusSize(String),

    #[error("invalid RSA public exponent: {0}")]
    InvalidPublicExponent(String),

    #[error("invalid RSA key components: {0}")]
    InvalidKeyComponents(String),

    #[error("key self-test failed: {0}")]
    SelfTestFailure(String),

    #[error("conflicting key id: {0}")]
    ConflictingKeyId(String),

    #[error("type url ({type_url}) is already registered with {existing}, cannot be re-registered with {attempted}")]
    ConflictingRegistration {
        type_url: String,
        existing: &'static str,
        attempted: &'static str,
    },

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("cannot register key manager for {0}: FIPS compatibility insufficient")]
    IncompatibleFipsMode(String),

    #[error("no key manager found for key type {0}")]
    UnknownKeyType(String),

    #[error("primitive {requested} not supported by key manager for {type_url}, supported primitives: {supported}")]
    UnsupportedPrimitive {
        type_url: String,
        requested: String,
        supported: String,
    },

    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("template {0} is already registered with different parameters")]
    ConflictingTemplate(String),

    #[error("registry is not empty: {0}")]
    NotEmpty(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
