#![forbid(unsafe_code)]

//! Binary key schema for JWT RSASSA-PKCS1-v1_5 keys and keyset entries.
//!
//! Protobuf messages with the field numbers of the published JWT RSA key and
//! keyset schemas, so serialized keys interoperate with other implementations.
//! Big integers are unsigned big-endian byte strings.

/// `alg` choice stored with a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum JwtRsaSsaPkcs1Algorithm {
    RsUnknown = 0,
    Rs256 = 1,
    Rs384 = 2,
    Rs512 = 3,
}

/// Key id written into the token header instead of one derived from the keyset.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CustomKid {
    #[prost(string, tag = "1")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JwtRsaSsaPkcs1PublicKey {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(enumeration = "JwtRsaSsaPkcs1Algorithm", tag = "2")]
    pub algorithm: i32,
    /// Modulus.
    #[prost(bytes = "vec", tag = "3")]
    pub n: Vec<u8>,
    /// Public exponent.
    #[prost(bytes = "vec", tag = "4")]
    pub e: Vec<u8>,
    #[prost(message, optional, tag = "5")]
    pub custom_kid: Option<CustomKid>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JwtRsaSsaPkcs1PrivateKey {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(message, optional, tag = "2")]
    pub public_key: Option<JwtRsaSsaPkcs1PublicKey>,
    /// Private exponent.
    #[prost(bytes = "vec", tag = "3")]
    pub d: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub p: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub q: Vec<u8>,
    /// d mod (p - 1).
    #[prost(bytes = "vec", tag = "6")]
    pub dp: Vec<u8>,
    /// d mod (q - 1).
    #[prost(bytes = "vec", tag = "7")]
    pub dq: Vec<u8>,
    /// CRT coefficient q^-1 mod p.
    #[prost(bytes = "vec", tag = "8")]
    pub crt: Vec<u8>,
}

/// Key generation request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JwtRsaSsaPkcs1KeyFormat {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(enumeration = "JwtRsaSsaPkcs1Algorithm", tag = "2")]
    pub algorithm: i32,
    #[prost(uint32, tag = "3")]
    pub modulus_size_in_bits: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub public_exponent: Vec<u8>,
}

// ── Keyset entries ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum KeyMaterialType {
    UnknownKeymaterial = 0,
    Symmetric = 1,
    AsymmetricPrivate = 2,
    AsymmetricPublic = 3,
    Remote = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum KeyStatusType {
    UnknownStatus = 0,
    Enabled = 1,
    Disabled = 2,
    Destroyed = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OutputPrefixType {
    UnknownPrefix = 0,
    Tink = 1,
    Legacy = 2,
    Raw = 3,
    Crunchy = 4,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyData {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    #[prost(enumeration = "KeyMaterialType", tag = "3")]
    pub key_material_type: i32,
}

/// One key of a keyset.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeysetKey {
    #[prost(message, optional, tag = "1")]
    pub key_data: Option<KeyData>,
    #[prost(enumeration = "KeyStatusType", tag = "2")]
    pub status: i32,
    #[prost(uint32, tag = "3")]
    pub key_id: u32,
    #[prost(enumeration = "OutputPrefixType", tag = "4")]
    pub output_prefix_type: i32,
}
