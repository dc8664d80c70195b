#![forbid(unsafe_code)]

//! Serialized key material tagged with its key type, and keyset entries.

use crate::proto;
use nyckel_core::Error;
use nyckel_jwt::format::kid_for_key_id;
use prost::Message;

/// What kind of secret a serialized key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMaterialType {
    Symmetric,
    AsymmetricPrivate,
    AsymmetricPublic,
    Remote,
}

impl KeyMaterialType {
    fn to_proto(self) -> proto::KeyMaterialType {
        match self {
            Self::Symmetric => proto::KeyMaterialType::Symmetric,
            Self::AsymmetricPrivate => proto::KeyMaterialType::AsymmetricPrivate,
            Self::AsymmetricPublic => proto::KeyMaterialType::AsymmetricPublic,
            Self::Remote => proto::KeyMaterialType::Remote,
        }
    }

    fn from_proto(value: i32) -> Result<Self, Error> {
        match proto::KeyMaterialType::try_from(value) {
            Ok(proto::KeyMaterialType::Symmetric) => Ok(Self::Symmetric),
            Ok(proto::KeyMaterialType::AsymmetricPrivate) => Ok(Self::AsymmetricPrivate),
            Ok(proto::KeyMaterialType::AsymmetricPublic) => Ok(Self::AsymmetricPublic),
            Ok(proto::KeyMaterialType::Remote) => Ok(Self::Remote),
            _ => Err(Error::MalformedKeyData(format!(
                "unknown key material type {value}"
            ))),
        }
    }
}

/// How output of a keyset key identifies the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPrefixType {
    /// Output names the key by its keyset key id; for JWTs, the `kid` header.
    Tink,
    /// Output does not identify the key.
    Raw,
}

/// A serialized key together with the type URL of its schema.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyData {
    /// Key type URL; selects the key manager.
    pub type_url: String,
    /// Serialized key message.
    pub value: Vec<u8>,
    pub key_material_type: KeyMaterialType,
}

impl KeyData {
    pub fn new(
        type_url: impl Into<String>,
        value: Vec<u8>,
        key_material_type: KeyMaterialType,
    ) -> Self {
        Self {
            type_url: type_url.into(),
            value,
            key_material_type,
        }
    }
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.key_material_type {
            KeyMaterialType::AsymmetricPublic => write!(
                f,
                "public key {} ({} bytes)",
                self.type_url,
                self.value.len()
            ),
            _ => write!(f, "secret key {} ({} bytes)", self.type_url, self.value.len()),
        }
    }
}

/// A key as stored in a keyset: key data plus the id the keyset knows it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysetKey {
    pub key_id: u32,
    pub output_prefix_type: OutputPrefixType,
    pub key_data: KeyData,
}

impl KeysetKey {
    pub fn new(key_id: u32, output_prefix_type: OutputPrefixType, key_data: KeyData) -> Self {
        Self {
            key_id,
            output_prefix_type,
            key_data,
        }
    }

    /// The `kid` header tokens signed with this key must carry, if any.
    pub fn kid(&self) -> Option<String> {
        match self.output_prefix_type {
            OutputPrefixType::Tink => Some(kid_for_key_id(self.key_id)),
            OutputPrefixType::Raw => None,
        }
    }

    /// The same entry with its key data replaced.
    pub fn with_key_data(&self, key_data: KeyData) -> Self {
        Self {
            key_data,
            ..self.clone()
        }
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let output_prefix_type = match self.output_prefix_type {
            OutputPrefixType::Tink => proto::OutputPrefixType::Tink,
            OutputPrefixType::Raw => proto::OutputPrefixType::Raw,
        };
        proto::KeysetKey {
            key_data: Some(proto::KeyData {
                type_url: self.key_data.type_url.clone(),
                value: self.key_data.value.clone(),
                key_material_type: self.key_data.key_material_type.to_proto() as i32,
            }),
            status: proto::KeyStatusType::Enabled as i32,
            key_id: self.key_id,
            output_prefix_type: output_prefix_type as i32,
        }
        .encode_to_vec()
    }

    /// Decode an enabled keyset entry.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let entry = proto::KeysetKey::decode(bytes)
            .map_err(|e| Error::MalformedKeyData(format!("keyset key: {e}")))?;
        if entry.status != proto::KeyStatusType::Enabled as i32 {
            return Err(Error::MalformedKeyData(format!(
                "keyset key {} is not enabled",
                entry.key_id
            )));
        }
        let output_prefix_type = match proto::OutputPrefixType::try_from(entry.output_prefix_type) {
            Ok(proto::OutputPrefixType::Tink) => OutputPrefixType::Tink,
            Ok(proto::OutputPrefixType::Raw) => OutputPrefixType::Raw,
            _ => {
                return Err(Error::MalformedKeyData(format!(
                    "unsupported output prefix type {}",
                    entry.output_prefix_type
                )))
            }
        };
        let key_data = entry
            .key_data
            .ok_or_else(|| Error::MalformedKeyData("keyset key has no key data".into()))?;
        Ok(Self {
            key_id: entry.key_id,
            output_prefix_type,
            key_data: KeyData::new(
                key_data.type_url,
                key_data.value,
                KeyMaterialType::from_proto(key_data.key_material_type)?,
            ),
        })
    }
}
