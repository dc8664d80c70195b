#![forbid(unsafe_code)]

//! Named key-generation parameters ("templates").

use crate::jwt_rsa::parameters::JwtRsaSsaPkcs1Parameters;
use crate::key::OutputPrefixType;
use nyckel_core::Error;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};
use tracing::debug;

/// Parameters for generating a key of one key type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameters {
    JwtRsaSsaPkcs1(JwtRsaSsaPkcs1Parameters),
}

impl Parameters {
    /// Type URL of the keys these parameters generate.
    pub fn type_url(&self) -> &'static str {
        match self {
            Self::JwtRsaSsaPkcs1(_) => nyckel_core::algorithm::JWT_RSA_SSA_PKCS1_PRIVATE_KEY,
        }
    }

    /// Output prefix of keyset keys generated from these parameters.
    pub fn output_prefix_type(&self) -> OutputPrefixType {
        match self {
            Self::JwtRsaSsaPkcs1(p) => p.output_prefix_type(),
        }
    }

    /// Serialized key format to hand to the key manager.
    pub fn serialized_key_format(&self) -> Vec<u8> {
        use prost::Message;
        match self {
            Self::JwtRsaSsaPkcs1(p) => p.to_key_format().encode_to_vec(),
        }
    }
}

/// Table of template name → parameters.
///
/// Names are write-once: re-adding a name is accepted only with equal parameters.
#[derive(Default)]
pub struct ParametersRegistry {
    entries: RwLock<HashMap<String, Parameters>>,
}

impl ParametersRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide table.
    pub fn global() -> &'static ParametersRegistry {
        static GLOBAL: OnceLock<ParametersRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ParametersRegistry::new)
    }

    /// Merge `parameters` into the table.
    ///
    /// Either every entry is merged or, on a conflict, none is.
    pub fn put_all<I>(&self, parameters: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (String, Parameters)>,
    {
        let incoming: Vec<(String, Parameters)> = parameters.into_iter().collect();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        for (i, (name, value)) in incoming.iter().enumerate() {
            let earlier_in_batch = incoming[..i].iter().find(|(n, _)| n == name);
            let existing = entries
                .get(name)
                .or(earlier_in_batch.map(|(_, v)| v));
            if existing.is_some_and(|existing| existing != value) {
                return Err(Error::ConflictingTemplate(name.clone()));
            }
        }

        let count = incoming.len();
        entries.extend(incoming);
        debug!(count, "merged named parameters");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Parameters, Error> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownTemplate(name.to_owned()))
    }

    /// All template names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
