#![forbid(unsafe_code)]

//! Key manager registry.
//!
//! Maps key type URLs to key managers. Every mutation (registration, the
//! FIPS transition) goes through one write lock, so a registration can never
//! interleave with [`KeyManagerRegistry::restrict_to_fips_if_empty`].

use crate::config::RegistryConfig;
use crate::key::{KeyData, KeysetKey};
use crate::manager::KeyManager;
use crate::parameters::Parameters;
use crate::primitive::{Primitive, PrimitiveKind};
use nyckel_core::{Error, FipsCompatibility, FipsPolicy};
use nyckel_crypto::keyid;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

struct Entry {
    manager: Arc<dyn KeyManager>,
    manager_type: TypeId,
    manager_type_name: &'static str,
    primitive_kinds: &'static [PrimitiveKind],
    new_key_allowed: bool,
}

/// Registry of key managers keyed by type URL.
///
/// Entries are append-only: a type URL, once bound to an implementing type,
/// stays bound to it until [`reset_for_testing`](Self::reset_for_testing).
pub struct KeyManagerRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    fips: FipsPolicy,
}

impl KeyManagerRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            fips: FipsPolicy::new(config.fips_only, config.fips_module_available),
        }
    }

    /// The process-wide registry, built on first use from the default config.
    pub fn global() -> &'static KeyManagerRegistry {
        static GLOBAL: OnceLock<KeyManagerRegistry> = OnceLock::new();
        GLOBAL.get_or_init(KeyManagerRegistry::default)
    }

    /// FIPS policy of this registry. Managers built for it should hold a clone.
    pub fn fips_policy(&self) -> &FipsPolicy {
        &self.fips
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `manager` under its key type.
    ///
    /// The manager is bound to this registry's FIPS policy before it is stored.
    ///
    /// Registering the same implementing type again keeps the stored manager
    /// and only updates `new_key_allowed`. A flag can be tightened but never
    /// loosened.
    pub fn register<M>(
        &self,
        manager: M,
        fips_compatibility: FipsCompatibility,
        new_key_allowed: bool,
    ) -> Result<(), Error>
    where
        M: KeyManager + 'static,
    {
        self.insert(manager, fips_compatibility, new_key_allowed, false)
    }

    /// Like [`register`](Self::register), but replaces the stored manager
    /// instance when the implementing type matches. Bootstrapping only.
    pub fn register_overwriting<M>(
        &self,
        manager: M,
        fips_compatibility: FipsCompatibility,
        new_key_allowed: bool,
    ) -> Result<(), Error>
    where
        M: KeyManager + 'static,
    {
        self.insert(manager, fips_compatibility, new_key_allowed, true)
    }

    fn insert<M>(
        &self,
        mut manager: M,
        fips_compatibility: FipsCompatibility,
        new_key_allowed: bool,
        overwrite: bool,
    ) -> Result<(), Error>
    where
        M: KeyManager + 'static,
    {
        let type_url = manager.key_type();
        let manager_type = TypeId::of::<M>();
        let manager_type_name = type_name::<M>();

        manager.bind_fips_policy(&self.fips);
        let mut entries = self.write();

        // Checked under the lock so it is ordered with the FIPS transition.
        if !fips_compatibility.is_compatible(&self.fips) {
            return Err(Error::IncompatibleFipsMode(type_url.to_owned()));
        }

        if let Some(existing) = entries.get_mut(type_url) {
            if existing.manager_type != manager_type {
                warn!(
                    type_url,
                    existing = existing.manager_type_name,
                    attempted = manager_type_name,
                    "rejected conflicting key manager registration"
                );
                return Err(Error::ConflictingRegistration {
                    type_url: type_url.to_owned(),
                    existing: existing.manager_type_name,
                    attempted: manager_type_name,
                });
            }
            if new_key_allowed && !existing.new_key_allowed {
                warn!(type_url, "rejected attempt to allow new keys");
                return Err(Error::PolicyViolation(format!(
                    "new keys are already disallowed for {type_url}, cannot allow them again"
                )));
            }
            existing.new_key_allowed = new_key_allowed;
            if overwrite {
                existing.manager = Arc::new(manager);
                debug!(type_url, manager = manager_type_name, "replaced key manager");
            }
            return Ok(());
        }

        let primitive_kinds = manager.primitive_kinds();
        entries.insert(
            type_url.to_owned(),
            Entry {
                manager: Arc::new(manager),
                manager_type,
                manager_type_name,
                primitive_kinds,
                new_key_allowed,
            },
        );
        debug!(
            type_url,
            manager = manager_type_name,
            new_key_allowed,
            "registered key manager"
        );
        Ok(())
    }

    /// The manager for `type_url`, provided it can build `kind`.
    pub fn lookup(&self, type_url: &str, kind: PrimitiveKind) -> Result<Arc<dyn KeyManager>, Error> {
        let entries = self.read();
        let entry = entries
            .get(type_url)
            .ok_or_else(|| Error::UnknownKeyType(type_url.to_owned()))?;
        if !entry.primitive_kinds.contains(&kind) {
            let supported: Vec<&str> = entry.primitive_kinds.iter().map(|k| k.name()).collect();
            return Err(Error::UnsupportedPrimitive {
                type_url: type_url.to_owned(),
                requested: kind.to_string(),
                supported: supported.join(", "),
            });
        }
        Ok(Arc::clone(&entry.manager))
    }

    /// The manager for `type_url` regardless of the primitives it builds.
    pub fn untyped(&self, type_url: &str) -> Result<Arc<dyn KeyManager>, Error> {
        self.read()
            .get(type_url)
            .map(|entry| Arc::clone(&entry.manager))
            .ok_or_else(|| Error::UnknownKeyType(type_url.to_owned()))
    }

    pub fn is_registered(&self, type_url: &str) -> bool {
        self.read().contains_key(type_url)
    }

    pub fn is_new_key_allowed(&self, type_url: &str) -> Result<bool, Error> {
        self.read()
            .get(type_url)
            .map(|entry| entry.new_key_allowed)
            .ok_or_else(|| Error::UnknownKeyType(type_url.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Registered type URLs, sorted.
    pub fn type_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.read().keys().cloned().collect();
        urls.sort();
        urls
    }

    /// Switch to FIPS-only mode, provided nothing is registered yet.
    ///
    /// Does nothing when already restricted.
    pub fn restrict_to_fips_if_empty(&self) -> Result<(), Error> {
        let entries = self.write();
        if self.fips.is_restricted() {
            return Ok(());
        }
        if !entries.is_empty() {
            return Err(Error::NotEmpty(format!(
                "cannot restrict to FIPS with {} key managers registered",
                entries.len()
            )));
        }
        self.fips.restrict();
        info!("key manager registry restricted to FIPS");
        Ok(())
    }

    /// Generate a new key of type `type_url` from a serialized key format.
    pub fn new_key_data(&self, type_url: &str, serialized_key_format: &[u8]) -> Result<KeyData, Error> {
        let manager = {
            let entries = self.read();
            let entry = entries
                .get(type_url)
                .ok_or_else(|| Error::UnknownKeyType(type_url.to_owned()))?;
            if !entry.new_key_allowed {
                return Err(Error::PolicyViolation(format!(
                    "creating new keys is not allowed for {type_url}"
                )));
            }
            Arc::clone(&entry.manager)
        };
        debug!(type_url, "generating new key");
        manager.new_key_data(serialized_key_format)
    }

    /// Build the `kind` primitive for `key_data`.
    pub fn primitive(&self, key_data: &KeyData, kind: PrimitiveKind) -> Result<Primitive, Error> {
        let manager = self.lookup(&key_data.type_url, kind)?;
        debug!(type_url = %key_data.type_url, %kind, "creating primitive");
        manager.primitive(&key_data.value)
    }

    /// Generate a keyset key from `parameters` under a fresh random key id.
    pub fn new_key(&self, parameters: &Parameters) -> Result<KeysetKey, Error> {
        let key_data =
            self.new_key_data(parameters.type_url(), &parameters.serialized_key_format())?;
        let key = KeysetKey::new(keyid::rand_key_id(), parameters.output_prefix_type(), key_data);
        debug!(type_url = parameters.type_url(), key_id = key.key_id, "generated keyset key");
        Ok(key)
    }

    /// Build the `kind` primitive for a keyset key. Keys with a Tink output
    /// prefix carry their key id as the kid of every token they sign.
    pub fn keyset_primitive(&self, key: &KeysetKey, kind: PrimitiveKind) -> Result<Primitive, Error> {
        let primitive = self.primitive(&key.key_data, kind)?;
        Ok(match key.kid() {
            Some(kid) => primitive.with_keyset_kid(kid),
            None => primitive,
        })
    }

    /// Drop every entry. For test harnesses; a FIPS restriction stays in place.
    pub fn reset_for_testing(&self) {
        self.write().clear();
    }
}

impl Default for KeyManagerRegistry {
    fn default() -> Self {
        Self::new(&RegistryConfig::default())
    }
}

impl std::fmt::Debug for KeyManagerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManagerRegistry")
            .field("type_urls", &self.type_urls())
            .field("fips", &self.fips)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt_rsa::JwtRsaSsaPkcs1SignKeyManager;
    use crate::key::KeyMaterialType;
    use nyckel_core::algorithm::JWT_RSA_SSA_PKCS1_PRIVATE_KEY;
    use std::sync::Barrier;
    use std::thread;

    const STUB_TYPE_URL: &str = "type.googleapis.com/test.StubKey";

    macro_rules! stub_manager {
        ($name:ident) => {
            #[derive(Debug)]
            struct $name {
                type_url: &'static str,
                marker: u8,
            }

            impl $name {
                fn new(type_url: &'static str) -> Self {
                    Self {
                        type_url,
                        marker: 0,
                    }
                }
            }

            impl KeyManager for $name {
                fn key_type(&self) -> &'static str {
                    self.type_url
                }
                fn version(&self) -> u32 {
                    0
                }
                fn primitive_kinds(&self) -> &'static [PrimitiveKind] {
                    &[PrimitiveKind::JwtPublicKeyVerify]
                }
                fn key_material_type(&self) -> KeyMaterialType {
                    KeyMaterialType::Symmetric
                }
                fn fips_status(&self) -> FipsCompatibility {
                    FipsCompatibility::NotFips
                }
                fn primitive(&self, _serialized_key: &[u8]) -> Result<Primitive, Error> {
                    Err(Error::UnsupportedAlgorithm(stringify!($name).into()))
                }
                fn new_key_data(&self, _format: &[u8]) -> Result<KeyData, Error> {
                    Ok(KeyData::new(
                        self.type_url,
                        vec![self.marker],
                        KeyMaterialType::Symmetric,
                    ))
                }
            }
        };
    }

    stub_manager!(StubManager);
    stub_manager!(ImposterManager);

    fn jwt_manager() -> JwtRsaSsaPkcs1SignKeyManager {
        JwtRsaSsaPkcs1SignKeyManager::default()
    }

    #[test]
    fn test_register_same_type_twice_is_idempotent() {
        let registry = KeyManagerRegistry::default();
        let status = FipsCompatibility::RequiresCertifiedModule;
        registry.register(jwt_manager(), status, true).unwrap();
        registry.register(jwt_manager(), status, true).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.is_registered(JWT_RSA_SSA_PKCS1_PRIVATE_KEY));
    }

    #[test]
    fn test_conflicting_registration_in_both_orders() {
        let first = KeyManagerRegistry::default();
        first
            .register(StubManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, true)
            .unwrap();
        let err = first
            .register(ImposterManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, true)
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingRegistration { .. }));

        let second = KeyManagerRegistry::default();
        second
            .register(ImposterManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, false)
            .unwrap();
        let err = second
            .register(StubManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, true)
            .unwrap_err();
        match err {
            Error::ConflictingRegistration {
                type_url,
                existing,
                attempted,
            } => {
                assert_eq!(type_url, STUB_TYPE_URL);
                assert!(existing.ends_with("ImposterManager"));
                assert!(attempted.ends_with("StubManager"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_conflict_leaves_entry_untouched() {
        let registry = KeyManagerRegistry::default();
        registry
            .register(StubManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, true)
            .unwrap();
        let _ = registry.register(
            ImposterManager::new(STUB_TYPE_URL),
            FipsCompatibility::NotFips,
            false,
        );
        assert!(registry.is_new_key_allowed(STUB_TYPE_URL).unwrap());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_new_key_flag_tightens_but_never_loosens() {
        let registry = KeyManagerRegistry::default();
        let stub = || StubManager::new(STUB_TYPE_URL);
        registry.register(stub(), FipsCompatibility::NotFips, true).unwrap();
        registry.register(stub(), FipsCompatibility::NotFips, false).unwrap();
        assert!(!registry.is_new_key_allowed(STUB_TYPE_URL).unwrap());

        let err = registry
            .register(stub(), FipsCompatibility::NotFips, true)
            .unwrap_err();
        assert!(matches!(err, Error::PolicyViolation(_)));
        assert!(!registry.is_new_key_allowed(STUB_TYPE_URL).unwrap());
    }

    #[test]
    fn test_incompatible_fips_mode() {
        let registry = KeyManagerRegistry::new(&RegistryConfig {
            fips_only: true,
            fips_module_available: false,
        });
        let err = registry
            .register(jwt_manager(), FipsCompatibility::RequiresCertifiedModule, true)
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleFipsMode(url) if url == JWT_RSA_SSA_PKCS1_PRIVATE_KEY));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_fips_with_certified_module_accepts_rsa() {
        let registry = KeyManagerRegistry::new(&RegistryConfig {
            fips_only: true,
            fips_module_available: true,
        });
        registry
            .register(jwt_manager(), FipsCompatibility::RequiresCertifiedModule, true)
            .unwrap();
        assert!(matches!(
            registry.register(StubManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, true),
            Err(Error::IncompatibleFipsMode(_))
        ));
    }

    #[test]
    fn test_restrict_to_fips_requires_empty_registry() {
        let registry = KeyManagerRegistry::default();
        registry.restrict_to_fips_if_empty().unwrap();
        assert!(registry.fips_policy().is_restricted());
        // already restricted
        registry.restrict_to_fips_if_empty().unwrap();

        let populated = KeyManagerRegistry::default();
        populated
            .register(StubManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, true)
            .unwrap();
        assert!(matches!(
            populated.restrict_to_fips_if_empty(),
            Err(Error::NotEmpty(_))
        ));
        assert!(!populated.fips_policy().is_restricted());
    }

    #[test]
    fn test_fips_transition_races_with_registration() {
        for _ in 0..64 {
            let registry = KeyManagerRegistry::default();
            let barrier = Barrier::new(2);
            let (registered, restricted) = thread::scope(|s| {
                let register = s.spawn(|| {
                    barrier.wait();
                    registry.register(
                        StubManager::new(STUB_TYPE_URL),
                        FipsCompatibility::NotFips,
                        true,
                    )
                });
                let restrict = s.spawn(|| {
                    barrier.wait();
                    registry.restrict_to_fips_if_empty()
                });
                (register.join().unwrap(), restrict.join().unwrap())
            });
            assert!(
                registered.is_ok() != restricted.is_ok(),
                "exactly one of registration and FIPS transition must win"
            );
        }
    }

    #[test]
    fn test_lookup_errors() {
        let registry = KeyManagerRegistry::default();
        assert!(matches!(
            registry.lookup(JWT_RSA_SSA_PKCS1_PRIVATE_KEY, PrimitiveKind::JwtPublicKeySign),
            Err(Error::UnknownKeyType(_))
        ));

        registry
            .register(jwt_manager(), FipsCompatibility::RequiresCertifiedModule, true)
            .unwrap();
        let manager = registry
            .lookup(JWT_RSA_SSA_PKCS1_PRIVATE_KEY, PrimitiveKind::JwtPublicKeySign)
            .unwrap();
        assert_eq!(manager.key_type(), JWT_RSA_SSA_PKCS1_PRIVATE_KEY);

        match registry
            .lookup(JWT_RSA_SSA_PKCS1_PRIVATE_KEY, PrimitiveKind::JwtPublicKeyVerify)
            .map(|_| ())
        {
            Err(Error::UnsupportedPrimitive {
                requested,
                supported,
                ..
            }) => {
                assert_eq!(requested, "JwtPublicKeyVerify");
                assert_eq!(supported, "JwtPublicKeySign");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(registry.untyped(JWT_RSA_SSA_PKCS1_PRIVATE_KEY).is_ok());
    }

    #[test]
    fn test_new_key_data_respects_policy() {
        let registry = KeyManagerRegistry::default();
        registry
            .register(StubManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, true)
            .unwrap();
        let key = registry.new_key_data(STUB_TYPE_URL, b"format").unwrap();
        assert_eq!(key.type_url, STUB_TYPE_URL);

        registry
            .register(StubManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, false)
            .unwrap();
        assert!(matches!(
            registry.new_key_data(STUB_TYPE_URL, b"format"),
            Err(Error::PolicyViolation(_))
        ));
        assert!(matches!(
            registry.new_key_data("type.googleapis.com/missing", b""),
            Err(Error::UnknownKeyType(_))
        ));
    }

    #[test]
    fn test_register_overwriting_replaces_instance() {
        let registry = KeyManagerRegistry::default();
        registry
            .register(StubManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, true)
            .unwrap();

        let replacement = StubManager {
            type_url: STUB_TYPE_URL,
            marker: 7,
        };
        registry
            .register(
                StubManager {
                    type_url: STUB_TYPE_URL,
                    marker: 3,
                },
                FipsCompatibility::NotFips,
                true,
            )
            .unwrap();
        assert_eq!(registry.new_key_data(STUB_TYPE_URL, b"").unwrap().value, vec![0]);

        registry
            .register_overwriting(replacement, FipsCompatibility::NotFips, true)
            .unwrap();
        assert_eq!(registry.new_key_data(STUB_TYPE_URL, b"").unwrap().value, vec![7]);

        assert!(matches!(
            registry.register_overwriting(
                ImposterManager::new(STUB_TYPE_URL),
                FipsCompatibility::NotFips,
                true
            ),
            Err(Error::ConflictingRegistration { .. })
        ));
    }

    #[test]
    fn test_reset_for_testing() {
        let registry = KeyManagerRegistry::default();
        registry
            .register(StubManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, true)
            .unwrap();
        registry.reset_for_testing();
        assert!(registry.is_empty());
        registry
            .register(ImposterManager::new(STUB_TYPE_URL), FipsCompatibility::NotFips, true)
            .unwrap();
        assert_eq!(registry.type_urls(), vec![STUB_TYPE_URL.to_owned()]);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(
            KeyManagerRegistry::global(),
            KeyManagerRegistry::global()
        ));
    }
}
