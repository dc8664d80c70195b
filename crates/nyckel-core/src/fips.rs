#![forbid(unsafe_code)]

//! FIPS policy.
//!
//! A [`FipsPolicy`] is a shared flag: cloning it yields a handle onto the same
//! restriction state, so key managers built from a registry observe the
//! registry's transition into FIPS-only mode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Declared FIPS conformance of an algorithm implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FipsCompatibility {
    /// Not usable once the process is restricted to FIPS.
    NotFips,
    /// Usable under FIPS only when a certified crypto module is available.
    RequiresCertifiedModule,
}

impl FipsCompatibility {
    /// Whether an algorithm with this compatibility may be used under `policy`.
    pub fn is_compatible(self, policy: &FipsPolicy) -> bool {
        match self {
            Self::NotFips => !policy.is_restricted(),
            Self::RequiresCertifiedModule => {
                !policy.is_restricted() || policy.module_available()
            }
        }
    }
}

/// Process-level FIPS restriction state.
#[derive(Debug, Clone, Default)]
pub struct FipsPolicy {
    restricted: Arc<AtomicBool>,
    module_available: bool,
}

impl FipsPolicy {
    pub fn new(restricted: bool, module_available: bool) -> Self {
        Self {
            restricted: Arc::new(AtomicBool::new(restricted)),
            module_available,
        }
    }

    /// A policy that is not restricted and has no certified module.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted.load(Ordering::Acquire)
    }

    /// Whether a FIPS-certified crypto module backs the engine.
    pub fn module_available(&self) -> bool {
        self.module_available
    }

    /// Switch to FIPS-only mode. One-way.
    ///
    /// Callers owning a registry must hold its write lock while calling this
    /// so that the transition is ordered with respect to registrations.
    pub fn restrict(&self) {
        self.restricted.store(true, Ordering::Release);
    }
}
