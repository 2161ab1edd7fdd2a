//! The owner of both registries.
//!
//! Wrap operations live in [`crate::wrap`], injection operations in
//! [`crate::inject`]; both are methods on [`Session`]. Independent sessions
//! never see each other's records, so a test can build one, patch freely,
//! and tear it down with [`Session::unpatch_all`].

use crate::registry::{InjectionRecord, PatchRecord, Registry};

#[derive(Debug, Default)]
pub struct Session {
    pub(crate) patches: Registry<PatchRecord>,
    pub(crate) injections: Registry<InjectionRecord>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Originals captured by the wrap engine.
    pub fn patches(&self) -> &Registry<PatchRecord> {
        &self.patches
    }

    /// Snapshots captured by the injection engine.
    pub fn injections(&self) -> &Registry<InjectionRecord> {
        &self.injections
    }
}
