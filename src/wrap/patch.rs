use crate::runtime::Callable;
use crate::wrap::HookSet;
use std::fmt;

/// Everything one [`Session::apply`](crate::Session::apply) call does to a
/// class: hooks for the target method, plus an optional method to create and
/// one to delete.
#[derive(Clone, Default)]
pub struct Patch {
    pub hooks: HookSet,
    pub create: Option<(String, Callable)>,
    pub delete: Option<String>,
}

impl Patch {
    pub fn new(hooks: HookSet) -> Self {
        Self {
            hooks,
            ..Self::default()
        }
    }

    pub fn create(mut self, name: impl Into<String>, body: Callable) -> Self {
        self.create = Some((name.into(), body));
        self
    }

    pub fn delete(mut self, name: impl Into<String>) -> Self {
        self.delete = Some(name.into());
        self
    }
}

impl fmt::Debug for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Patch")
            .field("hooks", &self.hooks)
            .field("create", &self.create.as_ref().map(|(name, _)| name))
            .field("delete", &self.delete)
            .finish()
    }
}
