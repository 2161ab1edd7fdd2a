use crate::edit;
use crate::inject::errors::InjectError;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MODULE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of a [`SourceModule`].
///
/// Equality and hashing look at the number only. The module name rides
/// along for messages.
#[derive(Debug, Clone)]
pub struct ModuleId {
    id: u64,
    name: String,
}

impl ModuleId {
    pub(crate) fn fresh(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
        }
    }

    pub fn id(&self) -> &u64 {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for ModuleId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ModuleId {}

impl Hash for ModuleId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The text of one Rust source file, the unit injection rewrites.
///
/// Injection records are keyed by the module's [`ModuleId`], which every
/// constructor draws fresh. Two modules never share history, even when they
/// carry the same name or were loaded from the same path. Modules loaded from
/// disk are named after their path.
#[derive(Debug)]
pub struct SourceModule {
    id: ModuleId,
    path: Option<PathBuf>,
    text: String,
}

impl SourceModule {
    /// An in-memory module.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: ModuleId::fresh(name),
            path: None,
            text: text.into(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InjectError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| InjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            id: ModuleId::fresh(path.display().to_string()),
            path: Some(path.to_path_buf()),
            text,
        })
    }

    /// Re-read the file the module was loaded from, keeping its identity.
    ///
    /// Picks up edits made on disk since the last load or save. In-memory
    /// modules are left alone.
    pub fn reload(&mut self) -> Result<(), InjectError> {
        if let Some(path) = &self.path {
            self.text = fs::read_to_string(path).map_err(|source| InjectError::Io {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Write the current text back to the file the module was loaded from.
    /// In-memory modules have nowhere to go and are left alone.
    pub fn save(&self) -> Result<(), InjectError> {
        match &self.path {
            Some(path) => {
                edit::write_atomic(path, self.text.as_bytes()).map_err(|source| InjectError::Io {
                    path: path.clone(),
                    source,
                })
            }
            None => Ok(()),
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        fs::write(&path, "fn a() {}\n").unwrap();

        let mut module = SourceModule::load(&path).unwrap();
        assert_eq!(module.path(), Some(path.as_path()));
        assert_eq!(module.name(), path.display().to_string());

        module.text_mut().push_str("fn b() {}\n");
        module.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fn a() {}\nfn b() {}\n");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SourceModule::load(dir.path().join("absent.rs")),
            Err(InjectError::Io { .. })
        ));
    }

    #[test]
    fn reload_picks_up_disk_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        fs::write(&path, "fn a() {}\n").unwrap();

        let mut module = SourceModule::load(&path).unwrap();
        let id = module.id().clone();
        fs::write(&path, "fn a() { b(); }\n").unwrap();
        module.reload().unwrap();

        assert_eq!(module.text(), "fn a() { b(); }\n");
        assert_eq!(module.id(), &id);
    }

    #[test]
    fn same_names_get_distinct_ids() {
        let first = SourceModule::new("api", "fn a() {}");
        let second = SourceModule::new("api", "fn a() {}");
        assert_ne!(first.id(), second.id());
        assert_eq!(first.id().to_string(), "api");
    }

    #[test]
    fn in_memory_save_is_a_no_op() {
        let module = SourceModule::new("scratch", "fn a() {}");
        assert!(module.save().is_ok());
        assert_eq!(module.into_text(), "fn a() {}");
    }
}
