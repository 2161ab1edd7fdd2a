//! Injection against files on disk: load, inject, save, reload, undo.

use harmonify::ts::FunctionTarget;
use harmonify::{InjectError, InsertionSpec, MethodKind, Session, SourceModule};
use std::fs;
use tempfile::TempDir;

const SERVICE: &str = r#"//! Request handling.

use std::collections::HashMap;

/// Looks a user up.
pub fn lookup(users: &HashMap<u32, String>, id: u32) -> Option<String> {
    // fast path first
    let found = users.get(&id).cloned();
    if found.is_none() {
        return None;
    }
    found
}

pub struct Cache<T> {
    entries: Vec<T>,
}

impl<T: Clone> Cache<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Cache {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: T) {
        self.entries.push(entry);
    }
}
"#;

fn workspace() -> (TempDir, std::path::PathBuf) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("harmonify=debug")
        .with_test_writer()
        .try_init();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("service.rs");
    fs::write(&path, SERVICE).unwrap();
    (dir, path)
}

#[test]
fn inject_save_reload_undo() {
    let (_dir, path) = workspace();
    let mut session = Session::new();

    let mut module = SourceModule::load(&path).unwrap();
    let injected = session
        .inject_function(
            &mut module,
            "lookup",
            &InsertionSpec::new(2, "record_lookup(id);"),
        )
        .unwrap();
    assert!(injected);
    module.save().unwrap();

    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(on_disk.contains(
        "    let found = users.get(&id).cloned();\n    record_lookup(id);\n    if found.is_none() {"
    ));
    // comments and docs around the item are untouched
    assert!(on_disk.contains("/// Looks a user up.\npub fn lookup"));
    assert!(on_disk.contains("    // fast path first\n"));
    assert!(syn::parse_file(&on_disk).is_ok());

    session.undo_function_inject(&mut module, "lookup").unwrap();
    module.save().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), SERVICE);
}

#[test]
fn generic_impl_methods_keep_their_kind() {
    let (_dir, path) = workspace();
    let mut session = Session::new();
    let mut module = SourceModule::load(&path).unwrap();

    assert!(session
        .inject_method(&mut module, "Cache", "with_capacity", &InsertionSpec::new(0, "let capacity = capacity.max(1);"))
        .unwrap());
    assert!(session
        .inject_method(&mut module, "Cache", "push", &InsertionSpec::new(0, "let _ = self.entries.len();"))
        .unwrap());

    let text = module.text();
    assert!(text.contains(
        "    pub fn with_capacity(capacity: usize) -> Self {\n        let capacity = capacity.max(1);\n        Cache {"
    ));
    assert!(text.contains(
        "        let _ = self.entries.len();\n        self.entries.push(entry);\n"
    ));

    assert_eq!(session.injections().len(), 2);
    assert_eq!(session.undo_module_injections(&mut module).unwrap(), 2);
    assert_eq!(module.text(), SERVICE);
    assert!(session.injections().is_empty());
}

#[test]
fn repeated_injection_undoes_to_the_first_snapshot() {
    let mut module = SourceModule::new("service", SERVICE);
    let mut session = Session::new();

    for code in ["first();", "second();"] {
        session
            .inject_function(&mut module, "lookup", &InsertionSpec::new(1, code))
            .unwrap();
    }
    assert!(module
        .text()
        .contains("{\n    second();\n    first();\n    // fast path first"));
    assert!(session.is_injected(&module, &FunctionTarget::function("lookup")));

    session.undo_function_inject(&mut module, "lookup").unwrap();
    assert_eq!(module.text(), SERVICE);
    assert!(!session.is_injected(&module, &FunctionTarget::function("lookup")));
}

#[test]
fn failures_leave_the_module_untouched() {
    let mut module = SourceModule::new("service", SERVICE);
    let mut session = Session::new();

    let err = session
        .inject_function(&mut module, "lookup", &InsertionSpec::new(2, "let x = ;"))
        .unwrap_err();
    assert!(matches!(err, InjectError::SyntaxInjectionError { .. }));

    let err = session
        .inject_method(&mut module, "Store", "push", &InsertionSpec::new(1, "a();"))
        .unwrap_err();
    assert!(matches!(err, InjectError::SourceUnavailable { .. }));

    let err = session
        .undo_method_inject(&mut module, "Cache", "push")
        .unwrap_err();
    assert!(matches!(err, InjectError::NotInjected { .. }));

    assert_eq!(module.text(), SERVICE);
    assert!(session.injections().is_empty());
}

#[test]
fn hand_edits_block_undo() {
    let (_dir, path) = workspace();
    let mut module = SourceModule::load(&path).unwrap();
    let mut session = Session::new();
    session
        .inject_method(&mut module, "Cache", "push", &InsertionSpec::new(1, "audit();"))
        .unwrap();
    module.save().unwrap();

    let injected = fs::read_to_string(&path).unwrap();
    let edited = injected.replace("audit();", "audit_v2();");
    fs::write(&path, &edited).unwrap();
    module.reload().unwrap();

    let err = session
        .undo_method_inject(&mut module, "Cache", "push")
        .unwrap_err();
    assert!(matches!(err, InjectError::RebindError { .. }));
    assert_eq!(module.text(), edited);
    // the record survives so the undo can be retried after reverting the hand edit
    assert_eq!(session.injections().len(), 1);

    fs::write(&path, &injected).unwrap();
    module.reload().unwrap();
    session.undo_method_inject(&mut module, "Cache", "push").unwrap();
    assert_eq!(module.text(), SERVICE);
}

#[test]
fn modules_loaded_twice_do_not_share_records() {
    let (_dir, path) = workspace();
    let mut first = SourceModule::load(&path).unwrap();
    let mut second = SourceModule::load(&path).unwrap();
    assert_eq!(first.name(), second.name());

    let mut session = Session::new();
    session
        .inject_function(&mut first, "lookup", &InsertionSpec::new(0, "first();"))
        .unwrap();

    assert!(!session.is_injected(&second, &FunctionTarget::function("lookup")));
    assert!(matches!(
        session.undo_function_inject(&mut second, "lookup"),
        Err(InjectError::NotInjected { .. })
    ));
    assert_eq!(second.text(), SERVICE);

    session.undo_function_inject(&mut first, "lookup").unwrap();
    assert_eq!(first.text(), SERVICE);
}

#[test]
fn kind_detection_matches_signatures() {
    use harmonify::inject::kind::detect;

    assert_eq!(
        detect("pub fn with_capacity(capacity: usize) -> Self { todo!() }", true).unwrap(),
        MethodKind::Class
    );
    assert_eq!(
        detect("pub fn push(&mut self, entry: T) {}", true).unwrap(),
        MethodKind::Instance
    );
}
