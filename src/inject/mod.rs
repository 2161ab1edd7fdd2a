//! Statement injection into function items of Rust source.
//!
//! An injection locates one function item in a [`SourceModule`], splices
//! caller-supplied statements into its body after a relative line anchor,
//! and swaps the rebuilt item in. The rewrite is checked against a copy of
//! the module first: the copy must parse cleanly and the rebuilt item must
//! keep its [`MethodKind`](crate::MethodKind). Only then is the pre-injection
//! text recorded and the live module edited.
//!
//! ```
//! use harmonify::{InsertionSpec, Session, SourceModule};
//!
//! let mut module = SourceModule::new("api", "fn open_api() {\n    work();\n}\n");
//! let mut session = Session::new();
//!
//! session.inject_function(&mut module, "open_api", &InsertionSpec::new(1, "audit();"))?;
//! assert_eq!(module.text(), "fn open_api() {\n    work();\n    audit();\n}\n");
//!
//! session.undo_function_inject(&mut module, "open_api")?;
//! assert_eq!(module.text(), "fn open_api() {\n    work();\n}\n");
//! # Ok::<(), harmonify::InjectError>(())
//! ```

mod errors;
pub mod kind;
mod source;
pub mod splice;

pub use errors::InjectError;
pub use source::{ModuleId, SourceModule};
pub use splice::{insertion_index, InjectedBlock, InsertionSpec};

use crate::edit::{Edit, EditResult, EditVerification};
use crate::registry::{CallableIdentity, ContainerKey, InjectionRecord};
use crate::session::Session;
use crate::ts::{self, FunctionSource, FunctionTarget};
use crate::validate::{self, syn_validate};
use tracing::debug;

/// Attribute that opts an item out of injection.
pub const NO_INJECT: &str = "no_inject";

impl Session {
    /// Inject into a free function of `module`.
    ///
    /// Returns `Ok(false)` without touching anything when the function is
    /// marked `#[no_inject]`.
    pub fn inject_function(
        &mut self,
        module: &mut SourceModule,
        function_name: &str,
        spec: &InsertionSpec,
    ) -> Result<bool, InjectError> {
        self.inject(module, &FunctionTarget::function(function_name), spec)
    }

    /// Inject into a function of an `impl` block for `type_name`.
    pub fn inject_method(
        &mut self,
        module: &mut SourceModule,
        type_name: &str,
        method_name: &str,
        spec: &InsertionSpec,
    ) -> Result<bool, InjectError> {
        self.inject(module, &FunctionTarget::method(type_name, method_name), spec)
    }

    /// Dispatch on `target` for callers that already hold one.
    pub fn inject_target(
        &mut self,
        module: &mut SourceModule,
        target: &FunctionTarget,
        spec: &InsertionSpec,
    ) -> Result<bool, InjectError> {
        self.inject(module, target, spec)
    }

    pub fn undo_function_inject(
        &mut self,
        module: &mut SourceModule,
        function_name: &str,
    ) -> Result<(), InjectError> {
        self.undo(module, &FunctionTarget::function(function_name))
    }

    /// Put back the text the method had before its first injection.
    pub fn undo_method_inject(
        &mut self,
        module: &mut SourceModule,
        type_name: &str,
        method_name: &str,
    ) -> Result<(), InjectError> {
        self.undo(module, &FunctionTarget::method(type_name, method_name))
    }

    /// Undo every injection recorded against `module`, returning how many
    /// items were restored. Stops at the first item that cannot be restored.
    pub fn undo_module_injections(&mut self, module: &mut SourceModule) -> Result<usize, InjectError> {
        let targets: Vec<FunctionTarget> = self
            .injections
            .identities()
            .filter_map(|identity| target_in(module.id(), identity))
            .collect();

        for target in &targets {
            self.undo(module, target)?;
        }
        Ok(targets.len())
    }

    pub fn is_injected(&self, module: &SourceModule, target: &FunctionTarget) -> bool {
        self.injections.contains(&identity_of(module.id(), target))
    }

    fn inject(
        &mut self,
        module: &mut SourceModule,
        target: &FunctionTarget,
        spec: &InsertionSpec,
    ) -> Result<bool, InjectError> {
        let located = locate_in(module, target)?;
        if located.has_attribute(NO_INJECT) {
            debug!(module = module.name(), %target, "skipping item marked no_inject");
            return Ok(false);
        }

        let in_impl = matches!(target, FunctionTarget::Method { .. });
        let kind = kind::detect(&located.text, in_impl).map_err(|e| syntax_error(target, e))?;

        let rewritten = match spec.code() {
            Some(code) => match InjectedBlock::parse(code).map_err(|e| syntax_error(target, e))? {
                Some(block) => {
                    let index = insertion_index(&located.statement_lines(), spec.insert_after_line);
                    debug!(%target, anchor = spec.insert_after_line, index, "splicing statements");
                    splice::splice_edit(module.text(), &located, index, &block)
                        .preview(module.text())
                        .map_err(|e| InjectError::rebind(target, e))?
                }
                None => module.text().to_string(),
            },
            None => module.text().to_string(),
        };

        let compile_error = |source| InjectError::CompileError {
            module: module.name().to_string(),
            target: target.to_string(),
            source,
        };
        validate::validate_rewrite(module.text(), &rewritten).map_err(compile_error)?;
        syn_validate::validate_file(&rewritten).map_err(compile_error)?;

        let rebuilt = ts::locate(&rewritten, target).map_err(|e| InjectError::RebindError {
            target: target.to_string(),
            reason: e.to_string(),
        })?;
        let rebuilt_kind = kind::detect(&rebuilt.text, in_impl).map_err(|e| InjectError::RebindError {
            target: target.to_string(),
            reason: e.to_string(),
        })?;
        if rebuilt_kind != kind {
            return Err(InjectError::RebindError {
                target: target.to_string(),
                reason: format!("{kind} was rebuilt as a {rebuilt_kind}"),
            });
        }

        let applied = Edit::new(
            located.byte_start,
            located.byte_end,
            rebuilt.text.clone(),
            &located.text,
        )
        .apply_to(module.text_mut())
        .map_err(|e| InjectError::rebind(target, e))?;
        let bytes_changed = match applied {
            EditResult::Applied { bytes_changed } => bytes_changed,
            EditResult::AlreadyApplied => 0,
        };

        let identity = identity_of(module.id(), target);
        let (record, captured) = self
            .injections
            .capture_with(identity, || InjectionRecord::new(located.text));
        record.after = rebuilt.text;
        record.injections += 1;
        debug!(
            module = module.name(),
            %target,
            %kind,
            captured,
            injections = record.injections,
            bytes_changed,
            "injected"
        );
        Ok(true)
    }

    fn undo(&mut self, module: &mut SourceModule, target: &FunctionTarget) -> Result<(), InjectError> {
        let identity = identity_of(module.id(), target);
        let (before, after) = match self.injections.get(&identity) {
            Some(record) => (record.before.clone(), record.after.clone()),
            None => return Err(InjectError::NotInjected { identity }),
        };

        let current = locate_in(module, target)?;
        let restored = Edit::with_verification(
            current.byte_start,
            current.byte_end,
            before,
            EditVerification::ExactMatch(after),
        )
        .apply_to(module.text_mut())
        .map_err(|e| InjectError::rebind(target, e))?;

        self.injections.release(&identity);
        match restored {
            EditResult::Applied { .. } => {
                debug!(module = module.name(), %target, "restored pre-injection source")
            }
            EditResult::AlreadyApplied => {
                debug!(module = module.name(), %target, "item already held its pre-injection source")
            }
        }
        Ok(())
    }
}

fn locate_in(module: &SourceModule, target: &FunctionTarget) -> Result<FunctionSource, InjectError> {
    ts::locate(module.text(), target).map_err(|source| InjectError::SourceUnavailable {
        module: module.name().to_string(),
        target: target.to_string(),
        source,
    })
}

fn syntax_error(target: &FunctionTarget, error: syn::Error) -> InjectError {
    InjectError::SyntaxInjectionError {
        target: target.to_string(),
        message: error.to_string(),
    }
}

fn identity_of(module: &ModuleId, target: &FunctionTarget) -> CallableIdentity {
    match target {
        FunctionTarget::Function { name } => CallableIdentity::function(module.clone(), name),
        FunctionTarget::Method { type_name, name } => {
            CallableIdentity::method(module.clone(), type_name, name)
        }
    }
}

fn target_in(module: &ModuleId, identity: &CallableIdentity) -> Option<FunctionTarget> {
    match &identity.container {
        ContainerKey::Module { module: owner } if owner == module => {
            Some(FunctionTarget::function(&identity.name))
        }
        ContainerKey::Type {
            module: owner,
            type_name,
        } if owner == module => Some(FunctionTarget::method(type_name, &identity.name)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MethodKind;

    const API: &str = r#"use std::fmt;

pub fn get_info() -> String {
    let name = "harmonify";
    let version = 1;

    format!("{name} v{version}")
}

#[harmonify::no_inject]
pub fn restricted_api(user: &str, password: &str) {
    login(user, password);
}

pub struct Widget {
    size: u32,
}

impl Widget {
    pub fn new() -> Self {
        Widget { size: 1 }
    }

    pub fn version() -> u32 {
        3
    }

    pub fn grow(&mut self) {
        self.size += 1;
    }
}
"#;

    fn api() -> SourceModule {
        SourceModule::new("api", API)
    }

    #[test]
    fn inject_then_undo_round_trips() {
        let mut module = api();
        let mut session = Session::new();

        assert!(session
            .inject_function(&mut module, "get_info", &InsertionSpec::new(1, "audit(\"get_info\");"))
            .unwrap());
        assert!(module.text().contains(
            "    let name = \"harmonify\";\n    audit(\"get_info\");\n    let version = 1;"
        ));
        assert!(session.is_injected(&module, &FunctionTarget::function("get_info")));

        session.undo_function_inject(&mut module, "get_info").unwrap();
        assert_eq!(module.text(), API);
        assert!(session.injections().is_empty());
    }

    #[test]
    fn anchor_counts_body_lines_from_one() {
        let mut module = SourceModule::new("api", "fn open_api() {\n    work();\n    done();\n}\n");
        let mut session = Session::new();

        session
            .inject_function(&mut module, "open_api", &InsertionSpec::new(1, "audit();"))
            .unwrap();
        assert_eq!(
            module.text(),
            "fn open_api() {\n    work();\n    audit();\n    done();\n}\n"
        );
    }

    #[test]
    fn anchor_zero_goes_after_inner_attributes() {
        let source = "fn run() {\n    #![allow(unused)]\n    work();\n}\n";
        let mut module = SourceModule::new("m", source);
        let mut session = Session::new();

        assert!(session
            .inject_function(&mut module, "run", &InsertionSpec::new(0, "audit();"))
            .unwrap());
        assert_eq!(
            module.text(),
            "fn run() {\n    #![allow(unused)]\n    audit();\n    work();\n}\n"
        );
        session.undo_function_inject(&mut module, "run").unwrap();
        assert_eq!(module.text(), source);
    }

    #[test]
    fn anchor_zero_inserts_at_the_top() {
        let mut module = api();
        let mut session = Session::new();

        session
            .inject_method(&mut module, "Widget", "grow", &InsertionSpec::new(0, "trace();"))
            .unwrap();
        assert!(module
            .text()
            .contains("pub fn grow(&mut self) {\n        trace();\n        self.size += 1;\n    }"));
    }

    #[test]
    fn static_methods_stay_static() {
        let mut module = api();
        let mut session = Session::new();

        assert!(session
            .inject_method(&mut module, "Widget", "version", &InsertionSpec::new(0, "let _ = 0;"))
            .unwrap());
        let rebuilt = ts::locate(module.text(), &FunctionTarget::method("Widget", "version")).unwrap();
        assert_eq!(kind::detect(&rebuilt.text, true).unwrap(), MethodKind::Static);

        session
            .inject_method(&mut module, "Widget", "new", &InsertionSpec::new(0, "let _ = 0;"))
            .unwrap();
        let rebuilt = ts::locate(module.text(), &FunctionTarget::method("Widget", "new")).unwrap();
        assert_eq!(kind::detect(&rebuilt.text, true).unwrap(), MethodKind::Class);
    }

    #[test]
    fn reinjection_keeps_the_first_snapshot() {
        let mut module = api();
        let mut session = Session::new();
        let target = FunctionTarget::function("get_info");

        session
            .inject_function(&mut module, "get_info", &InsertionSpec::new(0, "first();"))
            .unwrap();
        session
            .inject_function(&mut module, "get_info", &InsertionSpec::new(0, "second();"))
            .unwrap();

        let record = session
            .injections()
            .get(&identity_of(module.id(), &target))
            .unwrap();
        assert_eq!(record.injections, 2);
        assert!(record.before.starts_with("pub fn get_info() -> String {\n    let name"));
        assert!(record.after.contains("second();\n    first();"));

        session.undo_function_inject(&mut module, "get_info").unwrap();
        assert_eq!(module.text(), API);
    }

    #[test]
    fn empty_spec_still_records() {
        let mut module = api();
        let mut session = Session::new();

        assert!(session
            .inject_function(&mut module, "get_info", &InsertionSpec::empty())
            .unwrap());
        assert_eq!(module.text(), API);
        assert_eq!(session.injections().len(), 1);

        session.undo_function_inject(&mut module, "get_info").unwrap();
        assert!(session.injections().is_empty());
    }

    #[test]
    fn no_inject_items_are_left_alone() {
        let mut module = api();
        let mut session = Session::new();

        assert!(!session
            .inject_function(&mut module, "restricted_api", &InsertionSpec::new(1, "steal(user);"))
            .unwrap());
        assert_eq!(module.text(), API);
        assert!(session.injections().is_empty());
    }

    #[test]
    fn cfg_attr_no_inject_is_honored() {
        let source = "#[cfg_attr(any(), no_inject)]\nfn vault() {\n    open();\n}\n";
        let mut module = SourceModule::new("m", source);
        let mut session = Session::new();

        assert!(!session
            .inject_function(&mut module, "vault", &InsertionSpec::new(0, "steal();"))
            .unwrap());
        assert_eq!(module.text(), source);
        assert!(session.injections().is_empty());
    }

    #[test]
    fn same_named_modules_keep_separate_records() {
        let mut first = SourceModule::new("api", "fn get_info() {\n    alpha();\n}\n");
        let mut second = SourceModule::new("api", "fn get_info() {\n    beta();\n}\n");
        let mut session = Session::new();

        session
            .inject_function(&mut first, "get_info", &InsertionSpec::new(1, "x();"))
            .unwrap();
        session
            .inject_function(&mut second, "get_info", &InsertionSpec::new(1, "x();"))
            .unwrap();
        assert_eq!(session.injections().len(), 2);

        session.undo_function_inject(&mut second, "get_info").unwrap();
        assert_eq!(second.text(), "fn get_info() {\n    beta();\n}\n");
        assert!(session.is_injected(&first, &FunctionTarget::function("get_info")));

        session.undo_function_inject(&mut first, "get_info").unwrap();
        assert_eq!(first.text(), "fn get_info() {\n    alpha();\n}\n");
        assert!(session.injections().is_empty());
    }

    #[test]
    fn undo_without_record_is_not_injected() {
        let mut module = api();
        let mut session = Session::new();
        assert!(matches!(
            session.undo_method_inject(&mut module, "Widget", "grow"),
            Err(InjectError::NotInjected { .. })
        ));
    }

    #[test]
    fn missing_items_are_source_unavailable() {
        let mut module = api();
        let mut session = Session::new();
        assert!(matches!(
            session.inject_function(&mut module, "open_api", &InsertionSpec::new(0, "x();")),
            Err(InjectError::SourceUnavailable { .. })
        ));
        assert!(matches!(
            session.inject_method(&mut module, "Gadget", "grow", &InsertionSpec::new(0, "x();")),
            Err(InjectError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn bad_code_is_a_syntax_error() {
        let mut module = api();
        let mut session = Session::new();
        assert!(matches!(
            session.inject_function(&mut module, "get_info", &InsertionSpec::new(1, "let = ;")),
            Err(InjectError::SyntaxInjectionError { .. })
        ));
        assert_eq!(module.text(), API);
    }

    #[test]
    fn splicing_past_the_tail_expression_fails_to_compile() {
        let mut module = api();
        let mut session = Session::new();
        assert!(matches!(
            session.inject_function(&mut module, "get_info", &InsertionSpec::new(10, "trace();")),
            Err(InjectError::CompileError { .. })
        ));
        assert_eq!(module.text(), API);
        assert!(session.injections().is_empty());
    }

    #[test]
    fn stale_undo_is_a_rebind_error() {
        let mut module = api();
        let mut session = Session::new();
        session
            .inject_method(&mut module, "Widget", "grow", &InsertionSpec::new(1, "trace();"))
            .unwrap();

        let tampered = module.text().replace("trace();", "other();");
        *module.text_mut() = tampered;

        assert!(matches!(
            session.undo_method_inject(&mut module, "Widget", "grow"),
            Err(InjectError::RebindError { .. })
        ));
        assert!(session.is_injected(&module, &FunctionTarget::method("Widget", "grow")));
    }

    #[test]
    fn undo_module_injections_restores_everything() {
        let mut module = api();
        let mut other = SourceModule::new("other", "fn get_info() {}\n");
        let mut session = Session::new();

        session
            .inject_function(&mut module, "get_info", &InsertionSpec::new(1, "a();"))
            .unwrap();
        session
            .inject_target(&mut module, &FunctionTarget::method("Widget", "grow"), &InsertionSpec::new(1, "b();"))
            .unwrap();
        session
            .inject_function(&mut other, "get_info", &InsertionSpec::new(1, "c();"))
            .unwrap();

        assert_eq!(session.undo_module_injections(&mut module).unwrap(), 2);
        assert_eq!(module.text(), API);
        assert_eq!(session.injections().len(), 1);
    }
}
