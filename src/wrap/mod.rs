//! Call interception without touching source.
//!
//! Patching swaps the callable stored under a name for a dispatcher that runs
//! the supplied [`HookSet`] around the original. The original is captured in
//! the session's patch registry the first time an identity is patched, and
//! unpatching puts exactly that object back.
//!
//! ```
//! use harmonify::{CallArgs, Callable, FlowState, HookSet, Namespace, PrefixOutcome, Session};
//! use serde_json::json;
//!
//! let api = Namespace::module("api");
//! api.define("greet", Callable::function(|args| {
//!     Ok(json!(format!("hello {}", args.str_arg(0)?)))
//! }));
//!
//! let mut session = Session::new();
//! assert!(session.patch_function(&api, "greet", HookSet::new().prefix(|_, args| {
//!     if args.str_arg(0)? == "root" {
//!         return Ok(PrefixOutcome::stop(json!("denied")));
//!     }
//!     Ok(FlowState::Continue.into())
//! })));
//!
//! assert_eq!(api.call("greet", &CallArgs::from_values([json!("root")])).unwrap(), json!("denied"));
//! assert_eq!(api.call("greet", &CallArgs::from_values([json!("ada")])).unwrap(), json!("hello ada"));
//!
//! assert!(session.unpatch_function(&api, "greet"));
//! assert_eq!(api.call("greet", &CallArgs::from_values([json!("root")])).unwrap(), json!("hello root"));
//! ```

mod dispatch;
mod errors;
mod hooks;
mod patch;

pub use errors::WrapError;
pub use hooks::{HookSet, PostfixHook, PrefixHook, ReplaceHook};
pub use patch::Patch;

use crate::registry::{CallableIdentity, PatchRecord};
use crate::runtime::{Attribute, Callable, MethodKind, Namespace};
use crate::session::Session;
use dispatch::Dispatcher;
use std::rc::Rc;
use tracing::{debug, warn};

impl Session {
    /// Wrap a method of `class` with `hooks`.
    ///
    /// The dispatcher binds exactly like the method it replaces: instance
    /// methods still get the instance, class methods the class, static
    /// methods nothing.
    pub fn try_patch_method(
        &mut self,
        class: &Rc<Namespace>,
        method_name: &str,
        hooks: HookSet,
    ) -> Result<(), WrapError> {
        self.install(class, method_name, hooks, None)
    }

    /// [`Session::try_patch_method`] reporting only success.
    pub fn patch_method(&mut self, class: &Rc<Namespace>, method_name: &str, hooks: HookSet) -> bool {
        report("patch_method", self.try_patch_method(class, method_name, hooks))
    }

    /// Wrap a free function of `module` with `hooks`. Hooks see no receiver.
    pub fn try_patch_function(
        &mut self,
        module: &Rc<Namespace>,
        function_name: &str,
        hooks: HookSet,
    ) -> Result<(), WrapError> {
        self.install(module, function_name, hooks, Some(MethodKind::Static))
    }

    pub fn patch_function(
        &mut self,
        module: &Rc<Namespace>,
        function_name: &str,
        hooks: HookSet,
    ) -> bool {
        report(
            "patch_function",
            self.try_patch_function(module, function_name, hooks),
        )
    }

    /// Put the first-captured original back and forget the record.
    ///
    /// Every dispatcher stacked on the identity since capture goes away in
    /// this one step.
    pub fn try_unpatch_method(
        &mut self,
        class: &Rc<Namespace>,
        method_name: &str,
    ) -> Result<(), WrapError> {
        self.restore(class, method_name)
    }

    pub fn unpatch_method(&mut self, class: &Rc<Namespace>, method_name: &str) -> bool {
        self.try_unpatch_method(class, method_name).is_ok()
    }

    pub fn try_unpatch_function(
        &mut self,
        module: &Rc<Namespace>,
        function_name: &str,
    ) -> Result<(), WrapError> {
        self.restore(module, function_name)
    }

    pub fn unpatch_function(&mut self, module: &Rc<Namespace>, function_name: &str) -> bool {
        self.try_unpatch_function(module, function_name).is_ok()
    }

    /// Install `body` under `method_name`, replacing anything already there.
    /// Nothing is captured, so there is nothing to unpatch afterwards.
    pub fn create_method(&mut self, class: &Rc<Namespace>, method_name: &str, body: Callable) -> bool {
        let replaced = class.define(method_name, body).is_some();
        debug!(
            namespace = class.name(),
            method = method_name,
            replaced,
            "created method"
        );
        true
    }

    /// Remove an attribute from `class`.
    pub fn delete_method(&mut self, class: &Rc<Namespace>, method_name: &str) -> Result<(), WrapError> {
        match class.remove(method_name) {
            Some(_) => {
                debug!(namespace = class.name(), method = method_name, "deleted method");
                Ok(())
            }
            None => Err(not_found(class, method_name)),
        }
    }

    /// Apply a [`Patch`] to `class`: wrap `method_name` with its hooks, then
    /// create and delete the methods it names.
    ///
    /// Every step is attempted even if an earlier one fails. Returns `true`
    /// only when all of them succeed.
    pub fn apply(&mut self, patch: Patch, class: &Rc<Namespace>, method_name: &str) -> bool {
        let Patch {
            hooks,
            create,
            delete,
        } = patch;

        let patched = self.patch_method(class, method_name, hooks);
        let created = match create {
            Some((name, body)) => self.create_method(class, &name, body),
            None => true,
        };
        let deleted = match delete {
            Some(name) => report("delete_method", self.delete_method(class, &name)),
            None => true,
        };
        patched && created && deleted
    }

    /// Revert every patch this session still holds. Records whose namespace
    /// has been dropped are discarded. Returns the number of slots restored.
    pub fn unpatch_all(&mut self) -> usize {
        let mut restored = 0;
        for (identity, record) in self.patches.drain() {
            match record.target() {
                Some(target) => {
                    target.define(identity.name.clone(), record.original);
                    restored += 1;
                }
                None => debug!(%identity, "patched namespace no longer alive"),
            }
        }
        restored
    }

    /// Number of dispatchers currently stacked on `name`; zero when unpatched.
    pub fn patch_depth(&self, target: &Namespace, name: &str) -> usize {
        self.patches
            .get(&CallableIdentity::runtime(target, name))
            .map_or(0, |record| record.layers)
    }

    pub fn is_patched(&self, target: &Namespace, name: &str) -> bool {
        self.patches.contains(&CallableIdentity::runtime(target, name))
    }

    fn install(
        &mut self,
        target: &Rc<Namespace>,
        name: &str,
        hooks: HookSet,
        kind: Option<MethodKind>,
    ) -> Result<(), WrapError> {
        let current = match target.get_static(name) {
            Some(Attribute::Callable(callable)) => callable,
            Some(Attribute::Value(_)) => {
                return Err(WrapError::NotCallable {
                    namespace: target.name().to_string(),
                    name: name.to_string(),
                })
            }
            None => return Err(not_found(target, name)),
        };

        let kind = kind.unwrap_or_else(|| current.kind());
        let identity = CallableIdentity::runtime(target, name);
        let (record, captured) = self
            .patches
            .capture_with(identity, || PatchRecord::new(target, current.clone()));
        record.layers += 1;
        let layers = record.layers;

        target.define(name, Dispatcher::new(current, hooks).into_callable(kind));
        debug!(
            namespace = target.name(),
            name,
            %kind,
            captured,
            layers,
            "installed dispatcher"
        );
        Ok(())
    }

    fn restore(&mut self, target: &Rc<Namespace>, name: &str) -> Result<(), WrapError> {
        let identity = CallableIdentity::runtime(target, name);
        let record = self
            .patches
            .release(&identity)
            .ok_or(WrapError::NotPatched { identity })?;

        target.define(name, record.original);
        debug!(
            namespace = target.name(),
            name,
            layers = record.layers,
            "restored original"
        );
        Ok(())
    }
}

fn not_found(target: &Namespace, name: &str) -> WrapError {
    WrapError::AttributeNotFound {
        namespace: target.name().to_string(),
        name: name.to_string(),
        suggestion: errors::suggest(name, &target.attribute_names()),
    }
}

fn report(operation: &str, result: Result<(), WrapError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(operation, error = %err, "patch rejected");
            false
        }
    }
}
