//! Harmonify: reversible behavior modification for Rust programs.
//!
//! Two engines share one bookkeeping model:
//!
//! - The wrap engine ([`wrap`]) replaces a named callable in a runtime
//!   [`Namespace`] with a dispatcher that runs prefix, postfix or replace
//!   hooks around the original. Hooks steer the call with [`FlowState`].
//! - The injection engine ([`inject`]) rewrites the source of one function
//!   item in a [`SourceModule`], splicing statements into its body after a
//!   relative line anchor.
//!
//! Both record what they change in a [`Session`] keyed by
//! [`CallableIdentity`]. The first capture wins, so reverting always restores
//! the state from before the first modification.
//!
//! # Source rewriting
//!
//! Every source change compiles down to an [`Edit`], a verified byte-span
//! replacement. Spans come from tree-sitter queries; the result is checked
//! with tree-sitter and `syn` on a copy before the live text is touched.
//! Modules loaded from disk are written back atomically.
//!
//! # Example
//!
//! ```
//! use harmonify::{CallArgs, Callable, HookSet, Namespace, Session};
//! use serde_json::{json, Value};
//!
//! let api = Namespace::module("api");
//! api.define("get_info", Callable::function(|_| Ok(json!({"name": "api"}))));
//!
//! let mut session = Session::new();
//! session.patch_function(&api, "get_info", HookSet::new().postfix(|_, mut result, _| {
//!     if let Value::Object(map) = &mut result {
//!         map.insert("version".into(), json!("v1"));
//!     }
//!     Ok(result)
//! }));
//!
//! let info = api.call("get_info", &CallArgs::new()).unwrap();
//! assert_eq!(info, json!({"name": "api", "version": "v1"}));
//! ```

pub mod edit;
pub mod flow;
pub mod inject;
pub mod pool;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod ts;
pub mod validate;
pub mod wrap;

// Re-exports
pub use edit::{Edit, EditError, EditResult, EditVerification};
pub use flow::{FlowState, PrefixOutcome};
pub use inject::{InjectError, InsertionSpec, ModuleId, SourceModule};
pub use registry::{CallableIdentity, ContainerKey, InjectionRecord, PatchRecord, Registry};
pub use runtime::{
    CallArgs, CallError, CallResult, Callable, Instance, MethodKind, Namespace, Receiver,
};
pub use session::Session;
pub use ts::{FunctionTarget, TreeSitterError};
pub use validate::{syn_validate, ValidationError};
pub use wrap::{HookSet, Patch, WrapError};
