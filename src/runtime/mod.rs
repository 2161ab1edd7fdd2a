//! Runtime object model targeted by the wrap engine.
//!
//! Classes and modules are [`Namespace`]s: named tables of attribute slots.
//! A slot holds either a [`Callable`] or a plain JSON value. Callables carry
//! a [`MethodKind`] that decides what they are bound to when invoked through
//! an [`Instance`] or a namespace.

pub mod callable;
pub mod errors;
pub mod namespace;

pub use callable::{CallArgs, CallResult, Callable, CallableId, MethodKind, NativeFn, Receiver};
pub use errors::CallError;
pub use namespace::{Attribute, Instance, Namespace, NamespaceId, NamespaceKind};
