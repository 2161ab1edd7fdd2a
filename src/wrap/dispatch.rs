//! The dispatcher installed in place of a patched callable.
//!
//! The hooks are folded into a [`Dispatch`] once, at patch time. Each call
//! then evaluates that variant against the captured callable:
//!
//! 1. `Replace` calls the replacement and returns; nothing else runs.
//! 2. `PrefixPostfix` calls the prefix (if any) and takes its result and
//!    [`FlowState`]; runs the original unless the state is `Stop`; runs the
//!    postfix only when the state is `Continue`.
//! 3. `Passthrough` calls the original.

use crate::flow::FlowState;
use crate::runtime::{CallArgs, CallResult, Callable, MethodKind, Receiver};
use crate::wrap::hooks::{HookSet, PostfixHook, PrefixHook, ReplaceHook};
use serde_json::Value;
use std::borrow::Cow;
use std::rc::Rc;

pub(crate) enum Dispatch {
    Replace(ReplaceHook),
    PrefixPostfix {
        prefix: Option<PrefixHook>,
        postfix: Option<PostfixHook>,
    },
    Passthrough,
}

impl From<HookSet> for Dispatch {
    fn from(hooks: HookSet) -> Self {
        match hooks {
            HookSet {
                replace: Some(replace),
                ..
            } => Dispatch::Replace(replace),
            HookSet {
                prefix: None,
                postfix: None,
                ..
            } => Dispatch::Passthrough,
            HookSet {
                prefix, postfix, ..
            } => Dispatch::PrefixPostfix { prefix, postfix },
        }
    }
}

pub(crate) struct Dispatcher {
    wrapped: Callable,
    dispatch: Dispatch,
}

impl Dispatcher {
    pub(crate) fn new(wrapped: Callable, hooks: HookSet) -> Self {
        Self {
            wrapped,
            dispatch: Dispatch::from(hooks),
        }
    }

    pub(crate) fn call(&self, receiver: &mut Receiver<'_>, args: &CallArgs) -> CallResult {
        match &self.dispatch {
            Dispatch::Replace(replace) => replace(receiver, args),
            Dispatch::Passthrough => self.wrapped.invoke(receiver, args),
            Dispatch::PrefixPostfix { prefix, postfix } => {
                let mut flow = FlowState::Continue;
                let mut result = Value::Null;
                let mut forwarded = Cow::Borrowed(args);

                if let Some(prefix) = prefix {
                    let outcome = prefix(&mut *receiver, args)?;
                    result = outcome.result;
                    flow = outcome.flow;
                    if let Some(rewritten) = outcome.args {
                        forwarded = Cow::Owned(rewritten);
                    }
                }

                if flow.runs_original() {
                    result = self.wrapped.invoke(&mut *receiver, &forwarded)?;
                }

                match postfix {
                    Some(postfix) if flow.runs_postfix() => postfix(receiver, result, args),
                    _ => Ok(result),
                }
            }
        }
    }

    /// Turn the dispatcher into a callable that binds like `kind`.
    pub(crate) fn into_callable(self, kind: MethodKind) -> Callable {
        let dispatcher = Rc::new(self);
        Callable::native(kind, move |receiver: &mut Receiver<'_>, args: &CallArgs| {
            dispatcher.call(receiver, args)
        })
    }
}
