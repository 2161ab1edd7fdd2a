use crate::flow::PrefixOutcome;
use crate::runtime::{CallArgs, CallError, CallResult, NativeFn, Receiver};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Runs before the original; decides what runs next.
pub type PrefixHook = Rc<dyn Fn(&mut Receiver<'_>, &CallArgs) -> Result<PrefixOutcome, CallError>>;

/// Runs after the original with the working result and the caller's arguments.
pub type PostfixHook = Rc<dyn Fn(&mut Receiver<'_>, Value, &CallArgs) -> CallResult>;

/// Runs instead of everything else.
pub type ReplaceHook = NativeFn;

/// The hooks supplied to one patch call.
///
/// Hooks receive the same receiver the patched callable is invoked with: the
/// instance for instance methods, the class for class methods, nothing for
/// static methods and free functions.
#[derive(Clone, Default)]
pub struct HookSet {
    pub(crate) prefix: Option<PrefixHook>,
    pub(crate) postfix: Option<PostfixHook>,
    pub(crate) replace: Option<ReplaceHook>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(
        mut self,
        hook: impl Fn(&mut Receiver<'_>, &CallArgs) -> Result<PrefixOutcome, CallError> + 'static,
    ) -> Self {
        self.prefix = Some(Rc::new(hook));
        self
    }

    pub fn postfix(
        mut self,
        hook: impl Fn(&mut Receiver<'_>, Value, &CallArgs) -> CallResult + 'static,
    ) -> Self {
        self.postfix = Some(Rc::new(hook));
        self
    }

    pub fn replace(
        mut self,
        hook: impl Fn(&mut Receiver<'_>, &CallArgs) -> CallResult + 'static,
    ) -> Self {
        self.replace = Some(Rc::new(hook));
        self
    }

    pub fn has_prefix(&self) -> bool {
        self.prefix.is_some()
    }

    pub fn has_postfix(&self) -> bool {
        self.postfix.is_some()
    }

    pub fn has_replace(&self) -> bool {
        self.replace.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_none() && self.postfix.is_none() && self.replace.is_none()
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("prefix", &self.has_prefix())
            .field("postfix", &self.has_postfix())
            .field("replace", &self.has_replace())
            .finish()
    }
}
