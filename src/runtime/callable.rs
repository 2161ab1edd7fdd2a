use crate::runtime::errors::CallError;
use crate::runtime::namespace::{Instance, Namespace};
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Result of invoking any callable or hook.
pub type CallResult = Result<Value, CallError>;

/// Shared body of a callable: receives the bound receiver and the call arguments.
pub type NativeFn = Rc<dyn Fn(&mut Receiver<'_>, &CallArgs) -> CallResult>;

static NEXT_CALLABLE_ID: AtomicU64 = AtomicU64::new(1);

/// How a callable binds when it is looked up through a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MethodKind {
    /// Bound to the receiving instance.
    #[default]
    Instance,
    /// Bound to the class namespace itself.
    Class,
    /// Not bound to anything; receives raw arguments only.
    Static,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Instance => write!(f, "instance method"),
            MethodKind::Class => write!(f, "class method"),
            MethodKind::Static => write!(f, "static method"),
        }
    }
}

/// Positional and keyword arguments for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keywords: Map<String, Value>,
}

impl CallArgs {
    /// Arguments with no positional or keyword values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments made of positional values only.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            keywords: Map::new(),
        }
    }

    /// Add a keyword argument.
    pub fn with_keyword(mut self, name: impl Into<String>, value: Value) -> Self {
        self.keywords.insert(name.into(), value);
        self
    }

    /// Positional argument at `index`, or an arity error.
    pub fn arg(&self, index: usize) -> Result<&Value, CallError> {
        self.positional.get(index).ok_or(CallError::Arity {
            expected: index + 1,
            got: self.positional.len(),
        })
    }

    /// Positional argument at `index` as a string slice.
    pub fn str_arg(&self, index: usize) -> Result<&str, CallError> {
        self.arg(index)?.as_str().ok_or(CallError::ArgumentType {
            index,
            expected: "string",
        })
    }

    /// Positional argument at `index` as an integer.
    pub fn i64_arg(&self, index: usize) -> Result<i64, CallError> {
        self.arg(index)?.as_i64().ok_or(CallError::ArgumentType {
            index,
            expected: "integer",
        })
    }

    /// Keyword argument by name, if present.
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }

    /// Keyword argument by name, or an error.
    pub fn require_keyword(&self, name: &str) -> Result<&Value, CallError> {
        self.keywords.get(name).ok_or_else(|| CallError::MissingKeyword {
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }
}

/// What a callable is bound to for one invocation.
pub enum Receiver<'a> {
    /// An instance method call; the body may mutate the instance.
    Instance(&'a mut Instance),
    /// A class method call.
    Class(Rc<Namespace>),
    /// A free function or static method call.
    Unbound,
}

impl<'a> Receiver<'a> {
    pub fn instance(&self) -> Option<&Instance> {
        match self {
            Receiver::Instance(instance) => Some(&**instance),
            _ => None,
        }
    }

    pub fn instance_mut(&mut self) -> Option<&mut Instance> {
        match self {
            Receiver::Instance(instance) => Some(&mut **instance),
            _ => None,
        }
    }

    /// The instance receiver, or an error naming the callable that needed it.
    pub fn expect_instance(&mut self, name: &str) -> Result<&mut Instance, CallError> {
        self.instance_mut().ok_or_else(|| CallError::MissingReceiver {
            name: name.to_string(),
        })
    }

    /// The class this call is bound to, either directly or through an instance.
    pub fn class(&self) -> Option<Rc<Namespace>> {
        match self {
            Receiver::Instance(instance) => Some(Rc::clone(instance.class())),
            Receiver::Class(class) => Some(Rc::clone(class)),
            Receiver::Unbound => None,
        }
    }

    pub fn is_unbound(&self) -> bool {
        matches!(self, Receiver::Unbound)
    }
}

/// Unique identity of one callable object. Clones share the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallableId(u64);

/// A callable value stored in a namespace slot.
///
/// Cloning is cheap and keeps the identity: two clones compare equal under
/// [`Callable::ptr_eq`], which is how callers check that a reverted slot holds
/// the exact original object again.
#[derive(Clone)]
pub struct Callable {
    id: CallableId,
    kind: MethodKind,
    body: NativeFn,
}

impl Callable {
    /// Build a callable of the given kind from a receiver-aware body.
    pub fn native(
        kind: MethodKind,
        body: impl Fn(&mut Receiver<'_>, &CallArgs) -> CallResult + 'static,
    ) -> Self {
        Self::from_shared(kind, Rc::new(body))
    }

    /// Build a callable from an already shared body.
    pub fn from_shared(kind: MethodKind, body: NativeFn) -> Self {
        Self {
            id: CallableId(NEXT_CALLABLE_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
            body,
        }
    }

    /// An instance method.
    pub fn method(body: impl Fn(&mut Receiver<'_>, &CallArgs) -> CallResult + 'static) -> Self {
        Self::native(MethodKind::Instance, body)
    }

    /// A class method; the receiver is [`Receiver::Class`].
    pub fn class_method(
        body: impl Fn(&mut Receiver<'_>, &CallArgs) -> CallResult + 'static,
    ) -> Self {
        Self::native(MethodKind::Class, body)
    }

    /// A static method; never sees a receiver.
    pub fn static_method(body: impl Fn(&CallArgs) -> CallResult + 'static) -> Self {
        Self::native(MethodKind::Static, move |_, args| body(args))
    }

    /// A free function held by a module namespace.
    pub fn function(body: impl Fn(&CallArgs) -> CallResult + 'static) -> Self {
        Self::static_method(body)
    }

    pub fn id(&self) -> CallableId {
        self.id
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// Same callable object (not just equivalent behavior).
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        self.id == other.id
    }

    /// Invoke with an explicit receiver.
    pub fn invoke(&self, receiver: &mut Receiver<'_>, args: &CallArgs) -> CallResult {
        (self.body)(receiver, args)
    }

    /// Invoke without a receiver.
    pub fn call(&self, args: &CallArgs) -> CallResult {
        self.invoke(&mut Receiver::Unbound, args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("id", &self.id.0)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
