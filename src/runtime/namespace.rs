use crate::runtime::callable::{CallArgs, CallResult, Callable, MethodKind, Receiver};
use crate::runtime::errors::CallError;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NAMESPACE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of a namespace, used as the container half of a
/// callable identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(u64);

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ns#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    Class,
    Module,
}

/// Value stored under an attribute name.
#[derive(Debug, Clone)]
pub enum Attribute {
    Callable(Callable),
    Value(Value),
}

impl Attribute {
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Attribute::Callable(callable) => Some(callable),
            Attribute::Value(_) => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Attribute::Callable(_))
    }
}

/// A class or module: a named, mutable table of attribute slots.
///
/// Namespaces are shared through `Rc` and mutated through `&self`; the whole
/// object model is single-threaded.
pub struct Namespace {
    id: NamespaceId,
    name: String,
    kind: NamespaceKind,
    attributes: RefCell<BTreeMap<String, Attribute>>,
}

impl Namespace {
    fn with_kind(name: impl Into<String>, kind: NamespaceKind) -> Rc<Self> {
        Rc::new(Self {
            id: NamespaceId(NEXT_NAMESPACE_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            kind,
            attributes: RefCell::new(BTreeMap::new()),
        })
    }

    /// A new, empty class.
    pub fn class(name: impl Into<String>) -> Rc<Self> {
        Self::with_kind(name, NamespaceKind::Class)
    }

    /// A new, empty module.
    pub fn module(name: impl Into<String>) -> Rc<Self> {
        Self::with_kind(name, NamespaceKind::Module)
    }

    pub fn id(&self) -> NamespaceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NamespaceKind {
        self.kind
    }

    /// Bind a callable under `name`, returning whatever was there before.
    pub fn define(&self, name: impl Into<String>, callable: Callable) -> Option<Attribute> {
        self.set_attr(name, Attribute::Callable(callable))
    }

    /// Bind a plain value under `name`.
    pub fn set_value(&self, name: impl Into<String>, value: Value) -> Option<Attribute> {
        self.set_attr(name, Attribute::Value(value))
    }

    pub fn set_attr(&self, name: impl Into<String>, attribute: Attribute) -> Option<Attribute> {
        self.attributes.borrow_mut().insert(name.into(), attribute)
    }

    /// Raw slot lookup. Nothing is bound; the stored attribute is returned as is,
    /// including its [`MethodKind`].
    pub fn get_static(&self, name: &str) -> Option<Attribute> {
        self.attributes.borrow().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Attribute> {
        self.attributes.borrow_mut().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.borrow().contains_key(name)
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.borrow().keys().cloned().collect()
    }

    /// The callable stored under `name`.
    pub fn lookup_callable(&self, name: &str) -> Result<Callable, CallError> {
        match self.get_static(name) {
            Some(Attribute::Callable(callable)) => Ok(callable),
            Some(Attribute::Value(_)) => Err(CallError::NotCallable {
                namespace: self.name.clone(),
                name: name.to_string(),
            }),
            None => Err(CallError::AttributeNotFound {
                namespace: self.name.clone(),
                name: name.to_string(),
            }),
        }
    }

    /// Call an attribute through the namespace itself: module functions,
    /// static methods, and class methods. Instance methods need an instance.
    pub fn call(self: &Rc<Self>, name: &str, args: &CallArgs) -> CallResult {
        let callable = self.lookup_callable(name)?;
        match callable.kind() {
            MethodKind::Instance => Err(CallError::MissingReceiver {
                name: format!("{}.{}", self.name, name),
            }),
            MethodKind::Class => callable.invoke(&mut Receiver::Class(Rc::clone(self)), args),
            MethodKind::Static => callable.invoke(&mut Receiver::Unbound, args),
        }
    }

    /// Create an instance and run `__init__` on it when the class defines one.
    pub fn instantiate(self: &Rc<Self>, args: &CallArgs) -> Result<Instance, CallError> {
        let mut instance = Instance::new(Rc::clone(self));
        if self.contains("__init__") {
            instance.call("__init__", args)?;
        }
        Ok(instance)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("attributes", &self.attribute_names())
            .finish()
    }
}

/// An object created from a class namespace.
#[derive(Debug, Clone)]
pub struct Instance {
    class: Rc<Namespace>,
    attrs: Map<String, Value>,
}

impl Instance {
    /// A bare instance; `__init__` is not run.
    pub fn new(class: Rc<Namespace>) -> Self {
        Self {
            class,
            attrs: Map::new(),
        }
    }

    pub fn class(&self) -> &Rc<Namespace> {
        &self.class
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.attrs.insert(name.into(), value);
    }

    pub fn has(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    /// Look a callable up on the class and invoke it bound according to its kind.
    pub fn call(&mut self, name: &str, args: &CallArgs) -> CallResult {
        let callable = self.class.lookup_callable(name)?;
        match callable.kind() {
            MethodKind::Instance => callable.invoke(&mut Receiver::Instance(self), args),
            MethodKind::Class => {
                let class = Rc::clone(&self.class);
                callable.invoke(&mut Receiver::Class(class), args)
            }
            MethodKind::Static => callable.invoke(&mut Receiver::Unbound, args),
        }
    }
}
