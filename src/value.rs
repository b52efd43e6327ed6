// Copyright 2025 Cowboy AI, LLC.

//! Host values carried by attribute records
//!
//! Records describe slots on composites; the payload of a data record, the
//! result of a reader and the argument of a writer are all [`Value`]s.
//! Primitives compare structurally, functions and composites by identity.

use std::fmt;
use std::rc::Rc;

use crate::composite::Composite;
use crate::errors::{DescriptorError, DescriptorResult};
use crate::scope::VisibilityScope;

type NativeFn = dyn Fn(&Value, &[Value]) -> DescriptorResult<Value>;

/// A dynamically typed value
#[derive(Clone, Default)]
pub enum Value {
    /// No value
    #[default]
    Undefined,
    /// Explicit empty value
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    String(String),
    /// Callable
    Function(Function),
    /// Composite value holding attribute records
    Composite(Composite),
}

impl Value {
    /// Undefined or null
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Whether this is a composite
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Composite(_))
    }

    /// Whether this is a function
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Borrow the composite, if any
    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Value::Composite(c) => Some(c),
            _ => None,
        }
    }

    /// Borrow the function, if any
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Boolean content, if any
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric content, if any
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String content, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short type tag used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Composite(_) => "composite",
        }
    }

    /// Invoke this value as a function
    pub fn call(&self, this: &Value, args: &[Value]) -> DescriptorResult<Value> {
        match self {
            Value::Function(function) => function.call(this, args),
            other => Err(DescriptorError::NotCallable(other.type_name().to_string())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Composite(a), Value::Composite(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Function(func) => func.fmt(f),
            Value::Composite(c) => c.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Composite> for Value {
    fn from(c: Composite) -> Self {
        Value::Composite(c)
    }
}

/// Attribute key
///
/// Visibility scope tokens are keys in their own right, so a source can
/// carry an attribute addressed by a scope and have a handler keyed by
/// that same scope pick it up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Named slot
    Name(String),
    /// Scope token slot
    Scope(VisibilityScope),
}

impl Key {
    /// The slot name, for named keys
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name),
            Key::Scope(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Scope(scope) => write!(f, "@@{}", scope.tag()),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<&String> for Key {
    fn from(name: &String) -> Self {
        Key::Name(name.clone())
    }
}

impl From<VisibilityScope> for Key {
    fn from(scope: VisibilityScope) -> Self {
        Key::Scope(scope)
    }
}

/// Storage a reader/writer pair is bound to, exposed for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct StorageBinding {
    /// Container holding the slot
    pub storage: Value,
    /// Slot name within the container
    pub key: String,
}

/// A shared callable with a declared arity
///
/// Arity drives the record builder's overload resolution: zero-arity
/// functions read, one-arity functions write (or build readers/writers
/// when used as factories).
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    arity: usize,
    body: Rc<NativeFn>,
    binding: Option<Rc<StorageBinding>>,
}

impl Function {
    /// Wrap a native body taking the receiver and argument list
    pub fn new<F>(name: impl Into<String>, arity: usize, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> DescriptorResult<Value> + 'static,
    {
        Self {
            name: Rc::from(name.into()),
            arity,
            body: Rc::new(body),
            binding: None,
        }
    }

    /// Zero-arity function ignoring its receiver
    pub fn nullary<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        Self::new(name, 0, move |_, _| Ok(body()))
    }

    /// One-arity function ignoring its receiver and result
    pub fn unary<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Value) + 'static,
    {
        Self::new(name, 1, move |_, args| {
            body(args.first().cloned().unwrap_or_default());
            Ok(Value::Undefined)
        })
    }

    /// Declared arity
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage this function reads or writes, when built over one
    pub fn binding(&self) -> Option<&StorageBinding> {
        self.binding.as_deref()
    }

    /// Same body, annotated with the storage it is bound to
    pub fn with_binding(&self, binding: StorageBinding) -> Self {
        Self {
            name: self.name.clone(),
            arity: self.arity,
            body: self.body.clone(),
            binding: Some(Rc::new(binding)),
        }
    }

    /// Same function whose receiver is always `receiver`
    pub fn bound_to(&self, receiver: Value) -> Self {
        let inner = self.body.clone();
        Self {
            name: self.name.clone(),
            arity: self.arity,
            body: Rc::new(move |_this: &Value, args: &[Value]| inner(&receiver, args)),
            binding: self.binding.clone(),
        }
    }

    /// Invoke with a receiver and arguments
    pub fn call(&self, this: &Value, args: &[Value]) -> DescriptorResult<Value> {
        (self.body)(this, args)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}/{}", self.name, self.arity)
    }
}
