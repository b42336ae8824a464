//! The object subsystem (component D, object half): the concrete heap
//! object kinds and the small capability surface every kind implements.
//!
//! Rather than a trait-object hierarchy (`dyn Object`), concrete kinds are
//! variants of a single enum. Egg has a closed, small set of object shapes
//! (builtins, vanilla arrays/objects, functions, iterators, exceptions,
//! scopes) and a `match` dispatch keeps their fields directly inspectable —
//! useful for a tree-walking executor that frequently needs to downcast
//! ("is this actually an array?") rather than only ever calling through the
//! capability surface.

use std::{cell::RefCell, fmt::Write as _, rc::Rc};

use indexmap::IndexMap;

use crate::{
    generator::CoroutineStack,
    heap::{Basket, HeapId},
    runtime_location::RuntimeLocation,
    strings::EggString,
    types::{FunctionSignature, Type},
    value::Value,
};

/// Host services an object needs while executing a call: allocating further
/// heap objects, raising exceptions, and `print`ing. Implemented by the
/// interpreter's executor.
pub trait ExecutionContext {
    fn heap_mut(&mut self) -> &mut Basket;
    fn heap(&self) -> &Basket;
    /// Builds an exception-flow `Value` carrying `message`, tagged with the
    /// calling location.
    fn raise(&mut self, message: String) -> Value;
    fn print(&mut self, text: &str);
}

/// The result of a property/index/call operation: either a plain value or an
/// exception-flow `Value` (never a Rust `Result` — see the value cell's
/// flow-control design).
pub type ObjectResult = Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum StringMethod {
    Compare,
    Contains,
    EndsWith,
    HashCode,
    IndexOf,
    Join,
    LastIndexOf,
    Length,
    PadLeft,
    PadRight,
    Repeat,
    Replace,
    Slice,
    Split,
    StartsWith,
    ToString,
}

impl StringMethod {
    pub const ALL: &'static [StringMethod] = &[
        StringMethod::Compare,
        StringMethod::Contains,
        StringMethod::EndsWith,
        StringMethod::HashCode,
        StringMethod::IndexOf,
        StringMethod::Join,
        StringMethod::LastIndexOf,
        StringMethod::Length,
        StringMethod::PadLeft,
        StringMethod::PadRight,
        StringMethod::Repeat,
        StringMethod::Replace,
        StringMethod::Slice,
        StringMethod::Split,
        StringMethod::StartsWith,
        StringMethod::ToString,
    ];

    pub(crate) fn method_name(self) -> &'static str {
        match self {
            StringMethod::Compare => "compare",
            StringMethod::Contains => "contains",
            StringMethod::EndsWith => "endsWith",
            StringMethod::HashCode => "hashCode",
            StringMethod::IndexOf => "indexOf",
            StringMethod::Join => "join",
            StringMethod::LastIndexOf => "lastIndexOf",
            StringMethod::Length => "length",
            StringMethod::PadLeft => "padLeft",
            StringMethod::PadRight => "padRight",
            StringMethod::Repeat => "repeat",
            StringMethod::Replace => "replace",
            StringMethod::Slice => "slice",
            StringMethod::Split => "split",
            StringMethod::StartsWith => "startsWith",
            StringMethod::ToString => "toString",
        }
    }
}

/// Builtin free functions and namespaces seeded into the root scope:
/// `assert`, `print`, the `string` namespace (and its instance methods
/// curried onto a receiver), and the `type` namespace.
#[derive(Clone, Debug, PartialEq)]
pub enum Builtin {
    Assert,
    Print,
    StringNamespace,
    StringFrom,
    TypeNamespace,
    TypeOf,
    /// An instance method curried onto a specific receiver string, e.g. the
    /// `contains` in `"abc".contains`.
    StringInstanceMethod { receiver: EggString, method: StringMethod },
}

#[derive(Clone, Debug)]
pub struct FunctionObject {
    pub signature: Rc<FunctionSignature>,
    pub body: Rc<crate::ast::Node>,
    /// Soft link to the scope this function closed over.
    pub defining_scope: HeapId,
    pub is_generator: bool,
}

/// Iteration state. Array and dictionary iteration snapshot their elements
/// eagerly at creation time (mirroring the original runtime's dictionary
/// iterator, applied here uniformly to arrays too) rather than tracking a
/// live cursor back into the source object — simpler, and foreach loops over
/// egg's value types are not specified to observe concurrent mutation.
#[derive(Debug)]
pub enum IteratorState {
    Sequence { items: Vec<Value>, index: usize },
    Dictionary { items: Vec<(EggString, Value)>, index: usize },
    KeyValuePair { key: EggString, value: Value, index: usize },
    Generator(CoroutineStack),
    Exhausted,
}

#[derive(Clone, Debug)]
pub struct ExceptionObject {
    pub message: EggString,
    pub location: Option<RuntimeLocation>,
    pub fields: IndexMap<EggString, Value>,
}

impl ExceptionObject {
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match &self.location {
            Some(loc) if !self.message.is_empty() => format!("{loc}: {}", self.message),
            None if !self.message.is_empty() => self.message.to_string(),
            _ => "Exception (no message)".to_string(),
        }
    }
}

/// A lexical scope frame: a name → symbol map plus a soft link to its
/// parent. Scopes are heap objects (not a separate Rc-chain) so that
/// closure cycles — a function capturing the very scope that holds it —
/// are collected by the same mark-and-sweep pass as any other cyclic graph.
#[derive(Debug, Default)]
pub struct Scope {
    pub parent: Option<HeapId>,
    pub symbols: IndexMap<EggString, Symbol>,
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub declared_type: Type,
    pub value: Value,
    pub mutable: bool,
}

#[derive(Debug)]
pub enum Object {
    Builtin(Builtin),
    Array(RefCell<Vec<Value>>),
    Dictionary(RefCell<IndexMap<EggString, Value>>),
    KeyValue { key: EggString, value: Value },
    Function(FunctionObject),
    Iterator(RefCell<IteratorState>),
    Exception(ExceptionObject),
    Scope(Scope),
}

impl Object {
    #[must_use]
    pub fn new_array(elements: Vec<Value>) -> Self {
        Object::Array(RefCell::new(elements))
    }

    #[must_use]
    pub fn new_dictionary(entries: IndexMap<EggString, Value>) -> Self {
        Object::Dictionary(RefCell::new(entries))
    }

    #[must_use]
    pub fn new_scope(parent: Option<HeapId>) -> Self {
        Object::Scope(Scope { parent, symbols: IndexMap::new() })
    }

    #[cfg(test)]
    #[must_use]
    pub fn test_leaf() -> Self {
        Object::Array(RefCell::new(Vec::new()))
    }

    /// Visits every heap reference this object holds (its "owned soft
    /// links"), used by the basket's mark phase.
    pub fn trace(&self, visit: &mut dyn FnMut(HeapId)) {
        match self {
            Object::Builtin(_) => {}
            Object::Exception(exc) => {
                for v in exc.fields.values() {
                    if let Some(id) = v.as_object() {
                        visit(id);
                    }
                }
            }
            Object::Array(elements) => {
                for v in elements.borrow().iter() {
                    if let Some(id) = v.as_object() {
                        visit(id);
                    }
                }
            }
            Object::Dictionary(entries) => {
                for v in entries.borrow().values() {
                    if let Some(id) = v.as_object() {
                        visit(id);
                    }
                }
            }
            Object::KeyValue { value, .. } => {
                if let Some(id) = value.as_object() {
                    visit(id);
                }
            }
            Object::Function(f) => visit(f.defining_scope),
            Object::Iterator(state) => match &*state.borrow() {
                IteratorState::Sequence { items, .. } => {
                    for v in items {
                        if let Some(id) = v.as_object() {
                            visit(id);
                        }
                    }
                }
                IteratorState::Dictionary { items, .. } => {
                    for (_, v) in items {
                        if let Some(id) = v.as_object() {
                            visit(id);
                        }
                    }
                }
                IteratorState::KeyValuePair { value, .. } => {
                    if let Some(id) = value.as_object() {
                        visit(id);
                    }
                }
                IteratorState::Generator(stack) => stack.trace(visit),
                IteratorState::Exhausted => {}
            },
            Object::Scope(scope) => {
                if let Some(parent) = scope.parent {
                    visit(parent);
                }
                for sym in scope.symbols.values() {
                    if let Some(id) = sym.value.as_object() {
                        visit(id);
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn runtime_type(&self) -> Type {
        // Every object kind is structurally typed at the `object` bit; a
        // function's richer callable shape is exposed by `Function::signature`,
        // consulted directly by the executor rather than folded in here.
        Type::object()
    }

    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Object::Builtin(Builtin::Assert) => "<builtin assert>".to_string(),
            Object::Builtin(Builtin::Print) => "<builtin print>".to_string(),
            Object::Builtin(Builtin::StringNamespace) => "<builtin string>".to_string(),
            Object::Builtin(Builtin::StringFrom) => "<builtin string.from>".to_string(),
            Object::Builtin(Builtin::TypeNamespace) => "<builtin type>".to_string(),
            Object::Builtin(Builtin::TypeOf) => "<builtin type.of>".to_string(),
            Object::Builtin(Builtin::StringInstanceMethod { receiver, method }) => {
                format!("<bound {receiver}.{}>", method.method_name())
            }
            Object::Array(elements) => {
                let mut out = String::from("[");
                for (i, v) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{v}");
                }
                out.push(']');
                out
            }
            Object::Dictionary(entries) => {
                let mut out = String::from("{");
                for (i, (k, v)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{k}:{v}");
                }
                out.push('}');
                out
            }
            Object::KeyValue { key, value } => format!("{key}:{value}"),
            Object::Function(f) => f.signature.build_string(),
            Object::Iterator(_) => "<iterator>".to_string(),
            Object::Exception(exc) => exc.to_display_string(),
            Object::Scope(_) => "<scope>".to_string(),
        }
    }
}
