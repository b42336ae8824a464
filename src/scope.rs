//! The symbol table & scope component (component E): a chain of
//! insertion-ordered frames, built directly on top of the heap's `Scope`
//! object kind so closures that capture their own defining scope form a
//! cycle the basket's mark-and-sweep can still collect.
//!
//! This is deliberately *not* the teacher's slot/namespace-index design —
//! that shape exists to serve a bytecode VM's compiled variable slots, and
//! this runtime resolves names directly against a chain of frames at
//! execution time, as the specification requires.

use crate::{
    heap::{Basket, HeapId},
    object::{Builtin, Object, Scope, Symbol},
    strings::EggString,
    types::Type,
    value::Value,
};

/// Outcome of declaring a new binding.
#[derive(Debug, PartialEq, Eq)]
pub enum DeclareOutcome {
    /// A fresh binding with no name collision anywhere in the chain.
    Inserted,
    /// Inserted, but the name also exists in an enclosing frame — legal,
    /// but callers should log a shadowing warning.
    Shadowed,
    /// Rejected: a binding with this name already exists in *this* frame.
    DuplicateInFrame,
}

/// Allocates a fresh root scope and marks it as a GC root.
pub fn create_root(basket: &mut Basket) -> HeapId {
    let id = basket.alloc(Object::new_scope(None));
    basket.retain(id);
    id
}

/// Allocates a child scope of `parent` and marks it as a GC root (the
/// executor releases it when the block exits).
pub fn push_child(basket: &mut Basket, parent: HeapId) -> HeapId {
    let id = basket.alloc(Object::new_scope(Some(parent)));
    basket.retain(id);
    id
}

/// Releases a child scope's root status. It stays alive only if something
/// else (a closure's `defining_scope` soft link) still reaches it.
pub fn pop_child(basket: &mut Basket, scope: HeapId) {
    basket.release(scope);
}

fn as_scope(basket: &Basket, id: HeapId) -> &Scope {
    match basket.get(id) {
        Some(Object::Scope(scope)) => scope,
        _ => panic!("heap id {id:?} does not refer to a scope"),
    }
}

fn as_scope_mut(basket: &mut Basket, id: HeapId) -> &mut Scope {
    match basket.get_mut(id) {
        Some(Object::Scope(scope)) => scope,
        _ => panic!("heap id {id:?} does not refer to a scope"),
    }
}

/// Seeds the root scope with the builtin namespace: `assert`, `print`,
/// `string`, `type`.
pub fn seed_builtins(basket: &mut Basket, root: HeapId) {
    let assert_id = basket.alloc(Object::Builtin(Builtin::Assert));
    let print_id = basket.alloc(Object::Builtin(Builtin::Print));
    let string_id = basket.alloc(Object::Builtin(Builtin::StringNamespace));
    let type_id = basket.alloc(Object::Builtin(Builtin::TypeNamespace));

    let scope = as_scope_mut(basket, root);
    scope.symbols.insert(
        EggString::from_str("assert"),
        Symbol { declared_type: Type::object(), value: Value::object(assert_id), mutable: false },
    );
    scope.symbols.insert(
        EggString::from_str("print"),
        Symbol { declared_type: Type::object(), value: Value::object(print_id), mutable: false },
    );
    scope.symbols.insert(
        EggString::from_str("string"),
        Symbol { declared_type: Type::object(), value: Value::object(string_id), mutable: false },
    );
    scope.symbols.insert(
        EggString::from_str("type"),
        Symbol { declared_type: Type::object(), value: Value::object(type_id), mutable: false },
    );
}

/// Declares a new binding in `scope`'s own frame.
pub fn declare(
    basket: &mut Basket,
    scope: HeapId,
    name: EggString,
    declared_type: Type,
    value: Value,
    mutable: bool,
) -> DeclareOutcome {
    let shadowed = lookup(basket, scope, &name).is_some();
    let frame = as_scope_mut(basket, scope);
    if frame.symbols.contains_key(&name) {
        return DeclareOutcome::DuplicateInFrame;
    }
    frame.symbols.insert(name, Symbol { declared_type, value, mutable });
    if shadowed {
        DeclareOutcome::Shadowed
    } else {
        DeclareOutcome::Inserted
    }
}

/// Looks up `name`, searching outward through enclosing frames.
#[must_use]
pub fn lookup<'a>(basket: &'a Basket, scope: HeapId, name: &EggString) -> Option<&'a Symbol> {
    let mut current = Some(scope);
    while let Some(id) = current {
        let frame = as_scope(basket, id);
        if let Some(symbol) = frame.symbols.get(name) {
            return Some(symbol);
        }
        current = frame.parent;
    }
    None
}

/// Assigns to an existing binding, searching outward through enclosing
/// frames. Returns `false` if no such binding exists anywhere in the chain.
pub fn assign(basket: &mut Basket, scope: HeapId, name: &EggString, value: Value) -> bool {
    let mut current = Some(scope);
    while let Some(id) = current {
        let frame = as_scope_mut(basket, id);
        if let Some(symbol) = frame.symbols.get_mut(name) {
            symbol.value = value;
            return true;
        }
        current = frame.parent;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> EggString {
        EggString::from_str(s)
    }

    #[test]
    fn builtins_are_seeded_at_root() {
        let mut basket = Basket::new();
        let root = create_root(&mut basket);
        seed_builtins(&mut basket, root);
        assert!(lookup(&basket, root, &name("assert")).is_some());
        assert!(lookup(&basket, root, &name("print")).is_some());
        assert!(lookup(&basket, root, &name("string")).is_some());
        assert!(lookup(&basket, root, &name("type")).is_some());
    }

    #[test]
    fn duplicate_declaration_in_same_frame_is_rejected() {
        let mut basket = Basket::new();
        let root = create_root(&mut basket);
        assert_eq!(declare(&mut basket, root, name("x"), Type::int(), Value::int(1), true), DeclareOutcome::Inserted);
        assert_eq!(
            declare(&mut basket, root, name("x"), Type::int(), Value::int(2), true),
            DeclareOutcome::DuplicateInFrame
        );
    }

    #[test]
    fn shadowing_an_outer_frame_is_accepted_with_a_flag() {
        let mut basket = Basket::new();
        let root = create_root(&mut basket);
        declare(&mut basket, root, name("x"), Type::int(), Value::int(1), true);
        let child = push_child(&mut basket, root);
        assert_eq!(
            declare(&mut basket, child, name("x"), Type::int(), Value::int(2), true),
            DeclareOutcome::Shadowed
        );
        assert_eq!(lookup(&basket, child, &name("x")).unwrap().value.as_int(), Some(2));
        assert_eq!(lookup(&basket, root, &name("x")).unwrap().value.as_int(), Some(1));
    }

    #[test]
    fn lookup_walks_outward_through_frames() {
        let mut basket = Basket::new();
        let root = create_root(&mut basket);
        declare(&mut basket, root, name("x"), Type::int(), Value::int(1), true);
        let child = push_child(&mut basket, root);
        assert_eq!(lookup(&basket, child, &name("x")).unwrap().value.as_int(), Some(1));
    }

    #[test]
    fn assign_updates_the_frame_that_owns_the_name() {
        let mut basket = Basket::new();
        let root = create_root(&mut basket);
        declare(&mut basket, root, name("x"), Type::int(), Value::int(1), true);
        let child = push_child(&mut basket, root);
        assert!(assign(&mut basket, child, &name("x"), Value::int(99)));
        assert_eq!(lookup(&basket, root, &name("x")).unwrap().value.as_int(), Some(99));
    }

    #[test]
    fn assigning_unknown_name_fails() {
        let mut basket = Basket::new();
        let root = create_root(&mut basket);
        assert!(!assign(&mut basket, root, &name("missing"), Value::int(1)));
    }

    #[test]
    fn popped_non_root_scope_is_collected() {
        let mut basket = Basket::new();
        let root = create_root(&mut basket);
        let child = push_child(&mut basket, root);
        pop_child(&mut basket, child);
        let garbage = basket.collect_garbage();
        assert_eq!(garbage.len(), 1);
    }

    #[test]
    fn scope_still_reachable_through_closure_is_not_collected() {
        let mut basket = Basket::new();
        let root = create_root(&mut basket);
        let child = push_child(&mut basket, root);
        // a function value captured in root, closing over `child`
        let body = std::rc::Rc::new(crate::ast::Node::new(
            crate::runtime_location::RuntimeLocation::default(),
            crate::ast::NodeKind::Block(vec![]),
        ));
        let signature = std::rc::Rc::new(crate::types::FunctionSignature::new(Type::void(), vec![]));
        let function_id = basket.alloc(Object::Function(crate::object::FunctionObject {
            signature,
            body,
            defining_scope: child,
            is_generator: false,
        }));
        declare(&mut basket, root, name("f"), Type::object(), Value::object(function_id), false);
        pop_child(&mut basket, child);
        let garbage = basket.collect_garbage();
        assert!(garbage.is_empty());
        assert!(basket.get(child).is_some());
    }
}
