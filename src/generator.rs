//! The coroutine core (component G): a stackless, heap-resident resumable
//! frame stack driving generator functions.
//!
//! Modeled directly on the original runtime's stackless function machinery:
//! a `Root` frame at the bottom (resuming it simulates `return void` — the
//! generator has run to completion), `Block` frames that walk a statement
//! list by index so they can suspend between any two statements, and `While`
//! frames that re-evaluate their condition on every resume and push a fresh
//! `Block` frame for the body on each true iteration. Only these three frame
//! kinds support suspending mid-execution; a `yield` nested inside an `if`,
//! `for`, `foreach`, `switch` or `try` runs (and may itself yield once) via
//! ordinary recursive evaluation, since the original machinery these frames
//! are ported from only special-cases straight-line blocks and `while`
//! loops. See `DESIGN.md` for why this scope is intentional, not an
//! oversight.

use std::rc::Rc;

use crate::{
    ast::{Node, NodeKind},
    heap::HeapId,
    types::SimpleTypeBits,
    value::Value,
};

/// Host callback the coroutine stack uses to actually run a statement or
/// evaluate an expression. Implemented by the executor.
pub trait CoroutineDriver {
    /// Executes one top-level statement to completion (the driver may
    /// recurse arbitrarily for compound statements; only direct yields
    /// inside the immediate block or a nested `while` survive a suspend).
    fn execute_statement(&mut self, statement: &Node, scope: HeapId) -> Value;
    fn evaluate_expression(&mut self, expr: &Node, scope: HeapId) -> Value;
}

#[derive(Debug)]
enum Frame {
    Root,
    Block { statements: Rc<Vec<Node>>, scope: HeapId, progress: usize },
    While { node: Rc<Node>, scope: HeapId, body_running: bool },
}

/// A resumable stack of stackless frames, explicitly NOT `std::collections`'
/// ordinary stack-drop order: frames must unwind newest-first, since an
/// inner frame's captured scope is expected to still be alive while it tears
/// down (its soft link is only released once it's actually gone).
#[derive(Debug, Default)]
pub struct CoroutineStack(Vec<Frame>);

impl Drop for CoroutineStack {
    fn drop(&mut self) {
        // Unwind newest-first rather than relying on `Vec`'s front-to-back
        // element drop order.
        while self.0.pop().is_some() {}
    }
}

impl CoroutineStack {
    /// Starts a fresh coroutine over `body`'s statements, executing in
    /// `scope`.
    #[must_use]
    pub fn new(body: &Node, scope: HeapId) -> Self {
        let statements = Rc::new(body.as_statement_list());
        Self(vec![Frame::Root, Frame::Block { statements, scope, progress: 0 }])
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.0.is_empty() || matches!(self.0.as_slice(), [Frame::Root])
    }

    /// Visits every scope this coroutine currently holds a soft link to.
    pub fn trace(&self, visit: &mut dyn FnMut(HeapId)) {
        for frame in &self.0 {
            match frame {
                Frame::Root => {}
                Frame::Block { scope, .. } | Frame::While { scope, .. } => visit(*scope),
            }
        }
    }

    /// Resumes execution until the next `yield` or completion. Returns the
    /// yielded value (tagged with the yield bit) or a `return void`-tagged
    /// value once the generator has run to completion.
    pub fn resume(&mut self, driver: &mut dyn CoroutineDriver) -> Value {
        let mut pending: Option<Value> = None;
        loop {
            if self.0.is_empty() {
                return Value::return_void();
            }
            let top_index = self.0.len() - 1;
            match &mut self.0[top_index] {
                Frame::Root => {
                    self.0.clear();
                    return pending.unwrap_or_else(Value::return_void);
                }
                Frame::Block { statements, scope, progress } => {
                    let scope = *scope;
                    if let Some(result) = pending.take() {
                        self.0.pop();
                        pending = Some(result);
                        continue;
                    }
                    if *progress >= statements.len() {
                        self.0.pop();
                        pending = Some(Value::void());
                        continue;
                    }
                    let stmt = statements[*progress].clone();
                    *progress += 1;

                    if let NodeKind::While { .. } = &stmt.kind {
                        self.0.push(Frame::While { node: Rc::new(stmt), scope, body_running: false });
                        continue;
                    }

                    let result = driver.execute_statement(&stmt, scope);
                    if result.flow_bits() == SimpleTypeBits::NONE {
                        continue;
                    }
                    if result.has(SimpleTypeBits::YIELD) {
                        return result;
                    }
                    self.0.pop();
                    pending = Some(result);
                }
                Frame::While { node, scope, body_running } => {
                    let scope = *scope;
                    if let Some(result) = pending.take() {
                        if !*body_running {
                            // the condition itself faulted (e.g. raised).
                            self.0.pop();
                            pending = Some(result);
                            continue;
                        }
                        *body_running = false;
                        if result.has(SimpleTypeBits::BREAK) {
                            self.0.pop();
                            pending = Some(Value::void());
                            continue;
                        }
                        if result.has(SimpleTypeBits::RETURN | SimpleTypeBits::THROW) {
                            self.0.pop();
                            pending = Some(result);
                            continue;
                        }
                        // plain completion or an absorbed `continue`: fall
                        // through to re-evaluate the condition.
                    }
                    let NodeKind::While { condition, body } = &node.kind else {
                        unreachable!("While frame always wraps a While node")
                    };
                    let cond_value = driver.evaluate_expression(condition, scope);
                    if cond_value.flow_bits() != SimpleTypeBits::NONE {
                        self.0.pop();
                        pending = Some(cond_value);
                        continue;
                    }
                    if cond_value.as_bool() != Some(true) {
                        self.0.pop();
                        pending = Some(Value::void());
                        continue;
                    }
                    let statements = Rc::new(body.as_statement_list());
                    *body_running = true;
                    self.0.push(Frame::Block { statements, scope, progress: 0 });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_location::RuntimeLocation;

    struct RecordingDriver {
        values: Vec<i64>,
    }

    impl CoroutineDriver for RecordingDriver {
        fn execute_statement(&mut self, statement: &Node, _scope: HeapId) -> Value {
            match &statement.kind {
                NodeKind::Yield(expr) => {
                    let NodeKind::Literal(v) = &expr.kind else { unreachable!() };
                    Value::yield_with(v.clone())
                }
                NodeKind::ExpressionStatement(_) => Value::void(),
                _ => Value::void(),
            }
        }
        fn evaluate_expression(&mut self, expr: &Node, _scope: HeapId) -> Value {
            match &expr.kind {
                NodeKind::Literal(v) => v.clone(),
                _ => Value::void(),
            }
        }
    }

    fn literal_node(v: Value) -> Node {
        Node::new(RuntimeLocation::default(), NodeKind::Literal(v))
    }

    fn yield_node(v: Value) -> Node {
        Node::new(RuntimeLocation::default(), NodeKind::Yield(Box::new(literal_node(v))))
    }

    fn dummy_scope() -> HeapId {
        let mut basket = crate::heap::Basket::new();
        basket.alloc(crate::object::Object::new_scope(None))
    }

    #[test]
    fn yields_in_program_order_then_completes() {
        let body = Node::new(
            RuntimeLocation::default(),
            NodeKind::Block(vec![yield_node(Value::int(1)), yield_node(Value::int(2))]),
        );
        let scope = dummy_scope();
        let mut stack = CoroutineStack::new(&body, scope);
        let mut driver = RecordingDriver { values: Vec::new() };

        let first = stack.resume(&mut driver);
        assert!(first.has(SimpleTypeBits::YIELD));
        assert_eq!(first.strip_flow_control().as_int(), Some(1));

        let second = stack.resume(&mut driver);
        assert_eq!(second.strip_flow_control().as_int(), Some(2));

        let third = stack.resume(&mut driver);
        assert!(third.has(SimpleTypeBits::RETURN));
        assert!(stack.is_done());
        let _ = &driver.values;
    }

    #[test]
    fn resuming_completed_generator_is_return_void() {
        let body = Node::new(RuntimeLocation::default(), NodeKind::Block(vec![]));
        let scope = dummy_scope();
        let mut stack = CoroutineStack::new(&body, scope);
        let mut driver = RecordingDriver { values: Vec::new() };
        let result = stack.resume(&mut driver);
        assert!(result.has(SimpleTypeBits::RETURN));
        assert!(result.strip_flow_control().is_void());
    }

    #[test]
    fn while_loop_yields_each_iteration() {
        // while (true) yield 7;  — resumed exactly twice, then dropped
        // mid-loop (we don't model `break` from outside here).
        let while_node = Node::new(
            RuntimeLocation::default(),
            NodeKind::While {
                condition: Box::new(literal_node(Value::bool_(true))),
                body: Box::new(Node::new(
                    RuntimeLocation::default(),
                    NodeKind::Block(vec![yield_node(Value::int(7))]),
                )),
            },
        );
        let body = Node::new(RuntimeLocation::default(), NodeKind::Block(vec![while_node]));
        let scope = dummy_scope();
        let mut stack = CoroutineStack::new(&body, scope);
        let mut driver = RecordingDriver { values: Vec::new() };

        for _ in 0..3 {
            let v = stack.resume(&mut driver);
            assert_eq!(v.strip_flow_control().as_int(), Some(7));
        }
    }

    #[test]
    fn newest_frame_is_dropped_first() {
        // Smoke test that constructing and dropping a multi-frame stack
        // doesn't panic; the custom Drop order is exercised by miri/ASan in
        // CI rather than observable from safe code alone.
        let body = Node::new(
            RuntimeLocation::default(),
            NodeKind::Block(vec![Node::new(
                RuntimeLocation::default(),
                NodeKind::While {
                    condition: Box::new(literal_node(Value::bool_(true))),
                    body: Box::new(Node::new(RuntimeLocation::default(), NodeKind::Block(vec![yield_node(Value::int(1))]))),
                },
            )]),
        );
        let scope = dummy_scope();
        let mut stack = CoroutineStack::new(&body, scope);
        let mut driver = RecordingDriver { values: Vec::new() };
        let _ = stack.resume(&mut driver);
        drop(stack);
    }
}
