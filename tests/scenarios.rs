//! End-to-end scenarios: whole programs built as `Node` trees (no parser in
//! scope, §1) run through `Interpreter::run_module` and checked against
//! their `print`ed output.

use std::{cell::RefCell, rc::Rc};

use egg::{
    BinaryOp, BinaryOperator, CatchArm, EggString, FunctionSignature, Interpreter, InterpreterConfig, Location,
    Logger, Node, NodeKind, RuntimeLocation, Severity, Source, Type, Value,
};

#[derive(Clone, Default)]
struct SharedLog(Rc<RefCell<Vec<String>>>);

impl Logger for SharedLog {
    fn log(&mut self, source: Source, severity: Severity, message: &str) {
        if source == Source::User && severity == Severity::Information {
            self.0.borrow_mut().push(message.to_string());
        }
    }
}

fn loc() -> RuntimeLocation {
    RuntimeLocation { location: Location { resource: "test".to_string(), line: 1, column: 1 }, unit: None }
}

fn node(kind: NodeKind) -> Node {
    Node::new(loc(), kind)
}

fn lit(v: Value) -> Node {
    node(NodeKind::Literal(v))
}

fn ident(name: &str) -> Node {
    node(NodeKind::Identifier(EggString::from_str(name)))
}

fn print_call(args: Vec<Node>) -> Node {
    node(NodeKind::ExpressionStatement(Box::new(node(NodeKind::Call { callee: Box::new(ident("print")), args }))))
}

fn run(statements: Vec<Node>) -> Vec<String> {
    let log = SharedLog::default();
    let mut interp = Interpreter::new(InterpreterConfig::default()).with_logger(log.clone());
    let module = node(NodeKind::Module(statements));
    interp.run_module(&module).expect("program should run without a host-level fault");
    log.0.borrow().clone()
}

/// `print("Hello, ", "world!");` logs exactly `Hello, world!`.
#[test]
fn print_concatenates_its_arguments() {
    let output = run(vec![print_call(vec![
        lit(Value::str(EggString::from_str("Hello, "))),
        lit(Value::str(EggString::from_str("world!"))),
    ])]);
    assert_eq!(output, vec!["Hello, world!"]);
}

/// `for (var x : [10, 20, 30]) { print(x); }` logs three lines.
#[test]
fn foreach_over_an_array_literal_visits_each_element_in_order() {
    let array = node(NodeKind::ArrayLiteral(vec![lit(Value::int(10)), lit(Value::int(20)), lit(Value::int(30))]));
    let foreach = node(NodeKind::Foreach {
        name: EggString::from_str("x"),
        declared_type: Type::int(),
        source: Box::new(array),
        body: Box::new(node(NodeKind::Block(vec![print_call(vec![ident("x")])]))),
    });
    let output = run(vec![foreach]);
    assert_eq!(output, vec!["10", "20", "30"]);
}

/// `var s = "abc"; print(s.repeat(3));` logs `abcabcabc`.
#[test]
fn string_repeat_via_dot_call_concatenates_n_copies() {
    let declare = node(NodeKind::Declare {
        name: EggString::from_str("s"),
        declared_type: Type::string(),
        initializer: Some(Box::new(lit(Value::str(EggString::from_str("abc"))))),
    });
    let repeat_call = node(NodeKind::Call {
        callee: Box::new(node(NodeKind::Dot { base: Box::new(ident("s")), name: EggString::from_str("repeat") })),
        args: vec![lit(Value::int(3))],
    });
    let output = run(vec![declare, print_call(vec![repeat_call])]);
    assert_eq!(output, vec!["abcabcabc"]);
}

/// `var a = []; a[0] = "x"; a[2] = "z"; print(a.length, ":", a[1]);` logs `3:null`.
#[test]
fn sparse_index_assignment_grows_the_array_with_null_gaps() {
    let declare = node(NodeKind::Declare {
        name: EggString::from_str("a"),
        declared_type: Type::any(),
        initializer: Some(Box::new(node(NodeKind::ArrayLiteral(vec![])))),
    });
    let set = |index: i64, value: &str| {
        node(NodeKind::ExpressionStatement(Box::new(node(NodeKind::Assign {
            target: Box::new(node(NodeKind::Brackets {
                base: Box::new(ident("a")),
                index: Box::new(lit(Value::int(index))),
            })),
            value: Box::new(lit(Value::str(EggString::from_str(value)))),
        }))))
    };
    let length = node(NodeKind::Dot { base: Box::new(ident("a")), name: EggString::from_str("length") });
    let element_one = node(NodeKind::Brackets { base: Box::new(ident("a")), index: Box::new(lit(Value::int(1))) });
    let print_stmt = print_call(vec![length, lit(Value::str(EggString::from_str(":"))), element_one]);
    let output = run(vec![declare, set(0, "x"), set(2, "z"), print_stmt]);
    assert_eq!(output, vec!["3:null"]);
}

/// `try { throw "boom"; } catch (string e) { print(e); } finally { print("done"); }`
/// logs `boom` then `done`.
#[test]
fn try_catch_finally_runs_the_handler_then_the_finally_block() {
    let throw_stmt = node(NodeKind::Throw(Some(Box::new(lit(Value::str(EggString::from_str("boom")))))));
    let try_stmt = node(NodeKind::Try {
        body: Box::new(node(NodeKind::Block(vec![throw_stmt]))),
        catches: vec![CatchArm {
            exception_name: EggString::from_str("e"),
            declared_type: Type::string(),
            body: node(NodeKind::Block(vec![print_call(vec![ident("e")])])),
        }],
        finally: Some(Box::new(node(NodeKind::Block(vec![print_call(vec![lit(Value::str(EggString::from_str(
            "done",
        )))])])))),
    });
    let output = run(vec![try_stmt]);
    assert_eq!(output, vec!["boom", "done"]);
}

/// `function counter() { yield 1; yield 2; }` consumed by
/// `for (var i : counter()) print(i);` logs `1` then `2`.
#[test]
fn generator_function_yields_are_consumed_one_at_a_time_by_foreach() {
    let yield_one = node(NodeKind::ExpressionStatement(Box::new(node(NodeKind::Yield(Box::new(lit(Value::int(
        1,
    ))))))));
    let yield_two = node(NodeKind::ExpressionStatement(Box::new(node(NodeKind::Yield(Box::new(lit(Value::int(
        2,
    ))))))));
    let signature = FunctionSignature { generator: true, ..FunctionSignature::new(Type::void(), vec![]) };
    let define = node(NodeKind::FunctionDefinition {
        name: Some(EggString::from_str("counter")),
        signature: Rc::new(signature),
        body: Rc::new(node(NodeKind::Block(vec![yield_one, yield_two]))),
    });
    let foreach = node(NodeKind::Foreach {
        name: EggString::from_str("i"),
        declared_type: Type::int(),
        source: Box::new(node(NodeKind::Call { callee: Box::new(ident("counter")), args: vec![] })),
        body: Box::new(node(NodeKind::Block(vec![print_call(vec![ident("i")])]))),
    });
    let output = run(vec![define, foreach]);
    assert_eq!(output, vec!["1", "2"]);
}

/// A compound-mutate and a null-coalescing initializer compose across
/// separate declarations in the same module.
#[test]
fn mutate_and_null_coalesce_compose_across_statements() {
    let declare_total = node(NodeKind::Declare {
        name: EggString::from_str("total"),
        declared_type: Type::int(),
        initializer: Some(Box::new(lit(Value::int(10)))),
    });
    let mutate = node(NodeKind::ExpressionStatement(Box::new(node(NodeKind::Mutate {
        op: BinaryOp::Add,
        target: Box::new(ident("total")),
        value: Box::new(lit(Value::int(5))),
    }))));
    let declare_label = node(NodeKind::Declare {
        name: EggString::from_str("label"),
        declared_type: Type::string(),
        initializer: Some(Box::new(node(NodeKind::Binary {
            op: BinaryOperator::NullCoalesce,
            lhs: Box::new(lit(Value::null())),
            rhs: Box::new(lit(Value::str(EggString::from_str("fallback")))),
        }))),
    });
    let print_stmt = print_call(vec![ident("total"), lit(Value::str(EggString::from_str(" "))), ident("label")]);
    let output = run(vec![declare_total, mutate, declare_label, print_stmt]);
    assert_eq!(output, vec!["15 fallback"]);
}
