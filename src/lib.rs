//! egg: a small statically-typed tree-walking scripting-language runtime
//! core. The crate is organized bottom-up, each module building on the
//! ones above it:
//!
//! - [`strings`] — the interned string engine.
//! - [`types`] — the static type lattice.
//! - [`value`] — the tagged value cell (flow control bits + payload).
//! - [`heap`] / [`object`] — the GC'd object subsystem (`Basket` arena,
//!   mark-and-sweep, and the closed set of heap object kinds).
//! - [`scope`] — the symbol table and lexical scope chain (scopes are
//!   themselves heap objects, so closures participate in collection).
//! - [`ast`] — the program tree the executor walks.
//! - [`generator`] — the stackless coroutine mechanism backing generator
//!   functions.
//! - [`executor`] (folded into [`Interpreter`]) — the tree-walking
//!   statement/expression dispatch.
//!
//! [`diagnostics`], [`tracer`], [`resource`], and [`config`] are the
//! ambient stack: logging, step tracing, recursion/allocation limits, and
//! interpreter configuration.

mod ast;
mod config;
mod diagnostics;
mod executor;
mod generator;
mod heap;
mod interpreter;
mod object;
mod resource;
mod runtime_location;
mod scope;
mod strings;
mod tracer;
mod types;
mod value;

pub use crate::{
    ast::{BinaryOperator, CaseArm, CatchArm, Node, NodeKind, UnaryOperator},
    config::InterpreterConfig,
    diagnostics::{CollectingLogger, Logger, NoopLogger, PrepareError, RunError, RunResult, Severity, Source},
    generator::CoroutineDriver,
    heap::HeapId,
    interpreter::Interpreter,
    object::{Builtin, ExecutionContext, FunctionObject, IteratorState, Object, StringMethod},
    resource::{DEFAULT_MAX_RECURSION_DEPTH, LimitedTracker, NoLimitTracker, ResourceError, ResourceTracker},
    runtime_location::{Location, RuntimeLocation},
    strings::EggString,
    tracer::{NoopTracer, RecordingTracer, StepTracer},
    types::{Assignability, FunctionSignature, Parameter, SimpleTypeBits, Type},
    value::{ArithError, BinaryOp, Value},
};
