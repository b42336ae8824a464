//! Ties every component together into a single runnable interpreter: one
//! `Basket`, one root scope, one configuration, and the ambient services
//! (logger, tracer, resource limits) every statement execution consults.

use crate::{
    ast::{Node, NodeKind},
    config::InterpreterConfig,
    diagnostics::{Logger, NoopLogger, RunError, RunResult, Severity, Source},
    generator::CoroutineDriver,
    heap::{Basket, HeapId},
    object::{ExecutionContext, Object},
    resource::{LimitedTracker, ResourceError, ResourceTracker},
    runtime_location::RuntimeLocation,
    scope,
    strings::EggString,
    tracer::{NoopTracer, StepTracer},
    value::Value,
};

pub struct Interpreter {
    pub(crate) basket: Basket,
    pub(crate) root: HeapId,
    pub(crate) config: InterpreterConfig,
    pub(crate) logger: Box<dyn Logger>,
    pub(crate) tracer: Box<dyn StepTracer>,
    pub(crate) resources: Box<dyn ResourceTracker>,
    pub(crate) current_location: RuntimeLocation,
}

impl Interpreter {
    #[must_use]
    pub fn new(config: InterpreterConfig) -> Self {
        let mut basket = Basket::new();
        let root = scope::create_root(&mut basket);
        scope::seed_builtins(&mut basket, root);
        let resources = Box::new(LimitedTracker::new(config.max_recursion_depth, None));
        Self {
            basket,
            root,
            config,
            logger: Box::new(NoopLogger),
            tracer: Box::new(NoopTracer),
            resources,
            current_location: RuntimeLocation::default(),
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    #[must_use]
    pub fn with_tracer(mut self, tracer: impl StepTracer + 'static) -> Self {
        self.tracer = Box::new(tracer);
        self
    }

    #[must_use]
    pub fn with_resources(mut self, resources: impl ResourceTracker + 'static) -> Self {
        self.resources = Box::new(resources);
        self
    }

    #[must_use]
    pub fn root_scope(&self) -> HeapId {
        self.root
    }

    /// Runs a `Module` node's statements in the root scope, stopping at the
    /// first flow-controlled result (a top-level `return` ends the program;
    /// an uncaught `throw` is handed back to the caller).
    pub fn run_module(&mut self, module: &Node) -> RunResult<Value> {
        let NodeKind::Module(statements) = &module.kind else {
            return Err(RunError::InvariantViolation { detail: "run_module given a non-module node".to_string() });
        };
        for stmt in statements {
            let result = self.statement(stmt, self.root)?;
            if result.is_flow_controlled() {
                return Ok(result.strip_flow_control());
            }
            self.maybe_collect();
        }
        Ok(Value::void())
    }

    pub(crate) fn maybe_collect(&mut self) {
        if self.basket.allocation_count() % self.config.gc_threshold.max(1) == 0 {
            self.basket.collect_garbage();
        }
    }

    pub(crate) fn enter_call(&mut self) -> RunResult<()> {
        self.resources.enter_call().map_err(|e| match e {
            ResourceError::RecursionLimit { .. } => RunError::RecursionLimit { depth: self.resources.current_depth() },
            ResourceError::AllocationLimit { .. } => {
                RunError::InvariantViolation { detail: e.to_string() }
            }
        })
    }

    pub(crate) fn exit_call(&mut self) {
        self.resources.exit_call();
    }

    pub(crate) fn warn(&mut self, message: &str) {
        self.logger.log(Source::Runtime, Severity::Warning, message);
    }
}

impl ExecutionContext for Interpreter {
    fn heap_mut(&mut self) -> &mut Basket {
        &mut self.basket
    }
    fn heap(&self) -> &Basket {
        &self.basket
    }

    fn raise(&mut self, message: String) -> Value {
        let exception = Object::Exception(crate::object::ExceptionObject {
            message: EggString::from_str(&message),
            location: Some(self.current_location.clone()),
            fields: indexmap::IndexMap::new(),
        });
        let id = self.basket.alloc(exception);
        Value::throw_with(Value::object(id))
    }

    fn print(&mut self, text: &str) {
        self.logger.log(Source::User, Severity::Information, text);
    }
}

impl CoroutineDriver for Interpreter {
    fn execute_statement(&mut self, statement: &Node, scope: HeapId) -> Value {
        match self.statement(statement, scope) {
            Ok(v) => v,
            Err(e) => self.raise(e.to_string()),
        }
    }

    fn evaluate_expression(&mut self, expr: &Node, scope: HeapId) -> Value {
        match self.expression(expr, scope) {
            Ok(v) => v,
            Err(e) => self.raise(e.to_string()),
        }
    }
}
