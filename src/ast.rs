//! The program-tree contract handed in by the (external) parser/promotion
//! pass. This crate consumes `Node` trees; it does not build them from
//! source text.

use std::rc::Rc;

use crate::{
    runtime_location::RuntimeLocation,
    strings::EggString,
    types::{FunctionSignature, Type},
    value::{BinaryOp, Value},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    LogicalNot,
    BitwiseNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Arith(BinaryOp),
    Equals,
    NotEquals,
    LogicalAnd,
    LogicalOr,
    NullCoalesce,
}

#[derive(Clone, Debug)]
pub struct CaseArm {
    pub values: Vec<Node>,
    pub body: Node,
}

#[derive(Clone, Debug)]
pub struct CatchArm {
    pub exception_name: EggString,
    pub declared_type: Type,
    pub body: Node,
}

/// One node of the program tree: a location plus a statement- or
/// expression-shaped payload. Statements and expressions share a node type
/// because egg allows expression-statements and the executor's recursion
/// doesn't need to distinguish the two structurally.
#[derive(Clone, Debug)]
pub struct Node {
    pub location: RuntimeLocation,
    pub kind: NodeKind,
}

impl Node {
    #[must_use]
    pub fn new(location: RuntimeLocation, kind: NodeKind) -> Self {
        Self { location, kind }
    }

    /// Normalizes this node to a statement list: a `Block`'s own statements,
    /// or a single-element list wrapping any other statement.
    #[must_use]
    pub fn as_statement_list(&self) -> Vec<Node> {
        match &self.kind {
            NodeKind::Block(statements) => statements.clone(),
            _ => vec![self.clone()],
        }
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    // --- statements ---
    Module(Vec<Node>),
    Block(Vec<Node>),
    Declare {
        name: EggString,
        declared_type: Type,
        initializer: Option<Box<Node>>,
    },
    /// `if (type name = expr) body` — a scoped binding guarded by a
    /// successful type-narrowing initializer.
    Guard {
        name: EggString,
        declared_type: Type,
        initializer: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    /// A compound assignment, e.g. `x += 1`.
    Mutate {
        op: BinaryOp,
        target: Box<Node>,
        value: Box<Node>,
    },
    If {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    Do {
        body: Box<Node>,
        condition: Box<Node>,
    },
    For {
        init: Option<Box<Node>>,
        condition: Option<Box<Node>>,
        increment: Option<Box<Node>>,
        body: Box<Node>,
    },
    Foreach {
        name: EggString,
        declared_type: Type,
        source: Box<Node>,
        body: Box<Node>,
    },
    Switch {
        value: Box<Node>,
        cases: Vec<CaseArm>,
        default: Option<Box<Node>>,
    },
    Try {
        body: Box<Node>,
        catches: Vec<CatchArm>,
        finally: Option<Box<Node>>,
    },
    Throw(Option<Box<Node>>),
    Return(Option<Box<Node>>),
    Yield(Box<Node>),
    Break,
    Continue,
    FunctionDefinition {
        name: Option<EggString>,
        signature: Rc<FunctionSignature>,
        body: Rc<Node>,
    },
    ExpressionStatement(Box<Node>),

    // --- expressions ---
    Literal(Value),
    Identifier(EggString),
    Dot {
        base: Box<Node>,
        name: EggString,
    },
    Brackets {
        base: Box<Node>,
        index: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    ArrayLiteral(Vec<Node>),
    ObjectLiteral(Vec<(EggString, Node)>),
    Unary {
        op: UnaryOperator,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Ternary {
        condition: Box<Node>,
        then_expr: Box<Node>,
        else_expr: Box<Node>,
    },
    /// A lazily-evaluated argument wrapper, e.g. the condition passed to
    /// `assert`: the callee decides whether (and when) to evaluate it.
    Predicate(Box<Node>),
}
