//! The type lattice (component B): simple-kind bitsets, unions, function
//! signatures and assignability rules.
//!
//! A `Type` is a bitset of simple kinds (including the flow-control kinds a
//! value can carry) plus, optionally, a callable signature or a pointee type
//! for reference types. This mirrors the original runtime's "bits plus
//! optional descriptor" shape rather than a full nominal type hierarchy —
//! egg objects are structurally typed at the `Object` bit.

use std::{fmt, rc::Rc};

/// A bitset over the simple type kinds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SimpleTypeBits(u32);

macro_rules! bits {
    ($($name:ident = $shift:expr),+ $(,)?) => {
        impl SimpleTypeBits {
            $(pub const $name: SimpleTypeBits = SimpleTypeBits(1 << $shift);)+
        }
    };
}

bits! {
    VOID = 0,
    NULL = 1,
    BOOL = 2,
    INT = 3,
    FLOAT = 4,
    STRING = 5,
    OBJECT = 6,
    TYPE = 7,
    BREAK = 8,
    CONTINUE = 9,
    RETURN = 10,
    YIELD = 11,
    THROW = 12,
    INFERRED = 13,
}

impl SimpleTypeBits {
    pub const NONE: SimpleTypeBits = SimpleTypeBits(0);
    pub const ARITHMETIC: SimpleTypeBits = SimpleTypeBits(Self::INT.0 | Self::FLOAT.0);
    pub const ANY: SimpleTypeBits = SimpleTypeBits(
        Self::VOID.0
            | Self::NULL.0
            | Self::BOOL.0
            | Self::INT.0
            | Self::FLOAT.0
            | Self::STRING.0
            | Self::OBJECT.0
            | Self::TYPE.0,
    );
    pub const FLOW_CONTROL: SimpleTypeBits = SimpleTypeBits(
        Self::BREAK.0 | Self::CONTINUE.0 | Self::RETURN.0 | Self::YIELD.0 | Self::THROW.0,
    );

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub fn is_simple_single(self) -> bool {
        self.0 != 0 && self.0 & (self.0 - 1) == 0
    }

    fn names(self) -> Vec<&'static str> {
        let table: &[(SimpleTypeBits, &str)] = &[
            (Self::VOID, "void"),
            (Self::NULL, "null"),
            (Self::BOOL, "bool"),
            (Self::INT, "int"),
            (Self::FLOAT, "float"),
            (Self::STRING, "string"),
            (Self::OBJECT, "object"),
            (Self::TYPE, "type"),
            (Self::BREAK, "break"),
            (Self::CONTINUE, "continue"),
            (Self::RETURN, "return"),
            (Self::YIELD, "yield"),
            (Self::THROW, "throw"),
            (Self::INFERRED, "var"),
        ];
        table.iter().filter(|(bit, _)| self.contains(*bit)).map(|(_, n)| *n).collect()
    }
}

impl std::ops::BitOr for SimpleTypeBits {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for SimpleTypeBits {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl std::ops::Sub for SimpleTypeBits {
    type Output = Self;
    /// Removes `rhs`'s bits from `self`.
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 & !rhs.0)
    }
}

impl fmt::Debug for SimpleTypeBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join("|"))
    }
}

/// One parameter of a function signature.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub param_type: Type,
    pub position: usize,
    pub required: bool,
    pub variadic: bool,
    /// Marks a predicate (lazily-evaluated) parameter, e.g. `assert`'s condition.
    pub predicate: bool,
}

/// A callable's shape: optional name, ordered parameters, return type, and
/// whether calling it drives a generator coroutine instead of a plain call.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionSignature {
    pub name: Option<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: Type,
    pub generator: bool,
}

impl FunctionSignature {
    #[must_use]
    pub fn new(return_type: Type, parameters: Vec<Parameter>) -> Self {
        Self { name: None, parameters, return_type, generator: false }
    }

    /// Builds the default human-readable signature string, e.g.
    /// `int(string a, float...b = 0.0)` or `name(...)` when named.
    #[must_use]
    pub fn build_string(&self) -> String {
        let mut out = String::new();
        if self.generator {
            out.push_str("...");
        }
        out.push_str(&self.return_type.to_string());
        out.push(' ');
        out.push_str(self.name.as_deref().unwrap_or(""));
        out.push('(');
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&p.param_type.to_string());
            if p.variadic {
                out.push_str("...");
            }
            if !p.name.is_empty() {
                out.push(' ');
                out.push_str(&p.name);
            }
            if !p.required {
                out.push('?');
            }
        }
        out.push(')');
        out
    }
}

/// Result of an assignability check: a tri-state verdict plus, for the
/// uncertain case, the reason a runtime check is required.
#[derive(Clone, Debug, PartialEq)]
pub enum Assignability {
    Always,
    Never,
    /// Assignable only for some runtime values of the source type (e.g. a
    /// wider union being narrowed) — the executor must check at the point of
    /// assignment.
    Sometimes { reason: String },
}

/// A type: a bitset of simple kinds plus an optional callable signature or
/// pointee (for reference/pointer types produced by `referencedType`).
#[derive(Clone, Debug, PartialEq)]
pub struct Type {
    bits: SimpleTypeBits,
    signature: Option<Rc<FunctionSignature>>,
    pointee: Option<Rc<Type>>,
}

impl Type {
    fn simple(bits: SimpleTypeBits) -> Self {
        Self { bits, signature: None, pointee: None }
    }

    /// Builds a plain type from a raw bitset, e.g. the simple kind of a
    /// `Value` with no richer callable/pointer descriptor attached.
    #[must_use]
    pub fn simple_of(bits: SimpleTypeBits) -> Self {
        Self::simple(bits)
    }

    #[must_use]
    pub fn void() -> Self {
        Self::simple(SimpleTypeBits::VOID)
    }
    #[must_use]
    pub fn null() -> Self {
        Self::simple(SimpleTypeBits::NULL)
    }
    #[must_use]
    pub fn bool_() -> Self {
        Self::simple(SimpleTypeBits::BOOL)
    }
    #[must_use]
    pub fn int() -> Self {
        Self::simple(SimpleTypeBits::INT)
    }
    #[must_use]
    pub fn float() -> Self {
        Self::simple(SimpleTypeBits::FLOAT)
    }
    #[must_use]
    pub fn string() -> Self {
        Self::simple(SimpleTypeBits::STRING)
    }
    #[must_use]
    pub fn object() -> Self {
        Self::simple(SimpleTypeBits::OBJECT)
    }
    #[must_use]
    pub fn type_() -> Self {
        Self::simple(SimpleTypeBits::TYPE)
    }
    #[must_use]
    pub fn arithmetic() -> Self {
        Self::simple(SimpleTypeBits::ARITHMETIC)
    }
    #[must_use]
    pub fn any() -> Self {
        Self::simple(SimpleTypeBits::ANY)
    }
    #[must_use]
    pub fn any_q() -> Self {
        Self::simple(SimpleTypeBits::ANY | SimpleTypeBits::NULL)
    }
    #[must_use]
    pub fn inferred() -> Self {
        Self::simple(SimpleTypeBits::INFERRED)
    }

    #[must_use]
    pub fn flow_control(bit: SimpleTypeBits) -> Self {
        debug_assert!(SimpleTypeBits::FLOW_CONTROL.contains(bit));
        Self::simple(bit)
    }

    #[must_use]
    pub fn callable(signature: FunctionSignature) -> Self {
        Self { bits: SimpleTypeBits::OBJECT, signature: Some(Rc::new(signature)), pointee: None }
    }

    #[must_use]
    pub fn bits(&self) -> SimpleTypeBits {
        self.bits
    }

    #[must_use]
    pub fn signature(&self) -> Option<&Rc<FunctionSignature>> {
        self.signature.as_ref()
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.bits.contains(SimpleTypeBits::NULL)
    }

    /// Builds a reference type ("pointer to `self`").
    #[must_use]
    pub fn referenced_type(&self) -> Self {
        Self { bits: SimpleTypeBits::OBJECT, signature: None, pointee: Some(Rc::new(self.clone())) }
    }

    /// Unwraps a reference type produced by `referenced_type`; `None` if
    /// `self` is not a pointer type.
    #[must_use]
    pub fn dereferenced_type(&self) -> Option<Self> {
        self.pointee.as_deref().cloned()
    }

    /// Combines two types into their union (bitwise-or of simple kinds;
    /// callable signatures are dropped unless identical, since this lattice
    /// doesn't model arbitrary intersection/union of signatures).
    #[must_use]
    pub fn union_with(&self, other: &Self) -> Self {
        let bits = self.bits | other.bits;
        let signature = match (&self.signature, &other.signature) {
            (Some(a), Some(b)) if a == b => Some(a.clone()),
            _ => None,
        };
        Self { bits, signature, pointee: None }
    }

    /// Strips the `null` bit — the type of `a ?? b`'s left operand once
    /// coalesced.
    #[must_use]
    pub fn coalesced_type(&self) -> Self {
        Self { bits: self.bits - SimpleTypeBits::NULL, signature: self.signature.clone(), pointee: self.pointee.clone() }
    }

    /// Tri-state assignability check: can a value of `other` always, never,
    /// or sometimes be assigned to a variable of type `self`?
    #[must_use]
    pub fn can_be_assigned_from(&self, other: &Self) -> Assignability {
        if self.bits.contains(SimpleTypeBits::INFERRED) {
            return Assignability::Always;
        }
        if other.bits.contains(SimpleTypeBits::INFERRED) {
            return Assignability::Sometimes { reason: "source type not yet inferred".to_string() };
        }
        if self.bits.contains(other.bits) {
            return Assignability::Always;
        }
        // int -> float promotion is the one implicit numeric widening.
        if self.bits.contains(SimpleTypeBits::FLOAT)
            && other.bits == SimpleTypeBits::INT
            && (self.bits - SimpleTypeBits::FLOAT).contains(other.bits - SimpleTypeBits::INT)
        {
            return Assignability::Always;
        }
        if self.bits.intersects(other.bits) {
            let missing: Vec<&str> = (other.bits - self.bits).names();
            return Assignability::Sometimes {
                reason: format!("value may hold excluded kind(s): {}", missing.join(", ")),
            };
        }
        // A lone float target still accepts a union containing int alongside
        // other kinds it otherwise rejects outright, handled above; anything
        // left over with zero overlap (even after promotion) can never work.
        if self.bits.contains(SimpleTypeBits::ARITHMETIC) && other.bits.contains(SimpleTypeBits::INT) {
            return Assignability::Always;
        }
        Assignability::Never
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sig) = &self.signature {
            return write!(f, "{}", sig.build_string());
        }
        if let Some(pointee) = &self.pointee {
            return write!(f, "{pointee}*");
        }
        let names = self.bits.names();
        if names.is_empty() {
            write!(f, "<none>")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_assignable_same_kind() {
        assert_eq!(Type::int().can_be_assigned_from(&Type::int()), Assignability::Always);
    }

    #[test]
    fn int_promotes_to_float() {
        assert_eq!(Type::float().can_be_assigned_from(&Type::int()), Assignability::Always);
    }

    #[test]
    fn never_assignable_disjoint() {
        assert_eq!(Type::string().can_be_assigned_from(&Type::int()), Assignability::Never);
    }

    #[test]
    fn sometimes_assignable_overlapping_union() {
        let target = Type::int();
        let source = Type::int().union_with(&Type::string());
        match target.can_be_assigned_from(&source) {
            Assignability::Sometimes { .. } => {}
            other => panic!("expected Sometimes, got {other:?}"),
        }
    }

    #[test]
    fn union_with_is_commutative_on_bits() {
        let a = Type::int().union_with(&Type::string());
        let b = Type::string().union_with(&Type::int());
        assert_eq!(a.bits(), b.bits());
    }

    #[test]
    fn coalesced_type_strips_null() {
        let nullable = Type::int().union_with(&Type::null());
        assert!(nullable.is_nullable());
        assert!(!nullable.coalesced_type().is_nullable());
    }

    #[test]
    fn referenced_type_round_trips() {
        let t = Type::int();
        let r = t.referenced_type();
        assert_eq!(r.dereferenced_type(), Some(t));
    }

    #[test]
    fn dereferencing_non_pointer_is_none() {
        assert_eq!(Type::int().dereferenced_type(), None);
    }

    #[test]
    fn display_matches_simple_name() {
        assert_eq!(Type::int().to_string(), "int");
        let u = Type::int().union_with(&Type::null());
        assert_eq!(u.to_string(), "int|null");
    }

    #[test]
    fn signature_build_string() {
        let sig = FunctionSignature {
            name: Some("add".to_string()),
            parameters: vec![
                Parameter { name: "a".to_string(), param_type: Type::int(), position: 0, required: true, variadic: false, predicate: false },
                Parameter { name: "b".to_string(), param_type: Type::int(), position: 1, required: false, variadic: false, predicate: false },
            ],
            return_type: Type::int(),
            generator: false,
        };
        assert_eq!(sig.build_string(), "int add(int a, int b?)");
    }
}
