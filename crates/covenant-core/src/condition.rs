//! Conditions: compiled predicates tied to a source location.
//!
//! Parsing contract expressions out of docstrings is an external collaborator
//! (see `spec.md` §1); this module only carries the data a parser would hand
//! back to the engine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A location a condition or message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

/// A compiled predicate: its source location, original text, and an optional
/// free-form context tag used when rendering "unable to meet precondition"
/// messages (`addl_context` in the original implementation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub location: SourceLocation,
    pub expr_source: String,
    pub addl_context: Option<String>,
}

impl Condition {
    pub fn new(location: SourceLocation, expr_source: impl Into<String>) -> Self {
        Self {
            location,
            expr_source: expr_source.into(),
            addl_context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.addl_context = Some(context.into());
        self
    }
}

/// Which arguments a function under analysis is permitted to mutate.
///
/// `All` is the nullable "all-mutable" sentinel described in `spec.md` §3 —
/// the source's `mutable_args: Optional[FrozenSet[str]]` with `None` meaning
/// "every argument may mutate".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutableArgs {
    All,
    Named(BTreeSet<String>),
}

impl MutableArgs {
    pub fn allows(&self, name: &str) -> bool {
        match self {
            MutableArgs::All => true,
            MutableArgs::Named(names) => names.contains(name),
        }
    }
}

/// A normalized semantic type, as the Proxy Factory would see it after
/// resolving type variables (`spec.md` §4.3): generics are kept, free type
/// variables become `Any`, bound type variables reduce to their bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeSchema {
    Any,
    Void,
    Bool,
    Int,
    Float,
    Str,
    List(Box<TypeSchema>),
    /// Fixed-arity tuple.
    Tuple(Vec<TypeSchema>),
    /// `Tuple[T, ...]`.
    UniformTuple(Box<TypeSchema>),
    Set(Box<TypeSchema>),
    Map(Box<TypeSchema>, Box<TypeSchema>),
    Callable {
        params: Vec<TypeSchema>,
        returns: Box<TypeSchema>,
    },
    /// `Type[Bound]`: a symbolic subclass of `Bound`.
    SubclassOf(String),
    /// A user-defined class, looked up by name in the class registry.
    Class(String),
    /// An enumeration type: a name and its constant members in declaration
    /// order (`spec.md` §4.3, "enumerate constants and fork sequentially").
    Enum(String, Vec<String>),
}

/// A single function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub schema: TypeSchema,
    pub has_default: bool,
    /// Whether this is the receiver ("self") position of a method.
    ///
    /// The engine models a method under test as an ordinary `ContractFn`
    /// whose first parameter is the receiver, rather than threading a
    /// separate receiver type through every signature — `spec.md` §4.3
    /// singles the receiver out only to skip subclass selection and (§4.4)
    /// invariant enforcement; both of those are keyed off this flag rather
    /// than off argument position, so a front end is free to put the
    /// receiver wherever its own calling convention puts it.
    pub receiver: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, schema: TypeSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            has_default: false,
            receiver: false,
        }
    }

    /// A receiver ("self") parameter of the given class type.
    pub fn receiver(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: TypeSchema::Class(class_name.into()),
            has_default: false,
            receiver: true,
        }
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

/// Resolved signature of the function under analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<Param>,
    pub returns: TypeSchema,
    /// `*args`, if the signature declares one.
    pub varargs: Option<Param>,
    /// `**kwargs`, if the signature declares one.
    pub kwargs: Option<Param>,
}

impl Signature {
    pub fn new(params: Vec<Param>, returns: TypeSchema) -> Self {
        Self {
            params,
            returns,
            varargs: None,
            kwargs: None,
        }
    }
}

/// A function's full set of conditions: preconditions, postconditions (each
/// analyzed independently — the engine drives one at a time), the declared
/// raise set, the mutable-argument set, and the resolved signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    pub pre: Vec<Condition>,
    pub post: Vec<Condition>,
    /// Exception type names the function is declared to (possibly) raise.
    /// "not-implemented" is always implicitly a member (`spec.md` §4.5).
    pub raises: BTreeSet<String>,
    pub mutable_args: MutableArgs,
    pub signature: Signature,
}

pub const NOT_IMPLEMENTED_MARKER: &str = "not-implemented";

impl Conditions {
    pub fn raises_includes(&self, exception_kind: &str) -> bool {
        exception_kind == NOT_IMPLEMENTED_MARKER || self.raises.contains(exception_kind)
    }

    /// A `Conditions` whose predicates are ready to be evaluated — the
    /// analogue of `Conditions.compilable()` in `spec.md` §6. Since Covenant
    /// never carries uncompiled predicates (contract parsing is an external
    /// collaborator that hands us already-compiled conditions), this is the
    /// identity function; it exists so a future parser integration has a
    /// stable seam to hook into.
    pub fn compilable(self) -> Self {
        self
    }
}

/// Per-method conditions and class invariants for a user-defined type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassConditions {
    pub invariants: Vec<Condition>,
    pub methods: std::collections::BTreeMap<String, Conditions>,
}
