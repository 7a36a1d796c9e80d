//! `SymbolicValue`: the tagged-variant stand-in for the original's dynamic
//! proxy dispatch (`spec.md` "Design Notes" — the original relies on Python
//! subclassing a real type at runtime; Rust has no such trick, so every
//! symbolic shape is a variant of one enum and behavior is dispatched by
//! `match` instead of by vtable).

use std::collections::BTreeMap;
use std::fmt;

use covenant_core::{HeapRef, TypeSchema};

use super::state_space::{EngineSignal, StateSpace};

/// Maximum length the Proxy Factory will ever generate for an open-ended
/// container before the search tree is considered to have covered "enough"
/// of it; exploration still proceeds depth-first (shortest first), so this
/// only bounds pathological unbounded growth, not typical counterexamples.
pub const MAX_CONTAINER_LEN: usize = 6;
/// Maximum length for bounded string proxies, in characters.
pub const MAX_STRING_LEN: usize = 8;

/// One symbolic value of any shape the Proxy Factory knows how to build.
#[derive(Clone)]
pub enum Value<'ctx> {
    Bool(z3::ast::Bool<'ctx>),
    Int(z3::ast::Int<'ctx>),
    Float(z3::ast::Real<'ctx>),
    Str(StrValue<'ctx>),
    List(Vec<Value<'ctx>>),
    Tuple(Vec<Value<'ctx>>),
    Set(Vec<Value<'ctx>>),
    Map(Vec<(Value<'ctx>, Value<'ctx>)>),
    /// A callable proxy: invoking it just produces a fresh symbolic result of
    /// the declared return type (`spec.md` §4.3 "Proxy Value" — callable
    /// bodies are never themselves explored).
    Callable(Box<TypeSchema>),
    /// A symbolic subclass selection, e.g. from `Type[Base]`.
    Type(String),
    Class(ClassInstance<'ctx>),
    /// A chosen enumeration constant, picked deterministically by the Proxy
    /// Factory (`spec.md` §4.3).
    Enum { type_name: String, variant: String },
    Void,
}

/// Bounded string proxy: a concrete length (already resolved via forks) and
/// one symbolic integer per character slot, interpreted as a Unicode scalar
/// value. Keeping strings as bounded integer arrays avoids relying on `z3`'s
/// sequence/string theory surface (`spec.md` Non-goals leave the solver's
/// own capabilities unspecified; this keeps Covenant within the small,
/// confidently-known part of the API).
#[derive(Clone)]
pub struct StrValue<'ctx> {
    pub chars: Vec<z3::ast::Int<'ctx>>,
}

/// A class proxy: either a concrete instance with symbolic field values, or
/// an opaque instance of an unconstrained subclass identified only by a heap
/// reference (`spec.md` §4.4, "Class Proxy Builder").
#[derive(Clone)]
pub enum ClassInstance<'ctx> {
    ConcreteWithFields {
        class_name: String,
        fields: BTreeMap<String, Value<'ctx>>,
    },
    Opaque {
        class_name: String,
        marker: HeapRef,
    },
}

/// A fully concrete rendering of a `Value`, used for human-readable
/// counterexamples (`spec.md` §4.10, `get_input_description`).
#[derive(Debug, Clone, PartialEq)]
pub enum RealizedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<RealizedValue>),
    Tuple(Vec<RealizedValue>),
    Set(Vec<RealizedValue>),
    Map(Vec<(RealizedValue, RealizedValue)>),
    Callable(String),
    Type(String),
    Class {
        name: String,
        fields: Vec<(String, RealizedValue)>,
    },
    Enum { type_name: String, variant: String },
    Void,
    /// The model had no binding, or evaluation failed; rendered literally so
    /// the Message Aggregator's `priority_key` can demote these messages
    /// (`spec.md` §4.10: "prefer those whose rendering succeeded").
    Unrepresentable,
}

impl fmt::Display for RealizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RealizedValue::Bool(b) => write!(f, "{b}"),
            RealizedValue::Int(i) => write!(f, "{i}"),
            RealizedValue::Float(x) => write!(f, "{x}"),
            RealizedValue::Str(s) => write!(f, "{s:?}"),
            RealizedValue::List(items) => write_seq(f, "[", items, "]"),
            RealizedValue::Tuple(items) => write_seq(f, "(", items, ")"),
            RealizedValue::Set(items) => write_seq(f, "{", items, "}"),
            RealizedValue::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            RealizedValue::Callable(name) => write!(f, "<function {name}>"),
            RealizedValue::Type(name) => write!(f, "<class {name}>"),
            RealizedValue::Class { name, fields } => {
                write!(f, "{name}(")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                write!(f, ")")
            }
            RealizedValue::Enum { type_name, variant } => write!(f, "{type_name}.{variant}"),
            RealizedValue::Void => write!(f, "None"),
            RealizedValue::Unrepresentable => write!(f, "<unable to repr>"),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[RealizedValue], close: &str) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "{close}")
}

/// Capability: can this value fork the search tree to decide its own truth
/// value (`spec.md` "Design Notes", `CanFork`)?
pub trait CanFork<'ctx> {
    fn truthy(&self, space: &mut StateSpace<'ctx, '_>) -> Result<bool, EngineSignal>;
}

impl<'ctx> CanFork<'ctx> for Value<'ctx> {
    fn truthy(&self, space: &mut StateSpace<'ctx, '_>) -> Result<bool, EngineSignal> {
        match self {
            Value::Bool(b) => space.fork_bool(b),
            Value::Int(i) => {
                let pred = int_distinct_zero(space, i);
                space.fork_bool(&pred)
            }
            Value::Float(r) => {
                let zero = z3::ast::Real::from_real(space.solver().context(), 0, 1);
                let pred = r._eq(&zero).not();
                space.fork_bool(&pred)
            }
            Value::Str(s) => Ok(!s.chars.is_empty()),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(!items.is_empty()),
            Value::Map(pairs) => Ok(!pairs.is_empty()),
            Value::Void => Ok(false),
            Value::Callable(_) | Value::Type(_) | Value::Class(_) | Value::Enum { .. } => Ok(true),
        }
    }
}

fn int_distinct_zero<'ctx>(space: &StateSpace<'ctx, '_>, i: &z3::ast::Int<'ctx>) -> z3::ast::Bool<'ctx> {
    let zero = z3::ast::Int::from_i64(space.solver().context(), 0);
    i._eq(&zero).not()
}

/// Capability: realize a value against a solved model (`CanRealize`).
pub trait CanRealize {
    fn realize(&self, space: &StateSpace<'_, '_>) -> RealizedValue;
}

impl<'ctx> CanRealize for Value<'ctx> {
    fn realize(&self, space: &StateSpace<'_, '_>) -> RealizedValue {
        match self {
            Value::Bool(b) => space
                .model_bool(b)
                .map(RealizedValue::Bool)
                .unwrap_or(RealizedValue::Unrepresentable),
            Value::Int(i) => space
                .model_int(i)
                .map(RealizedValue::Int)
                .unwrap_or(RealizedValue::Unrepresentable),
            Value::Float(r) => space
                .model_real_f64(r)
                .map(RealizedValue::Float)
                .unwrap_or(RealizedValue::Unrepresentable),
            Value::Str(s) => {
                let mut out = String::new();
                for code in &s.chars {
                    match space.model_int(code).ok().and_then(|n| {
                        u32::try_from(n).ok().and_then(char::from_u32)
                    }) {
                        Some(c) => out.push(c),
                        None => return RealizedValue::Unrepresentable,
                    }
                }
                RealizedValue::Str(out)
            }
            Value::List(items) => RealizedValue::List(items.iter().map(|v| v.realize(space)).collect()),
            Value::Tuple(items) => RealizedValue::Tuple(items.iter().map(|v| v.realize(space)).collect()),
            Value::Set(items) => RealizedValue::Set(items.iter().map(|v| v.realize(space)).collect()),
            Value::Map(pairs) => RealizedValue::Map(
                pairs
                    .iter()
                    .map(|(k, v)| (k.realize(space), v.realize(space)))
                    .collect(),
            ),
            Value::Callable(schema) => RealizedValue::Callable(type_name_of_schema(schema)),
            Value::Type(name) => RealizedValue::Type(name.clone()),
            Value::Class(instance) => match instance {
                ClassInstance::ConcreteWithFields { class_name, fields } => RealizedValue::Class {
                    name: class_name.clone(),
                    fields: fields
                        .iter()
                        .map(|(k, v)| (k.clone(), v.realize(space)))
                        .collect(),
                },
                ClassInstance::Opaque { class_name, marker } => RealizedValue::Class {
                    name: class_name.clone(),
                    fields: vec![("__id__".to_string(), RealizedValue::Int(marker.as_u64() as i64))],
                },
            },
            Value::Enum { type_name, variant } => RealizedValue::Enum {
                type_name: type_name.clone(),
                variant: variant.clone(),
            },
            Value::Void => RealizedValue::Void,
        }
    }
}

fn type_name_of_schema(schema: &TypeSchema) -> String {
    match schema {
        TypeSchema::Callable { .. } => "<lambda>".to_string(),
        other => format!("{other:?}"),
    }
}

/// Capability: replace a value's contents with fresh symbolic data of the
/// same declared shape (`CanForget`; `spec.md` §4.7, `forget_contents` /
/// `__ch_forget_contents__`). Rust values have no shared mutable aliasing to
/// preserve across the replacement, so this is a wholesale regenerate via
/// the Proxy Factory rather than an in-place field-by-field reset.
pub trait CanForget<'ctx> {
    fn forget_contents(
        &mut self,
        schema: &TypeSchema,
        factory: &mut super::proxy::ProxyFactory<'_, '_>,
        name_hint: &str,
        space: &mut StateSpace<'ctx, '_>,
    ) -> Result<(), EngineSignal>;
}

impl<'ctx> CanForget<'ctx> for Value<'ctx> {
    fn forget_contents(
        &mut self,
        schema: &TypeSchema,
        factory: &mut super::proxy::ProxyFactory<'_, '_>,
        name_hint: &str,
        space: &mut StateSpace<'ctx, '_>,
    ) -> Result<(), EngineSignal> {
        *self = factory.proxy_for_type(schema, name_hint, space)?;
        Ok(())
    }
}

/// Capability: report the Python-ish type name of a value (`HasPyType`).
pub trait HasPyType {
    fn type_name(&self) -> String;
}

impl<'ctx> HasPyType for Value<'ctx> {
    fn type_name(&self) -> String {
        match self {
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::Set(_) => "set".to_string(),
            Value::Map(_) => "dict".to_string(),
            Value::Callable(_) => "function".to_string(),
            Value::Type(_) => "type".to_string(),
            Value::Class(ClassInstance::ConcreteWithFields { class_name, .. })
            | Value::Class(ClassInstance::Opaque { class_name, .. }) => class_name.clone(),
            Value::Enum { type_name, .. } => type_name.clone(),
            Value::Void => "NoneType".to_string(),
        }
    }
}
