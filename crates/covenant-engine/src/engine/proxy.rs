//! Proxy Registry & Factory (`spec.md` §4.3): turns a `TypeSchema` into a
//! fresh symbolic `Value`, forking the search tree at every open-ended
//! decision (container length, enum/subclass choice).

use std::collections::BTreeMap;

use covenant_core::{HeapRef, TypeSchema};

use super::class_proxy::ClassRegistry;
use super::exception_filter::CallError;
use super::state_space::{EngineSignal, StateSpace};
use super::value::{CanFork, ClassInstance, StrValue, Value, MAX_CONTAINER_LEN, MAX_STRING_LEN};

/// Builds fresh proxies for a `TypeSchema`, consulting a [`ClassRegistry`]
/// for user-defined classes and a heap counter for opaque instance markers.
pub struct ProxyFactory<'a, 'b> {
    classes: &'a ClassRegistry<'b>,
    next_heap_id: u64,
}

impl<'a, 'b> ProxyFactory<'a, 'b> {
    pub fn new(classes: &'a ClassRegistry<'b>) -> Self {
        Self {
            classes,
            next_heap_id: 0,
        }
    }

    fn fresh_heap_ref(&mut self) -> HeapRef {
        let id = self.next_heap_id;
        self.next_heap_id += 1;
        HeapRef::new(id)
    }

    /// Build a fresh symbolic value matching `schema`, forking the tree as
    /// needed. `name_hint` seeds the solver's fresh-symbol names so
    /// counterexamples read naturally (e.g. `xs[2]` rather than `v$17`).
    pub fn proxy_for_type<'ctx>(
        &mut self,
        schema: &TypeSchema,
        name_hint: &str,
        space: &mut StateSpace<'ctx, '_>,
    ) -> Result<Value<'ctx>, EngineSignal> {
        match schema {
            TypeSchema::Any | TypeSchema::Void => Ok(Value::Void),
            TypeSchema::Bool => {
                let term = space.solver().fresh_bool(name_hint);
                Ok(Value::Bool(term))
            }
            TypeSchema::Int => {
                let term = space.solver().fresh_int(name_hint);
                Ok(Value::Int(term))
            }
            TypeSchema::Float => {
                let term = space.solver().fresh_real(name_hint);
                Ok(Value::Float(term))
            }
            TypeSchema::Str => {
                let len = self.proxy_len(space, MAX_STRING_LEN)?;
                let mut chars = Vec::with_capacity(len);
                for i in 0..len {
                    chars.push(space.solver().fresh_int(&format!("{name_hint}[{i}]")));
                }
                Ok(Value::Str(StrValue { chars }))
            }
            TypeSchema::List(elem) => {
                let items = self.proxy_open_sequence(elem, name_hint, space)?;
                Ok(Value::List(items))
            }
            TypeSchema::UniformTuple(elem) => {
                let items = self.proxy_open_sequence(elem, name_hint, space)?;
                Ok(Value::Tuple(items))
            }
            TypeSchema::Tuple(elems) => {
                let mut items = Vec::with_capacity(elems.len());
                for (i, elem) in elems.iter().enumerate() {
                    items.push(self.proxy_for_type(elem, &format!("{name_hint}.{i}"), space)?);
                }
                Ok(Value::Tuple(items))
            }
            TypeSchema::Set(elem) => {
                let items = self.proxy_open_sequence(elem, name_hint, space)?;
                Ok(Value::Set(items))
            }
            TypeSchema::Map(key, value) => {
                let mut pairs = Vec::new();
                loop {
                    if pairs.len() >= MAX_CONTAINER_LEN || !space.fork()? {
                        break;
                    }
                    let k = self.proxy_for_type(key, &format!("{name_hint}.k{}", pairs.len()), space)?;
                    let v = self.proxy_for_type(value, &format!("{name_hint}.v{}", pairs.len()), space)?;
                    pairs.push((k, v));
                }
                Ok(Value::Map(pairs))
            }
            TypeSchema::Callable { returns, params } => Ok(Value::Callable(Box::new(TypeSchema::Callable {
                params: params.clone(),
                returns: returns.clone(),
            }))),
            TypeSchema::SubclassOf(bound) => {
                let chosen = self.choose_subclass(bound, space)?;
                Ok(Value::Type(chosen))
            }
            TypeSchema::Class(name) => self.proxy_for_class(name, name_hint, space, false),
            TypeSchema::Enum(type_name, variants) => {
                let variant = self.choose_enum_variant(variants, space)?;
                Ok(Value::Enum {
                    type_name: type_name.clone(),
                    variant,
                })
            }
        }
    }

    /// Build a symbolic receiver ("self") for a method under analysis.
    /// Unlike [`Self::proxy_for_type`], this never enforces the class's own
    /// invariants on the result: `spec.md` §4.4 suppresses that check only
    /// for the receiver, "because the point of analysis is to surface
    /// invariant violations on the receiver" rather than discard paths where
    /// one happens to not hold yet.
    pub fn proxy_for_receiver<'ctx>(
        &mut self,
        class_name: &str,
        name_hint: &str,
        space: &mut StateSpace<'ctx, '_>,
    ) -> Result<Value<'ctx>, EngineSignal> {
        self.proxy_for_class(class_name, name_hint, space, true)
    }

    /// Open-ended sequence proxy: repeatedly fork "is there another
    /// element?" (false tried first, so the empty/shortest sequence is
    /// explored first — `spec.md` §4.3).
    fn proxy_open_sequence<'ctx>(
        &mut self,
        elem: &TypeSchema,
        name_hint: &str,
        space: &mut StateSpace<'ctx, '_>,
    ) -> Result<Vec<Value<'ctx>>, EngineSignal> {
        let mut items = Vec::new();
        loop {
            if items.len() >= MAX_CONTAINER_LEN || !space.fork()? {
                break;
            }
            let item = self.proxy_for_type(elem, &format!("{name_hint}[{}]", items.len()), space)?;
            items.push(item);
        }
        Ok(items)
    }

    fn proxy_len(&mut self, space: &mut StateSpace<'_, '_>, max: usize) -> Result<usize, EngineSignal> {
        let mut len = 0;
        while len < max && space.fork()? {
            len += 1;
        }
        Ok(len)
    }

    /// Choose a subclass of `bound`: the bound itself is tried first (false
    /// branch), then each registered proper subtype in turn (`spec.md` §4.3
    /// "enumerate constants and fork sequentially"). `fork()` returning
    /// `false` means "stop here" — the same "don't go further" reading that
    /// makes an open-ended sequence proxy stop at length zero first.
    fn choose_subclass(&mut self, bound: &str, space: &mut StateSpace<'_, '_>) -> Result<String, EngineSignal> {
        let mut candidates = vec![bound.to_string()];
        candidates.extend(self.classes.subclasses_of(bound));
        Self::choose_sequentially(&candidates, space)
    }

    /// Choose one of `variants` in declaration order, stopping at the first
    /// whose "go further?" fork comes back false (`spec.md` §4.3: "enumerate
    /// constants and fork sequentially, selecting the first whose branch is
    /// taken; this is finite and deterministic").
    fn choose_enum_variant(&mut self, variants: &[String], space: &mut StateSpace<'_, '_>) -> Result<String, EngineSignal> {
        Self::choose_sequentially(variants, space)
    }

    fn choose_sequentially(candidates: &[String], space: &mut StateSpace<'_, '_>) -> Result<String, EngineSignal> {
        if candidates.is_empty() {
            return Ok(String::new());
        }
        for candidate in &candidates[..candidates.len() - 1] {
            if !space.fork()? {
                return Ok(candidate.clone());
            }
        }
        Ok(candidates.last().expect("checked non-empty above").clone())
    }

    /// Class Proxy Builder (`spec.md` §4.4): for an ordinary parameter
    /// position, first `choose_subclass`s through the registered subtype
    /// universe (`spec.md` §4.3, "subclass-permitted positions … fork
    /// through descendants", mirroring `core.py`'s `choose_type` called from
    /// `proxy_for_type` before an instance is built — `gen_args` proxies
    /// every parameter with `allow_subtypes=True`). The receiver position
    /// never picks a subtype (`spec.md` §4.3 "For the receiver position:
    /// do not pick a subtype"). Once the concrete class to build is settled,
    /// forks once more between a concrete instance with symbolic fields and
    /// an opaque instance of an unconstrained further subclass, then
    /// enforces that class's invariants unless `is_receiver`.
    fn proxy_for_class<'ctx>(
        &mut self,
        class_name: &str,
        name_hint: &str,
        space: &mut StateSpace<'ctx, '_>,
        is_receiver: bool,
    ) -> Result<Value<'ctx>, EngineSignal> {
        let target_class = if is_receiver {
            class_name.to_string()
        } else {
            self.choose_subclass(class_name, space)?
        };
        let instance = if self.classes.is_final(&target_class) || !space.fork()? {
            let field_schemas = self.classes.field_schemas(&target_class);
            let mut fields = BTreeMap::new();
            for (field_name, schema) in field_schemas {
                let v = self.proxy_for_type(&schema, &format!("{name_hint}.{field_name}"), space)?;
                fields.insert(field_name, v);
            }
            Value::Class(ClassInstance::ConcreteWithFields {
                class_name: target_class.clone(),
                fields,
            })
        } else {
            Value::Class(ClassInstance::Opaque {
                class_name: target_class.clone(),
                marker: self.fresh_heap_ref(),
            })
        };
        if !is_receiver {
            self.enforce_invariants(&target_class, &instance, space)?;
        }
        Ok(instance)
    }

    /// Evaluate every invariant `class_name` declares against `instance`,
    /// discarding the path (`EngineSignal::IgnoreAttempt`) if one is false
    /// or raises (`spec.md` §4.4). A class with no compiled invariants (or
    /// no `ClassLookup` supplied at all) trivially passes.
    fn enforce_invariants<'ctx>(
        &self,
        class_name: &str,
        instance: &Value<'ctx>,
        space: &mut StateSpace<'ctx, '_>,
    ) -> Result<(), EngineSignal> {
        let Some(class) = self.classes.lookup(class_name) else {
            return Ok(());
        };
        let results = match class.eval_invariants(instance, space) {
            Ok(results) => results,
            Err(CallError::Signal(signal)) => return Err(signal),
            Err(CallError::Raised(_)) => return Err(EngineSignal::IgnoreAttempt),
        };
        for term in &results {
            if !term.truthy(space)? {
                return Err(EngineSignal::IgnoreAttempt);
            }
        }
        Ok(())
    }
}
