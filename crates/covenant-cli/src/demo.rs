//! A handful of contracted functions, compiled by hand, standing in for what
//! a real contract parser/entity-discovery front end would hand the engine.

use covenant_core::{
    Condition, Conditions, MutableArgs, Param, Signature, SourceLocation, TypeSchema,
};
use covenant_engine::{
    CallError, ClassUnderTest, ContractFn, PatchManager, RaisedException, StateSpace,
    SubclassRegistry, Value,
};

fn loc(line: u32) -> SourceLocation {
    SourceLocation::new("demo.rs", line, 0)
}

/// `f(a: bool, b: bool) -> bool: post _ == a; body: a if a else b` — scenario
/// A (`spec.md` §8): refuted, with `a=false, b=true` as the counterexample.
pub struct TernaryBool {
    conditions: Conditions,
}

impl TernaryBool {
    pub fn new() -> Self {
        let signature = Signature::new(
            vec![Param::new("a", TypeSchema::Bool), Param::new("b", TypeSchema::Bool)],
            TypeSchema::Bool,
        );
        Self {
            conditions: Conditions {
                pre: Vec::new(),
                post: vec![Condition::new(loc(10), "_ == a")],
                raises: Default::default(),
                mutable_args: MutableArgs::Named(Default::default()),
                signature,
            },
        }
    }
}

impl ContractFn for TernaryBool {
    fn qualname(&self) -> &str {
        "demo.ternary_bool"
    }

    fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    fn eval_preconditions<'ctx>(
        &self,
        _args: &[Value<'ctx>],
        _space: &mut StateSpace<'ctx, '_>,
    ) -> Result<Vec<Value<'ctx>>, CallError> {
        Ok(Vec::new())
    }

    fn eval_postconditions<'ctx>(
        &self,
        args_old: &[Value<'ctx>],
        _args_new: &[Value<'ctx>],
        result: &Value<'ctx>,
        _space: &mut StateSpace<'ctx, '_>,
    ) -> Result<Vec<Value<'ctx>>, CallError> {
        let (Value::Bool(a), Value::Bool(r)) = (&args_old[0], result) else {
            return Ok(vec![Value::Void]);
        };
        Ok(vec![Value::Bool(r._eq(a))])
    }

    fn call<'ctx>(
        &self,
        args: Vec<Value<'ctx>>,
        _patches: &PatchManager,
        _space: &mut StateSpace<'ctx, '_>,
    ) -> Result<(Vec<Value<'ctx>>, Value<'ctx>), CallError> {
        let (Value::Bool(a), Value::Bool(b)) = (&args[0], &args[1]) else {
            return Err(CallError::Raised(RaisedException::new(
                "TypeError",
                "ternary_bool expects two bools",
            )));
        };
        let result = Value::Bool(a.ite(a, b));
        Ok((args, result))
    }
}

/// `f(a: int) -> int: post _ == a; body: a` — a trivially confirmed identity,
/// exercised alongside [`TernaryBool`] so a passing and a failing demo both
/// run by default.
pub struct IntIdentity {
    conditions: Conditions,
}

impl IntIdentity {
    pub fn new() -> Self {
        let signature = Signature::new(vec![Param::new("a", TypeSchema::Int)], TypeSchema::Int);
        Self {
            conditions: Conditions {
                pre: Vec::new(),
                post: vec![Condition::new(loc(20), "_ == a")],
                raises: Default::default(),
                mutable_args: MutableArgs::Named(Default::default()),
                signature,
            },
        }
    }
}

impl ContractFn for IntIdentity {
    fn qualname(&self) -> &str {
        "demo.int_identity"
    }

    fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    fn eval_preconditions<'ctx>(
        &self,
        _args: &[Value<'ctx>],
        _space: &mut StateSpace<'ctx, '_>,
    ) -> Result<Vec<Value<'ctx>>, CallError> {
        Ok(Vec::new())
    }

    fn eval_postconditions<'ctx>(
        &self,
        args_old: &[Value<'ctx>],
        _args_new: &[Value<'ctx>],
        result: &Value<'ctx>,
        _space: &mut StateSpace<'ctx, '_>,
    ) -> Result<Vec<Value<'ctx>>, CallError> {
        let (Value::Int(a), Value::Int(r)) = (&args_old[0], result) else {
            return Ok(vec![Value::Void]);
        };
        Ok(vec![Value::Bool(r._eq(a))])
    }

    fn call<'ctx>(
        &self,
        args: Vec<Value<'ctx>>,
        _patches: &PatchManager,
        _space: &mut StateSpace<'ctx, '_>,
    ) -> Result<(Vec<Value<'ctx>>, Value<'ctx>), CallError> {
        let result = args[0].clone();
        Ok((args, result))
    }
}

/// No user-defined classes in this demo set.
pub struct NoClasses;

impl SubclassRegistry for NoClasses {
    fn subclasses_of(&self, _bound: &str) -> Vec<String> {
        Vec::new()
    }

    fn is_final(&self, _class_name: &str) -> bool {
        true
    }

    fn field_schemas(&self, _class_name: &str) -> Vec<(String, TypeSchema)> {
        Vec::new()
    }
}

impl covenant_engine::ClassLookup for NoClasses {
    fn lookup(&self, _class_name: &str) -> Option<&dyn ClassUnderTest> {
        None
    }
}

pub fn all() -> Vec<Box<dyn ContractFn>> {
    vec![Box::new(TernaryBool::new()), Box::new(IntIdentity::new())]
}
