//! Collaborator traits a front end implements (`spec.md` §0, §1 Non-goals:
//! "no contract parser, no source discovery" — those concerns live on the
//! other side of these seams).
//!
//! `covenant-engine` never discovers functions or classes on its own; it is
//! handed implementations of these traits and drives them.

use covenant_core::{ClassConditions, Conditions};

use super::exception_filter::CallError;
use super::patch::PatchManager;
use super::state_space::StateSpace;
use super::value::Value;

/// A single function under analysis, together with its compiled conditions.
///
/// Since parsing contract expressions is out of scope (`spec.md` §1), a
/// `Condition`'s `expr_source` is metadata for reporting only — evaluating
/// the actual predicate against symbolic arguments is the front end's job,
/// done here the same way the function body itself is: as real code
/// operating on `Value` proxies. `eval_preconditions`/`eval_postconditions`
/// return one result per entry in `conditions().pre`/`.post`, aligned by
/// index.
pub trait ContractFn {
    /// Fully-qualified name, used in messages (`spec.md` §3 `function_qualname`).
    fn qualname(&self) -> &str;

    fn conditions(&self) -> &Conditions;

    fn eval_preconditions<'ctx>(
        &self,
        args: &[Value<'ctx>],
        space: &mut StateSpace<'ctx, '_>,
    ) -> Result<Vec<Value<'ctx>>, CallError>;

    /// `args_old` are the arguments as bound at entry (`spec.md` §4.9
    /// `__old__`); `args_new` reflect whatever mutation the call performed.
    fn eval_postconditions<'ctx>(
        &self,
        args_old: &[Value<'ctx>],
        args_new: &[Value<'ctx>],
        result: &Value<'ctx>,
        space: &mut StateSpace<'ctx, '_>,
    ) -> Result<Vec<Value<'ctx>>, CallError>;

    /// Invoke the real function body against symbolic arguments. Argument
    /// order matches `conditions().signature.params` (a method's receiver is
    /// just `params[0]` with `Param::receiver` set — `spec.md` §4.3 treats
    /// "self" as an ordinary bound argument, not a special calling
    /// convention). Returns the arguments as they stand after the call
    /// alongside the result, since a front end may mutate them in place;
    /// `CallDriver` diffs `args` against what it passed in to decide whether
    /// an argument outside `mutable_args` was illegally mutated (`spec.md`
    /// §4.9 step 6). `patches` is the Call Driver's Patch Manager scope
    /// (`spec.md` §4.8 step 3): a body that itself calls other contracted
    /// functions threads it into `ShortCircuitController::maybe_intercept`.
    fn call<'ctx>(
        &self,
        args: Vec<Value<'ctx>>,
        patches: &PatchManager,
        space: &mut StateSpace<'ctx, '_>,
    ) -> Result<(Vec<Value<'ctx>>, Value<'ctx>), CallError>;
}

/// A user-defined class under analysis: its invariants, consulted by the
/// Class Proxy Builder (`spec.md` §4.4). A class's methods are plain
/// `ContractFn`s whose first parameter is the receiver; this trait does not
/// duplicate call dispatch.
pub trait ClassUnderTest {
    fn class_name(&self) -> &str;

    fn conditions(&self) -> &ClassConditions;

    /// Evaluate every class invariant against `instance`, one result per
    /// entry in `conditions().invariants`.
    fn eval_invariants<'ctx>(
        &self,
        instance: &Value<'ctx>,
        space: &mut StateSpace<'ctx, '_>,
    ) -> Result<Vec<Value<'ctx>>, CallError>;
}

/// What the Class Proxy Builder needs to know about the subclass universe
/// (`spec.md` §4.4): which classes extend a given bound, whether a class is
/// final (so only the concrete-with-symbolic-fields strategy applies), and
/// what fields a concrete instance carries.
pub trait SubclassRegistry {
    /// Proper subclasses of `bound`, in a stable, deterministic order (this
    /// order becomes the fork exploration order — `spec.md` §4.3).
    fn subclasses_of(&self, bound: &str) -> Vec<String>;

    fn is_final(&self, class_name: &str) -> bool;

    fn field_schemas(&self, class_name: &str) -> Vec<(String, covenant_core::TypeSchema)>;
}

/// Looks up the `ClassUnderTest` (and therefore the invariants) for a class
/// by name, so the Class Proxy Builder can enforce them right after
/// constructing an instance (`spec.md` §4.4). Separate from
/// `SubclassRegistry` because a front end may know about a class's shape
/// (fields, subtypes) without having compiled its invariants yet, or vice
/// versa.
pub trait ClassLookup {
    fn lookup(&self, class_name: &str) -> Option<&dyn ClassUnderTest>;
}
