//! Call Driver (`spec.md` §4.8) and the per-call protocol it repeats once per
//! iteration, `attempt_call` (`spec.md` §4.9).
//!
//! `attempt_call` returns `Result<CallAnalysis, EngineSignal>` rather than
//! the four-way `PathOutcome` sum type `spec.md`'s Design Notes sketch:
//! `EngineSignal`'s own variants (`UnexploredPath`, `IgnoreAttempt`,
//! `UncaughtException`) already are that enum's non-`Completed` cases, so a
//! `Result` says the same thing with one type instead of two.

use std::time::Instant;

use covenant_core::{
    AnalysisMessage, CallAnalysis, CallTreeAnalysis, Condition, MessageKind, Options,
    SourceLocation, VerificationStatus,
};

use super::class_proxy::ClassRegistry;
use super::contracts::ContractFn;
use super::deep_eq::deep_eq;
use super::exception_filter::{CallError, ExceptionDisposition, ExceptionFilter, RaisedException};
use super::message_aggregator::MessageAggregator;
use super::patch::PatchManager;
use super::proxy::ProxyFactory;
use super::state_space::{bubble, EngineSignal, StateSpace};
use super::tracer::{NoopTracer, Tracer};
use super::value::{CanFork, CanRealize, RealizedValue, StrValue, Value, MAX_CONTAINER_LEN};

/// Drives the search for a single `ContractFn` (or a method modeled as one,
/// `Param::receiver`) against a class registry, producing one
/// `CallTreeAnalysis` per declared postcondition.
pub struct CallDriver<'a> {
    classes: ClassRegistry<'a>,
}

impl<'a> CallDriver<'a> {
    pub fn new(classes: ClassRegistry<'a>) -> Self {
        Self { classes }
    }

    /// Verify every postcondition `func` declares, with no tracing.
    pub fn verify(&self, func: &dyn ContractFn, options: &Options) -> Vec<CallTreeAnalysis> {
        self.verify_with(func, options, &mut NoopTracer)
    }

    pub fn verify_with<T: Tracer>(
        &self,
        func: &dyn ContractFn,
        options: &Options,
        tracer: &mut T,
    ) -> Vec<CallTreeAnalysis> {
        let patches = PatchManager::new();
        // Held for the whole run, across every postcondition: recursive
        // calls back into `func` from inside its own body must not be
        // short-circuit-substituted as if it were some other nested callee
        // (`spec.md` §4.8 step 3).
        let _self_guard = patches.enter(func.qualname());
        let conditions = func.conditions();
        (0..conditions.post.len())
            .map(|post_index| self.verify_postcondition(func, post_index, options, &patches, tracer))
            .collect()
    }

    fn verify_postcondition<T: Tracer>(
        &self,
        func: &dyn ContractFn,
        post_index: usize,
        options: &Options,
        patches: &PatchManager,
        tracer: &mut T,
    ) -> CallTreeAnalysis {
        let conditions = func.conditions();
        let condition_deadline = Instant::now() + options.per_condition_timeout();
        let mut tree = super::search_tree::SearchTree::new();
        let mut aggregator = MessageAggregator::new();
        let mut num_confirmed_paths: u32 = 0;
        let mut deepest_precondition: Option<Condition> = None;
        let mut deepest_precondition_reason: Option<String> = None;
        let mut iteration: u32 = 0;

        while Instant::now() < condition_deadline {
            if tree.is_exhausted() {
                break;
            }
            iteration += 1;
            tracer.trace_iteration_start(iteration);

            let ctx = covenant_solver::new_context();
            let path_deadline = Instant::now() + options.per_path_timeout();
            let check_timeout = options.per_path_timeout() / 2;
            let mut space = StateSpace::new(&ctx, &mut tree, path_deadline, check_timeout);

            let outcome = attempt_call(func, post_index, &self.classes, patches, &mut space);

            let status = match outcome {
                Ok(analysis) => {
                    if let Some(condition) = &analysis.failing_precondition {
                        update_deepest_precondition(
                            &mut deepest_precondition,
                            &mut deepest_precondition_reason,
                            condition,
                            &analysis.failing_precondition_reason,
                        );
                    }
                    if analysis.verification_status == Some(VerificationStatus::Confirmed) {
                        num_confirmed_paths += 1;
                    }
                    aggregator.extend(analysis.messages);
                    analysis.verification_status
                }
                Err(EngineSignal::UnexploredPath) => {
                    if space.confirm_bias() {
                        num_confirmed_paths += 1;
                        Some(VerificationStatus::Confirmed)
                    } else {
                        Some(VerificationStatus::Unknown)
                    }
                }
                Err(EngineSignal::IgnoreAttempt) => None,
                Err(EngineSignal::UncaughtException(_)) => Some(VerificationStatus::Unknown),
            };

            let path = space.path().to_vec();
            tracer.trace_iteration_end(iteration, status);
            drop(space);
            bubble(&mut tree, &path, status);

            if status == Some(VerificationStatus::Refuted) {
                break;
            }
        }

        let post_condition = &conditions.post[post_index];
        let verdict = match tree.status() {
            Some(VerificationStatus::Refuted) => VerificationStatus::Refuted,
            Some(VerificationStatus::Confirmed) => {
                if options.report_all {
                    aggregator.push(
                        AnalysisMessage::new(
                            MessageKind::Confirmed,
                            "confirmed over all paths",
                            post_condition.location.clone(),
                        )
                        .with_function(func.qualname())
                        .with_condition_source(post_condition.expr_source.clone()),
                    );
                }
                VerificationStatus::Confirmed
            }
            // `spec.md`'s "precondition diagnostics are prioritized" rule:
            // a run that never escaped the preconditions reports that,
            // instead of a bare "not confirmed", even if some iteration
            // separately came back unknown.
            None | Some(VerificationStatus::Unknown) => {
                if let Some(condition) = &deepest_precondition {
                    let reason_suffix = deepest_precondition_reason
                        .as_ref()
                        .map(|r| format!(": {r}"))
                        .unwrap_or_default();
                    aggregator.push(
                        AnalysisMessage::new(
                            MessageKind::PreconditionUnsatisfiable,
                            format!("unable to meet precondition{reason_suffix}"),
                            condition.location.clone(),
                        )
                        .with_function(func.qualname())
                        .with_condition_source(condition.expr_source.clone()),
                    );
                } else {
                    aggregator.push(
                        AnalysisMessage::new(
                            MessageKind::CannotConfirm,
                            "not confirmed",
                            post_condition.location.clone(),
                        )
                        .with_function(func.qualname())
                        .with_condition_source(post_condition.expr_source.clone()),
                    );
                }
                VerificationStatus::Unknown
            }
        };

        tracer.trace_verify_end(verdict, iteration);
        CallTreeAnalysis {
            messages: aggregator.into_messages(),
            verification_status: verdict,
            num_confirmed_paths,
        }
    }
}

/// `spec.md` §2 (supplemented from `crosshair/core.py`): replace the tracked
/// failing precondition only on a strictly greater source line; on a tied
/// line, stick a newly-available reason onto the existing entry rather than
/// overwriting it.
fn update_deepest_precondition(
    tracked: &mut Option<Condition>,
    tracked_reason: &mut Option<String>,
    candidate: &Condition,
    candidate_reason: &Option<String>,
) {
    match tracked {
        None => {
            *tracked = Some(candidate.clone());
            *tracked_reason = candidate_reason.clone();
        }
        Some(existing) => {
            if candidate.location.line > existing.location.line {
                *tracked = Some(candidate.clone());
                *tracked_reason = candidate_reason.clone();
            } else if candidate.location.line == existing.location.line
                && tracked_reason.is_none()
                && candidate_reason.is_some()
            {
                *tracked_reason = candidate_reason.clone();
            }
        }
    }
}

/// One full attempt at calling `func`, checked against the postcondition at
/// `post_index` (`spec.md` §4.9).
pub fn attempt_call<'ctx>(
    func: &dyn ContractFn,
    post_index: usize,
    classes: &ClassRegistry<'_>,
    patches: &PatchManager,
    space: &mut StateSpace<'ctx, '_>,
) -> Result<CallAnalysis, EngineSignal> {
    let conditions = func.conditions();
    let mut factory = ProxyFactory::new(classes);

    // 1. Symbolic arguments from the signature, including *args/**kwargs.
    let mut args = Vec::with_capacity(conditions.signature.params.len());
    for param in &conditions.signature.params {
        let hint = format!("{}.{}", func.qualname(), param.name);
        let value = if param.receiver {
            if let covenant_core::TypeSchema::Class(class_name) = &param.schema {
                factory.proxy_for_receiver(class_name, &hint, space)?
            } else {
                factory.proxy_for_type(&param.schema, &hint, space)?
            }
        } else {
            factory.proxy_for_type(&param.schema, &hint, space)?
        };
        args.push(value);
    }
    if let Some(varargs) = &conditions.signature.varargs {
        let hint = format!("{}.{}", func.qualname(), varargs.name);
        let list_schema = covenant_core::TypeSchema::List(Box::new(varargs.schema.clone()));
        args.push(factory.proxy_for_type(&list_schema, &hint, space)?);
    }
    if let Some(kwargs) = &conditions.signature.kwargs {
        args.push(proxy_kwargs(&mut factory, kwargs, func.qualname(), space)?);
    }
    let param_names: Vec<String> = conditions
        .signature
        .params
        .iter()
        .map(|p| p.name.clone())
        .chain(conditions.signature.varargs.iter().map(|p| p.name.clone()))
        .chain(conditions.signature.kwargs.iter().map(|p| p.name.clone()))
        .collect();

    // 2. Snapshot pre-call state inside framework scope; checkpoint solver.
    let args_old = space.with_framework_code(|_| args.clone());
    space.checkpoint();

    // 3. Evaluate preconditions (assumed, not forked) under the Exception
    //    Filter's always-ignore rule for precondition-time exceptions.
    let pre_terms = match func.eval_preconditions(&args, space) {
        Ok(terms) => terms,
        Err(CallError::Signal(signal)) => return Err(signal),
        Err(CallError::Raised(_)) => return Ok(CallAnalysis::ignored()),
    };
    // Assert preconditions one at a time, in declaration order, rather than
    // all at once: if the accumulated assumption goes `Unsat`, the
    // precondition whose assertion actually caused that is the one named,
    // not simply whichever happens to sit on the highest source line
    // (`spec.md` §8 property 7).
    for (condition, term) in conditions.pre.iter().zip(pre_terms.iter()) {
        let Value::Bool(b) = term else { continue };
        space.assert_bool(b);
        if matches!(space.check(), covenant_solver::CheckResult::Unsat) {
            return Ok(CallAnalysis::failing_precondition(condition.clone(), None));
        }
    }

    // 4. Invoke the function body, with enforced conditions (the front end's
    //    own `call` routes nested contracted callees through the
    //    Short-Circuit Controller) and the Patch Manager scope already
    //    active via the caller's guard.
    let (args_new, result) = match func.call(args.clone(), patches, space) {
        Ok(pair) => pair,
        Err(CallError::Signal(signal)) => return Err(signal),
        Err(CallError::Raised(exc)) => {
            return Ok(classify_raised(func, &exc, &args, None, space));
        }
    };

    // 6. Mutation check: every argument the callee does not declare mutable
    //    must compare equal, pre- and post-call.
    for (i, name) in param_names.iter().enumerate() {
        if conditions.mutable_args.allows(name) {
            continue;
        }
        let Some(before) = args_old.get(i) else { continue };
        let Some(after) = args_new.get(i) else { continue };
        let before_realized = before.realize(space);
        let after_realized = after.realize(space);
        if !deep_eq(&before_realized, &after_realized) {
            let location = conditions
                .post
                .get(post_index)
                .map(|c| c.location.clone())
                .unwrap_or_else(|| fallback_location(conditions));
            let message = AnalysisMessage::new(
                MessageKind::PostconditionError,
                format!(
                    "Argument {name} of {} changed from {before_realized} to {after_realized}",
                    func.qualname()
                ),
                location,
            )
            .with_function(func.qualname());
            return Ok(CallAnalysis::refuted(vec![message]));
        }
    }

    // 7. Evaluate the single postcondition bound for this call.
    let post_terms = match func.eval_postconditions(&args_old, &args_new, &result, space) {
        Ok(terms) => terms,
        Err(CallError::Signal(signal)) => return Err(signal),
        Err(CallError::Raised(exc)) => {
            return Ok(classify_raised(func, &exc, &args_new, Some(&result), space));
        }
    };
    let post_condition = &conditions.post[post_index];
    let Some(post_value @ Value::Bool(_)) = post_terms.get(post_index) else {
        // A postcondition that did not produce a boolean term cannot be
        // judged; treat it the same as an unknown outcome for this path.
        return Ok(CallAnalysis::status(VerificationStatus::Unknown, Vec::new()));
    };
    // Evaluated the same way any other boolean proxy is: a fork, with the
    // false branch explored first, so a reachable counterexample surfaces
    // before the search ever reports confirmed (`spec.md` §4.2, §4.9 step 7).
    if !post_value.truthy(space)? {
        let description = describe_input(&param_names, &args_new, Some(&result), space);
        let message = AnalysisMessage::new(
            MessageKind::PostconditionFail,
            format!("failed {} {description}", post_condition.expr_source),
            post_condition.location.clone(),
        )
        .with_function(func.qualname())
        .with_condition_source(post_condition.expr_source.clone());
        return Ok(CallAnalysis::refuted(vec![message]));
    }
    Ok(CallAnalysis::confirmed())
}

fn classify_raised<'ctx>(
    func: &dyn ContractFn,
    exc: &RaisedException,
    args: &[Value<'ctx>],
    result: Option<&Value<'ctx>>,
    space: &StateSpace<'ctx, '_>,
) -> CallAnalysis {
    match ExceptionFilter::classify(func.conditions(), exc, false) {
        ExceptionDisposition::Ignore => CallAnalysis::ignored(),
        ExceptionDisposition::Confirm => CallAnalysis::confirmed(),
        // Bubbles through the Call Driver to an unknown verdict, with no
        // user-facing message (`spec.md` §4.5 step 3, §7: internal/engine
        // noise is not reported to the user).
        ExceptionDisposition::Unsupported => CallAnalysis::status(VerificationStatus::Unknown, Vec::new()),
        ExceptionDisposition::Internal => {
            let param_names: Vec<String> = func
                .conditions()
                .signature
                .params
                .iter()
                .map(|p| p.name.clone())
                .collect();
            let description = describe_input(&param_names, args, result, space);
            let location = exc
                .location
                .clone()
                .unwrap_or_else(|| fallback_location(func.conditions()));
            let mut message = AnalysisMessage::new(
                MessageKind::ExecutionError,
                format!("{}: {} {description}", exc.type_name, exc.message),
                location,
            )
            .with_function(func.qualname());
            if let Some(traceback) = &exc.traceback {
                message = message.with_traceback(traceback.clone());
            }
            CallAnalysis::refuted(vec![message])
        }
    }
}

fn fallback_location(conditions: &covenant_core::Conditions) -> SourceLocation {
    conditions
        .pre
        .first()
        .or_else(|| conditions.post.first())
        .map(|c| c.location.clone())
        .unwrap_or_else(|| SourceLocation::new("<unknown>", 0, 0))
}

/// `get_input_description` (`spec.md` §4.9 step 5, §2 supplement): renders
/// the arguments a path was reached with, plus the return value when one is
/// available and not the trivial `None`/`Void`.
fn describe_input(
    param_names: &[String],
    args: &[Value<'_>],
    result: Option<&Value<'_>>,
    space: &StateSpace<'_, '_>,
) -> String {
    let rendered: Vec<String> = param_names
        .iter()
        .zip(args.iter())
        .map(|(name, value)| format!("{name}={}", value.realize(space)))
        .collect();
    let base = if rendered.is_empty() {
        "for any input".to_string()
    } else {
        format!("for {}", rendered.join(", "))
    };
    match result {
        Some(value) => {
            let realized = value.realize(space);
            if matches!(realized, RealizedValue::Void) {
                base
            } else {
                format!("{base} (which returns {realized})")
            }
        }
        None => base,
    }
}

/// Keyword-variadic proxy: a symbolic mapping with *concrete* string keys
/// (`spec.md` §4.9 step 1, "stringify keys to ensure they are concrete for
/// unpacking") — unlike an ordinary `Map` proxy, the keys here must be
/// knowable without consulting a model, since the front end has to be able
/// to actually bind them as keyword names.
fn proxy_kwargs<'ctx>(
    factory: &mut ProxyFactory<'_, '_>,
    kwargs: &covenant_core::Param,
    qualname: &str,
    space: &mut StateSpace<'ctx, '_>,
) -> Result<Value<'ctx>, EngineSignal> {
    let mut pairs = Vec::new();
    loop {
        if pairs.len() >= MAX_CONTAINER_LEN || !space.fork()? {
            break;
        }
        let key_text = format!("{}{}", kwargs.name, pairs.len());
        let key = concrete_str(space, &key_text);
        let value = factory.proxy_for_type(&kwargs.schema, &format!("{qualname}.{key_text}"), space)?;
        pairs.push((key, value));
    }
    Ok(Value::Map(pairs))
}

fn concrete_str<'ctx>(space: &StateSpace<'ctx, '_>, text: &str) -> Value<'ctx> {
    let chars = text
        .chars()
        .map(|c| space.solver().int_const(c as i64))
        .collect();
    Value::Str(StrValue { chars })
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::{Conditions, MutableArgs, Param, Signature, TypeSchema};

    struct NoClasses;

    impl super::contracts::SubclassRegistry for NoClasses {
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

    /// `f(a: bool) -> bool`, whose single precondition always raises.
    /// `spec.md` §9's first Open Question: the source returns an *empty*
    /// `CallAnalysis` (our `None` "ignored" status) rather than bubbling as
    /// `Unknown`; `SPEC_FULL.md` §2 preserves that behavior. Since every
    /// iteration is ignored, no path ever confirms, refutes, or records a
    /// failing precondition — the run reports a bare "not confirmed" rather
    /// than "unable to meet precondition" (that message is reserved for
    /// preconditions that evaluate to *false*, not ones that raise).
    struct AlwaysRaisingPrecondition {
        conditions: Conditions,
    }

    impl AlwaysRaisingPrecondition {
        fn new() -> Self {
            let signature = Signature::new(vec![Param::new("a", TypeSchema::Bool)], TypeSchema::Bool);
            Self {
                conditions: Conditions {
                    pre: vec![Condition::new(SourceLocation::new("t.rs", 1, 0), "a.validate()")],
                    post: vec![Condition::new(SourceLocation::new("t.rs", 2, 0), "_ == a")],
                    raises: Default::default(),
                    mutable_args: MutableArgs::Named(Default::default()),
                    signature,
                },
            }
        }
    }

    impl ContractFn for AlwaysRaisingPrecondition {
        fn qualname(&self) -> &str {
            "t.always_raising_precondition"
        }

        fn conditions(&self) -> &Conditions {
            &self.conditions
        }

        fn eval_preconditions<'ctx>(
            &self,
            _args: &[Value<'ctx>],
            _space: &mut StateSpace<'ctx, '_>,
        ) -> Result<Vec<Value<'ctx>>, CallError> {
            Err(CallError::Raised(RaisedException::new("ValueError", "boom")))
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
            let result = args[0].clone();
            Ok((args, result))
        }
    }

    /// `f(a: int) -> int`, with three preconditions in declaration order:
    /// `a == 1` (line 1), `a == 2` (line 2), `a == 1` (line 3). The first two
    /// already conflict, so the assumption goes `Unsat` the moment the
    /// line-2 precondition is asserted — the line-3 one is never even
    /// reached. `spec.md` §8 property 7 expects line 2 to be named; blindly
    /// blaming the highest-line entry in the whole list would instead name
    /// line 3, which never individually failed.
    struct ConflictingPreconditions {
        conditions: Conditions,
    }

    impl ConflictingPreconditions {
        fn new() -> Self {
            let signature = Signature::new(vec![Param::new("a", TypeSchema::Int)], TypeSchema::Int);
            Self {
                conditions: Conditions {
                    pre: vec![
                        Condition::new(SourceLocation::new("t.rs", 1, 0), "a == 1"),
                        Condition::new(SourceLocation::new("t.rs", 2, 0), "a == 2"),
                        Condition::new(SourceLocation::new("t.rs", 3, 0), "a == 1"),
                    ],
                    post: vec![Condition::new(SourceLocation::new("t.rs", 4, 0), "_ == a")],
                    raises: Default::default(),
                    mutable_args: MutableArgs::Named(Default::default()),
                    signature,
                },
            }
        }
    }

    impl ContractFn for ConflictingPreconditions {
        fn qualname(&self) -> &str {
            "t.conflicting_preconditions"
        }

        fn conditions(&self) -> &Conditions {
            &self.conditions
        }

        fn eval_preconditions<'ctx>(
            &self,
            args: &[Value<'ctx>],
            space: &mut StateSpace<'ctx, '_>,
        ) -> Result<Vec<Value<'ctx>>, CallError> {
            let Value::Int(a) = &args[0] else {
                return Ok(vec![Value::Void, Value::Void, Value::Void]);
            };
            let ctx = space.solver().context();
            let one = z3::ast::Int::from_i64(ctx, 1);
            let two = z3::ast::Int::from_i64(ctx, 2);
            Ok(vec![
                Value::Bool(a._eq(&one)),
                Value::Bool(a._eq(&two)),
                Value::Bool(a._eq(&one)),
            ])
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

    #[test]
    fn unsat_precondition_conjunction_blames_the_condition_that_actually_conflicts() {
        let classes = NoClasses;
        let registry = ClassRegistry::new(&classes);
        let driver = CallDriver::new(registry);
        let func = ConflictingPreconditions::new();
        let trees = driver.verify(&func, &covenant_core::Options::default());
        assert_eq!(trees.len(), 1);
        assert_eq!(
            trees[0].verification_status,
            covenant_core::VerificationStatus::Unknown
        );
        assert!(trees[0].messages.iter().any(|m| {
            m.kind == MessageKind::PreconditionUnsatisfiable && m.location.line == 2
        }));
        assert!(!trees[0].messages.iter().any(|m| m.location.line == 3));
    }

    #[test]
    fn ignored_precondition_exception_is_silently_dropped() {
        let classes = NoClasses;
        let registry = ClassRegistry::new(&classes);
        let driver = CallDriver::new(registry);
        let func = AlwaysRaisingPrecondition::new();
        let trees = driver.verify(&func, &covenant_core::Options::default());
        assert_eq!(trees.len(), 1);
        assert_eq!(
            trees[0].verification_status,
            covenant_core::VerificationStatus::Unknown
        );
        assert_eq!(trees[0].num_confirmed_paths, 0);
        assert!(trees[0]
            .messages
            .iter()
            .any(|m| m.kind == MessageKind::CannotConfirm));
        assert!(!trees[0]
            .messages
            .iter()
            .any(|m| m.kind == MessageKind::PreconditionUnsatisfiable));
    }
}
