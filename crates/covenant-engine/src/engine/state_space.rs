//! The State Space: per-iteration owner of the solver session and the path
//! taken through the Search Tree (`spec.md` §3, §4.2).

use std::time::{Duration, Instant};

use covenant_solver::{CheckResult, Solver, SolverError};

use super::search_tree::SearchTree;

/// Raised when an iteration must stop immediately and contribute no verdict.
/// Consumed entirely inside `CallDriver`/`attempt_call` — never escapes
/// `covenant-engine`'s public API (`spec.md` §1: "no Rust `Result` leaks a
/// solver or search-tree internal out of the crate").
#[derive(Debug, thiserror::Error)]
pub enum EngineSignal {
    /// The per-path deadline passed mid-iteration. Converted to an `Unknown`
    /// verdict (or `Confirmed`, if the short-circuit confirm bias applies —
    /// see `ShortCircuitController`) at the `CallDriver` boundary.
    #[error("unexplored path: per-path deadline exceeded")]
    UnexploredPath,
    /// The callee raised an exception the `ExceptionFilter` could not
    /// classify as ignore/confirm/unsupported; propagated up as a path
    /// failure distinct from a postcondition violation.
    #[error("uncaught exception during symbolic execution: {0}")]
    UncaughtException(String),
    /// A class invariant could not be established for a proxied instance
    /// (`spec.md` §4.4, §9 "ignore-attempt"): discard the path silently,
    /// contributing no verdict. Also raised when evaluating an invariant
    /// itself raises.
    #[error("ignore-attempt: class invariant not established for a proxied instance")]
    IgnoreAttempt,
}

/// Owns one iteration's solver session and its path through the persistent
/// [`SearchTree`]. Lives exactly as long as one iteration; discarded (along
/// with its `z3::Context`) when the iteration ends, so the "assertion stack
/// is balanced at exit" invariant (`spec.md` §5) holds trivially — nothing
/// survives to need unwinding.
pub struct StateSpace<'ctx, 'tree> {
    solver: Solver<'ctx>,
    tree: &'tree mut SearchTree,
    path: Vec<bool>,
    deadline: Instant,
    check_timeout: Duration,
    running_framework_code: bool,
    /// Set when a `fork_with_confirm_or_else` took its "do not intercept"
    /// branch: if the iteration later times out with no other verdict, that
    /// absence of information should count as a confirmation, not an
    /// unknown, because the short-circuit controller deliberately let real
    /// execution continue. See `ShortCircuitController` and `DESIGN.md`.
    confirm_bias: bool,
}

impl<'ctx, 'tree> StateSpace<'ctx, 'tree> {
    pub fn new(
        ctx: &'ctx z3::Context,
        tree: &'tree mut SearchTree,
        deadline: Instant,
        check_timeout: Duration,
    ) -> Self {
        Self {
            solver: Solver::new(ctx),
            tree,
            path: Vec::new(),
            deadline,
            check_timeout,
            running_framework_code: false,
            confirm_bias: false,
        }
    }

    pub fn solver(&self) -> &Solver<'ctx> {
        &self.solver
    }

    pub fn path(&self) -> &[bool] {
        &self.path
    }

    pub fn confirm_bias(&self) -> bool {
        self.confirm_bias
    }

    fn check_deadline(&self) -> Result<(), EngineSignal> {
        if self.running_framework_code {
            return Ok(());
        }
        if Instant::now() >= self.deadline {
            Err(EngineSignal::UnexploredPath)
        } else {
            Ok(())
        }
    }

    /// A plain structural fork: no solver predicate is attached, because the
    /// choice (container length, enum/subclass selection) is already
    /// concrete. `spec.md` §4.3.
    pub fn fork(&mut self) -> Result<bool, EngineSignal> {
        self.check_deadline()?;
        let take_true = self.tree.decide_next(&self.path);
        self.path.push(take_true);
        Ok(take_true)
    }

    /// Fork on a symbolic boolean predicate: the chosen branch's truth value
    /// is asserted into the solver before returning (`spec.md` §4.2). Unlike
    /// the plain structural [`Self::fork`] (container lengths, enum/subclass
    /// choice, where either branch is trivially reachable), the branch chosen
    /// here is tied to an arbitrary accumulated predicate that may conflict
    /// with constraints already on the path — so this is also a suspension
    /// point that "may consult the solver" (`spec.md` §5). If asserting the
    /// structurally-preferred branch makes the path infeasible, the branch
    /// was never really reachable; it is reported as an ignore-attempt so
    /// the tree still marks it exhausted and a later iteration explores the
    /// complementary branch instead of the search reporting a phantom
    /// counterexample (or a phantom confirmation).
    pub fn fork_bool(&mut self, predicate: &z3::ast::Bool<'ctx>) -> Result<bool, EngineSignal> {
        let take_true = self.fork()?;
        let asserted = if take_true {
            predicate.clone()
        } else {
            predicate.not()
        };
        self.solver.assert_bool(&asserted);
        if matches!(self.check(), CheckResult::Unsat) {
            return Err(EngineSignal::IgnoreAttempt);
        }
        Ok(take_true)
    }

    /// `fork_bool` with a confidence bias (`spec.md` §4.7): used only by the
    /// Short-Circuit Controller. The "do not intercept" (false) branch, when
    /// taken, is credited toward confirmation if the iteration runs out the
    /// clock with no other verdict — see [`Self::confirm_bias`].
    pub fn fork_with_confirm_or_else(
        &mut self,
        predicate: &z3::ast::Bool<'ctx>,
        _confidence: f64,
    ) -> Result<bool, EngineSignal> {
        let take_true = self.fork_bool(predicate)?;
        if !take_true {
            self.confirm_bias = true;
        }
        Ok(take_true)
    }

    /// Assert a boolean term directly, with no fork: used for preconditions
    /// (`spec.md` §4.9 step 3), which narrow the feasible region rather than
    /// branch the search tree — a precondition is something every iteration
    /// must hold, not a choice to explore both ways of.
    pub fn assert_bool(&self, term: &z3::ast::Bool<'ctx>) {
        self.solver.assert_bool(term);
    }

    /// Checkpoint the solver (`spec.md` §4.2, §6). Kept for parity with the
    /// external solver interface; because each iteration owns an
    /// independent, single-pass solver session that is discarded wholesale
    /// at the end, nothing ever needs to `pop()` back to it.
    pub fn checkpoint(&self) {
        self.solver.push();
    }

    pub fn check(&self) -> CheckResult {
        self.solver.check(self.check_timeout)
    }

    pub fn model_bool(&self, term: &z3::ast::Bool<'ctx>) -> Result<bool, SolverError> {
        self.solver.model_bool(term)
    }

    pub fn model_int(&self, term: &z3::ast::Int<'ctx>) -> Result<i64, SolverError> {
        self.solver.model_int(term)
    }

    pub fn model_real_f64(&self, term: &z3::ast::Real<'ctx>) -> Result<f64, SolverError> {
        self.solver.model_real_f64(term)
    }

    pub fn fresh_name(&self, prefix: &str) -> String {
        self.solver.fresh_name(prefix)
    }

    /// Run `f` with framework code running: deadline checks are suspended
    /// for its duration (`spec.md` §4.2 "the deadline check is skipped while
    /// running framework code", mirroring `Patched`'s
    /// `_PATCH_REGISTRATIONS`-disabled-during-patch-application window).
    pub fn with_framework_code<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let was = self.running_framework_code;
        self.running_framework_code = true;
        let result = f(self);
        self.running_framework_code = was;
        result
    }
}

/// Apply one completed iteration's outcome back into the persistent tree.
/// Kept as a free function (rather than a `StateSpace` method) because it
/// consumes the `StateSpace` by value — the iteration is over.
pub fn bubble(
    tree: &mut SearchTree,
    path: &[bool],
    status: Option<covenant_core::VerificationStatus>,
) {
    tree.bubble(path, super::search_tree::LeafOutcome { status });
}
