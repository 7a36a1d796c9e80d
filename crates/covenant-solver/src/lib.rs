//! Thin, uniform facade over the SMT solver (`spec.md` §4.1, §6).
//!
//! The engine never talks to `z3` directly outside this crate: every other
//! Covenant crate reaches the solver exclusively through [`Solver`],
//! [`CheckResult`], and the `fresh_*`/`model_*` methods. Per `spec.md` §1,
//! the solver itself — its theory decision procedures, its model
//! construction — is an external collaborator; this facade only pins down
//! the primitive interface the rest of the engine assumes.

use std::cell::Cell;
use std::time::Duration;

pub use z3;

/// Result of a bounded satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    Sat,
    Unsat,
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("solver produced no model (was check() called and did it return Sat?)")]
    NoModel,
    #[error("model has no binding for the requested symbol")]
    MissingModelValue,
}

/// Facade over one solver session.
///
/// Owns a single `z3::Solver` bound to the caller-supplied `z3::Context`.
/// `covenant-engine`'s `StateSpace` owns exactly one `Solver` per iteration
/// and is responsible for keeping its push/pop stack balanced (`spec.md`
/// §5: "the State Space guarantees the assertion stack is balanced at
/// exit").
pub struct Solver<'ctx> {
    ctx: &'ctx z3::Context,
    inner: z3::Solver<'ctx>,
    next_id: Cell<u64>,
}

impl<'ctx> Solver<'ctx> {
    pub fn new(ctx: &'ctx z3::Context) -> Self {
        Self {
            ctx,
            inner: z3::Solver::new(ctx),
            next_id: Cell::new(0),
        }
    }

    pub fn context(&self) -> &'ctx z3::Context {
        self.ctx
    }

    /// A solver-unique name for a fresh symbol, e.g. `fresh_name("a")` ->
    /// `"a$3"`. Mirrors `StateSpace::fresh_name` in `spec.md` §4.2, one
    /// layer down: the engine's fresh-name counter is per-iteration, this
    /// one is purely for keeping solver symbol names collision-free.
    pub fn fresh_name(&self, prefix: &str) -> String {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        format!("{prefix}${id}")
    }

    pub fn fresh_bool(&self, prefix: &str) -> z3::ast::Bool<'ctx> {
        z3::ast::Bool::new_const(self.ctx, self.fresh_name(prefix))
    }

    pub fn fresh_int(&self, prefix: &str) -> z3::ast::Int<'ctx> {
        z3::ast::Int::new_const(self.ctx, self.fresh_name(prefix))
    }

    pub fn fresh_real(&self, prefix: &str) -> z3::ast::Real<'ctx> {
        z3::ast::Real::new_const(self.ctx, self.fresh_name(prefix))
    }

    pub fn bool_const(&self, value: bool) -> z3::ast::Bool<'ctx> {
        z3::ast::Bool::from_bool(self.ctx, value)
    }

    pub fn int_const(&self, value: i64) -> z3::ast::Int<'ctx> {
        z3::ast::Int::from_i64(self.ctx, value)
    }

    pub fn assert_bool(&self, term: &z3::ast::Bool<'ctx>) {
        self.inner.assert(term);
    }

    /// Push a checkpoint. Paired 1:1 with [`Solver::pop`] by every `fork`.
    pub fn push(&self) {
        self.inner.push();
    }

    pub fn pop(&self, n: u32) {
        self.inner.pop(n);
    }

    /// Bounded satisfiability check under the given per-check timeout.
    pub fn check(&self, timeout: Duration) -> CheckResult {
        let params = z3::Params::new(self.ctx);
        let millis = timeout.as_millis().min(u32::MAX as u128) as u32;
        params.set_u32("timeout", millis);
        self.inner.set_params(&params);
        match self.inner.check() {
            z3::SatResult::Sat => CheckResult::Sat,
            z3::SatResult::Unsat => CheckResult::Unsat,
            z3::SatResult::Unknown => CheckResult::Unknown,
        }
    }

    pub fn model_bool(&self, term: &z3::ast::Bool<'ctx>) -> Result<bool, SolverError> {
        let model = self.inner.get_model().ok_or(SolverError::NoModel)?;
        model
            .eval(term, true)
            .and_then(|v| v.as_bool())
            .ok_or(SolverError::MissingModelValue)
    }

    pub fn model_int(&self, term: &z3::ast::Int<'ctx>) -> Result<i64, SolverError> {
        let model = self.inner.get_model().ok_or(SolverError::NoModel)?;
        model
            .eval(term, true)
            .and_then(|v| v.as_i64())
            .ok_or(SolverError::MissingModelValue)
    }

    pub fn model_real_f64(&self, term: &z3::ast::Real<'ctx>) -> Result<f64, SolverError> {
        let model = self.inner.get_model().ok_or(SolverError::NoModel)?;
        let (num, den) = model
            .eval(term, true)
            .and_then(|v| v.as_real())
            .ok_or(SolverError::MissingModelValue)?;
        Ok(num as f64 / den.max(1) as f64)
    }
}

/// Build a fresh `z3::Config` / `z3::Context` pair with Covenant's defaults.
///
/// Exists so callers (principally `covenant-engine::SearchTree::fresh_path`)
/// don't need to depend on `z3` directly just to stand up a context.
pub fn new_context() -> z3::Context {
    let cfg = z3::Config::new();
    z3::Context::new(&cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fresh_names_are_unique_per_prefix() {
        let ctx = new_context();
        let solver = Solver::new(&ctx);
        assert_eq!(solver.fresh_name("a"), "a$0");
        assert_eq!(solver.fresh_name("a"), "a$1");
        assert_eq!(solver.fresh_name("b"), "b$2");
    }

    #[test]
    fn unsat_after_contradictory_assertions() {
        let ctx = new_context();
        let solver = Solver::new(&ctx);
        let x = solver.fresh_int("x");
        solver.assert_bool(&x._eq(&solver.int_const(1)));
        solver.assert_bool(&x._eq(&solver.int_const(2)));
        assert_eq!(solver.check(Duration::from_secs(1)), CheckResult::Unsat);
    }

    #[test]
    fn model_round_trips_a_fixed_binding() {
        let ctx = new_context();
        let solver = Solver::new(&ctx);
        let x = solver.fresh_int("x");
        solver.assert_bool(&x._eq(&solver.int_const(7)));
        assert_eq!(solver.check(Duration::from_secs(1)), CheckResult::Sat);
        assert_eq!(solver.model_int(&x).unwrap(), 7);
    }

    #[test]
    fn push_pop_restores_prior_assertions() {
        let ctx = new_context();
        let solver = Solver::new(&ctx);
        let x = solver.fresh_int("x");
        solver.assert_bool(&x._eq(&solver.int_const(1)));
        solver.push();
        solver.assert_bool(&x._eq(&solver.int_const(2)));
        assert_eq!(solver.check(Duration::from_secs(1)), CheckResult::Unsat);
        solver.pop(1);
        assert_eq!(solver.check(Duration::from_secs(1)), CheckResult::Sat);
    }
}
