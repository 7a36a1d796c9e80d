//! Tracing infrastructure for debugging `CallDriver` runs.
//!
//! Zero-cost abstraction, same idiom as `plotnik-vm`'s `Tracer`: `NoopTracer`
//! is an empty `#[inline(always)]` implementation the compiler eliminates
//! entirely, while `PrintTracer` prints a line per event. `CallDriver` is
//! generic over `T: Tracer` so production callers pay nothing for tracing
//! they never enabled.

use covenant_core::VerificationStatus;

/// Trace hooks for one `CallDriver::verify_with` run. Every method has a
/// default no-op body so implementers only override what they care about.
pub trait Tracer {
    /// A new iteration (fresh `StateSpace`) is starting.
    #[inline(always)]
    fn trace_iteration_start(&mut self, _iteration: u32) {}

    /// A structural or predicate-bearing fork was taken.
    #[inline(always)]
    fn trace_fork(&mut self, _label: &str, _took_true: bool) {}

    /// One iteration completed with the given per-path outcome.
    #[inline(always)]
    fn trace_iteration_end(&mut self, _iteration: u32, _status: Option<VerificationStatus>) {}

    /// The Short-Circuit Controller intercepted a nested contracted call.
    #[inline(always)]
    fn trace_short_circuit(&mut self, _callee_qualname: &str) {}

    /// The search tree reports the run is over (exhausted or refuted).
    #[inline(always)]
    fn trace_verify_end(&mut self, _status: VerificationStatus, _iterations: u32) {}
}

/// Tracer that does nothing; all calls are optimized away in release builds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Tracer that prints one line per event to stdout, for interactive
/// debugging of a stuck or surprising search.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintTracer;

impl Tracer for PrintTracer {
    fn trace_iteration_start(&mut self, iteration: u32) {
        println!("iteration {iteration}: start");
    }

    fn trace_fork(&mut self, label: &str, took_true: bool) {
        println!("  fork {label} -> {took_true}");
    }

    fn trace_iteration_end(&mut self, iteration: u32, status: Option<VerificationStatus>) {
        println!("iteration {iteration}: end ({status:?})");
    }

    fn trace_short_circuit(&mut self, callee_qualname: &str) {
        println!("  short-circuit: {callee_qualname}");
    }

    fn trace_verify_end(&mut self, status: VerificationStatus, iterations: u32) {
        println!("verify done: {status:?} after {iterations} iterations");
    }
}
