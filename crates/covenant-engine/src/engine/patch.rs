//! Patch Manager (`spec.md` §4.6).
//!
//! The original hooks interception in by monkey-patching real interpreter
//! builtins for the dynamic extent of a `with Patched(...)` block; Rust has
//! no equivalent runtime hook. Per `spec.md`'s own Design Notes, Covenant
//! reinterprets this as an explicit, engine-owned registry of which
//! `ContractFn`s are currently eligible for short-circuit interception —
//! scoped the same way, via an RAII guard, just without patching anything
//! global. `ShortCircuitController` consults it before intercepting a call.

use std::cell::RefCell;
use std::collections::BTreeSet;

/// Tracks which qualnames are currently "in flight" on the active call
/// stack, so the Short-Circuit Controller never re-intercepts a function
/// that is already being analyzed further up the same path (which would
/// recurse forever substituting a call for itself).
///
/// Interior-mutable: a front end's `ContractFn::call` needs to consult and
/// enter the *same* manager a nested callee's `ShortCircuitController` call
/// also consults, while the `CallDriver` simultaneously holds a guard open
/// for the whole call — the only way every one of those sites gets a
/// consistent view without fighting the borrow checker over one `&mut` is
/// to put the mutability inside.
#[derive(Debug, Default)]
pub struct PatchManager {
    active: RefCell<BTreeSet<String>>,
}

impl PatchManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, qualname: &str) -> bool {
        self.active.borrow().contains(qualname)
    }

    /// Enter the scope of analyzing `qualname`. Returns `None` if it is
    /// already active (the caller should fall back to a plain, unpatched
    /// call instead of short-circuiting).
    pub fn enter(&self, qualname: &str) -> Option<PatchGuard<'_>> {
        let mut active = self.active.borrow_mut();
        if active.contains(qualname) {
            return None;
        }
        active.insert(qualname.to_string());
        drop(active);
        Some(PatchGuard {
            manager: self,
            qualname: qualname.to_string(),
        })
    }
}

/// Scope guard returned by [`PatchManager::enter`]; removes `qualname` from
/// the active set when dropped, mirroring `Patched.__exit__`.
pub struct PatchGuard<'a> {
    manager: &'a PatchManager,
    qualname: String,
}

impl Drop for PatchGuard<'_> {
    fn drop(&mut self) {
        self.manager.active.borrow_mut().remove(&self.qualname);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentrant_enter_is_refused() {
        let mgr = PatchManager::new();
        let guard = mgr.enter("pkg.f").expect("first entry succeeds");
        assert!(mgr.is_active("pkg.f"));
        assert!(mgr.enter("pkg.f").is_none());
        drop(guard);
        assert!(!mgr.is_active("pkg.f"));
        assert!(mgr.enter("pkg.f").is_some());
    }
}
