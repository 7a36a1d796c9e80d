//! Exception Filter (`spec.md` §4.5): classifies an exception raised by a
//! `ContractFn`/`ClassUnderTest` callee into one of four dispositions.

use covenant_core::{Conditions, SourceLocation, NOT_IMPLEMENTED_MARKER};

use super::state_space::EngineSignal;

/// An exception propagated out of real function code, as the front end
/// reports it. `type_name` is matched against `Conditions::raises` by the
/// filter; it need not be a Rust type — the front end decides what names to
/// use, the same way the original matched Python exception class names.
#[derive(Debug, Clone)]
pub struct RaisedException {
    pub type_name: String,
    pub message: String,
    pub traceback: Option<String>,
    /// Where in the function under analysis this exception originated, if
    /// the front end can recover it from its own traceback (`spec.md` §4.9
    /// step 5, "the deepest frame still inside the function"). `None` falls
    /// back to the nearest known condition location.
    pub location: Option<SourceLocation>,
}

impl RaisedException {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            traceback: None,
            location: None,
        }
    }

    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_not_implemented(&self) -> bool {
        self.type_name == NOT_IMPLEMENTED_MARKER
    }
}

/// Everything that can go wrong calling into a `ContractFn`: either an
/// engine-internal signal (deadline) or a real exception from the callee.
#[derive(Debug)]
pub enum CallError {
    Signal(EngineSignal),
    Raised(RaisedException),
}

impl From<EngineSignal> for CallError {
    fn from(signal: EngineSignal) -> Self {
        CallError::Signal(signal)
    }
}

/// The filter's verdict on a raised exception (`spec.md` §4.5), in priority
/// order: `Ignore` beats `Confirm` beats `Unsupported` beats `Internal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionDisposition {
    /// A precondition-violating or otherwise expected exception: drop the
    /// path silently, contributing no verdict.
    Ignore,
    /// Declared via `raises`, or `NotImplementedError`-equivalent: the
    /// callee declined to handle this input, or raised something the
    /// analysis was told to expect; treat the path as confirming (nothing
    /// to refute).
    Confirm,
    /// A type error whose message indicates a proxy-incompatible operation
    /// (an operator or builtin the symbolic layer doesn't instrument) rather
    /// than a real bug: outside analysis scope, bubbles to an unknown
    /// verdict instead of a refutation.
    Unsupported,
    /// Not declared anywhere, and not a recognized proxy-incompatibility: a
    /// genuine bug, reported as an execution error.
    Internal,
}

/// Substrings that mark a type error as "the symbolic layer doesn't support
/// this operation" rather than a bug in the function under analysis
/// (`spec.md` §4.5 step 3).
const UNSUPPORTED_OPERATION_MARKERS: &[&str] = &[
    "unsupported operand type",
    "not supported between instances",
    "object is not callable",
    "no proxy registered for",
];

fn looks_like_unsupported_operation(exc: &RaisedException) -> bool {
    exc.type_name == "TypeError"
        && UNSUPPORTED_OPERATION_MARKERS
            .iter()
            .any(|marker| exc.message.contains(marker))
}

/// Classifies `exc` against the callee's declared `raises` set and whether
/// this exception occurred while evaluating a precondition.
pub struct ExceptionFilter;

impl ExceptionFilter {
    pub fn classify(
        conditions: &Conditions,
        exc: &RaisedException,
        while_evaluating_precondition: bool,
    ) -> ExceptionDisposition {
        if while_evaluating_precondition {
            return ExceptionDisposition::Ignore;
        }
        if exc.is_not_implemented() || conditions.raises_includes(&exc.type_name) {
            return ExceptionDisposition::Confirm;
        }
        if looks_like_unsupported_operation(exc) {
            return ExceptionDisposition::Unsupported;
        }
        ExceptionDisposition::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::{MutableArgs, Signature};

    fn conditions_with_raises(raises: &[&str]) -> Conditions {
        Conditions {
            pre: Vec::new(),
            post: Vec::new(),
            raises: raises.iter().map(|s| s.to_string()).collect(),
            mutable_args: MutableArgs::All,
            signature: Signature::new(Vec::new(), covenant_core::TypeSchema::Void),
        }
    }

    #[test]
    fn precondition_exceptions_are_always_ignored() {
        let conditions = conditions_with_raises(&[]);
        let exc = RaisedException::new("ValueError", "boom");
        assert_eq!(
            ExceptionFilter::classify(&conditions, &exc, true),
            ExceptionDisposition::Ignore
        );
    }

    #[test]
    fn not_implemented_confirms() {
        let conditions = conditions_with_raises(&[]);
        let exc = RaisedException::new(NOT_IMPLEMENTED_MARKER, "unsupported input shape");
        assert_eq!(
            ExceptionFilter::classify(&conditions, &exc, false),
            ExceptionDisposition::Confirm
        );
    }

    #[test]
    fn declared_exception_confirms_not_unsupported() {
        let conditions = conditions_with_raises(&["KeyError"]);
        let exc = RaisedException::new("KeyError", "missing");
        assert_eq!(
            ExceptionFilter::classify(&conditions, &exc, false),
            ExceptionDisposition::Confirm
        );
    }

    #[test]
    fn undeclared_exception_is_internal() {
        let conditions = conditions_with_raises(&["KeyError"]);
        let exc = RaisedException::new("IndexError", "oob");
        assert_eq!(
            ExceptionFilter::classify(&conditions, &exc, false),
            ExceptionDisposition::Internal
        );
    }

    #[test]
    fn proxy_incompatible_type_error_is_unsupported() {
        let conditions = conditions_with_raises(&[]);
        let exc = RaisedException::new(
            "TypeError",
            "unsupported operand type(s) for +: 'SymbolicInt' and 'SymbolicStr'",
        );
        assert_eq!(
            ExceptionFilter::classify(&conditions, &exc, false),
            ExceptionDisposition::Unsupported
        );
    }

    #[test]
    fn undeclared_type_error_without_marker_is_internal() {
        let conditions = conditions_with_raises(&[]);
        let exc = RaisedException::new("TypeError", "expected int, got str");
        assert_eq!(
            ExceptionFilter::classify(&conditions, &exc, false),
            ExceptionDisposition::Internal
        );
    }
}
