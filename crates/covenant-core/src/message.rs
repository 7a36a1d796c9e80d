//! Analysis messages: verdicts addressed to a source location.

use serde::{Deserialize, Serialize};

use crate::condition::SourceLocation;

/// The kind of verdict a message carries (`spec.md` §3, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    SyntaxError,
    CannotConfirm,
    Confirmed,
    PreconditionUnsatisfiable,
    ExecutionError,
    PostconditionError,
    PostconditionFail,
}

impl MessageKind {
    /// Severity used for message-aggregation tie-breaking (`spec.md` §4.10):
    /// higher is more severe. Refutations and unsatisfiable preconditions
    /// outrank "cannot confirm", which outranks a bare confirmation.
    pub fn severity(self) -> u8 {
        match self {
            MessageKind::ExecutionError
            | MessageKind::PostconditionError
            | MessageKind::PostconditionFail
            | MessageKind::PreconditionUnsatisfiable
            | MessageKind::SyntaxError => 2,
            MessageKind::CannotConfirm => 1,
            MessageKind::Confirmed => 0,
        }
    }
}

/// A verdict addressed to a source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisMessage {
    pub kind: MessageKind,
    pub text: String,
    pub location: SourceLocation,
    pub traceback: Option<String>,
    pub function_qualname: String,
    pub condition_source: String,
}

impl AnalysisMessage {
    pub fn new(
        kind: MessageKind,
        text: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            location,
            traceback: None,
            function_qualname: String::new(),
            condition_source: String::new(),
        }
    }

    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    pub fn with_function(mut self, qualname: impl Into<String>) -> Self {
        self.function_qualname = qualname.into();
        self
    }

    pub fn with_condition_source(mut self, source: impl Into<String>) -> Self {
        self.condition_source = source.into();
        self
    }

    /// Sort/collision key used by the Message Aggregator (`spec.md` §4.10):
    /// prefer more severe verdicts, prefer those whose rendering succeeded,
    /// prefer shorter messages.
    pub fn priority_key(&self) -> (u8, bool, isize) {
        let has_usable_repr = !self.text.contains("<unable to repr>");
        (self.kind.severity(), has_usable_repr, -(self.text.len() as isize))
    }
}
