//! Shared data model for the Covenant contract-verification engine.
//!
//! This crate holds the types every other Covenant crate passes around —
//! conditions, messages, and analysis outcomes — but no behavior. The search
//! tree, state space, and proxy machinery that operate on this data live in
//! `covenant-engine`.

mod analysis;
mod condition;
mod heap;
mod message;
mod options;

pub use analysis::{CallAnalysis, CallTreeAnalysis, VerificationStatus};
pub use condition::{
    ClassConditions, Condition, Conditions, MutableArgs, Param, Signature, SourceLocation,
    TypeSchema, NOT_IMPLEMENTED_MARKER,
};
pub use heap::HeapRef;
pub use message::{AnalysisMessage, MessageKind};
pub use options::{Counters, Options};
