//! The Covenant engine: Search Tree, State Space, Proxy Factory, and Call
//! Driver (`spec.md` §3, §4). A front end supplies `ContractFn`/
//! `ClassUnderTest`/`SubclassRegistry` implementations and drives analysis
//! through [`CallDriver`].

mod engine;

pub use engine::{
    attempt_call, bubble, deep_eq, CallDriver, CallError, CanForget, CanFork, CanRealize,
    ClassInstance, ClassLookup, ClassRegistry, ClassUnderTest, ContractFn, EngineSignal,
    ExceptionDisposition, ExceptionFilter, HasPyType, MessageAggregator, NoopTracer, PatchGuard,
    PatchManager, PrintTracer, ProxyFactory, RaisedException, RealizedValue, SearchTree,
    ShortCircuitController, ShortCircuitOutcome, StateSpace, StrValue, SubclassRegistry, Tracer,
    Value, MAX_CONTAINER_LEN, MAX_STRING_LEN,
};

pub use covenant_core::{
    AnalysisMessage, CallAnalysis, CallTreeAnalysis, ClassConditions, Condition, Conditions,
    Counters, MessageKind, MutableArgs, Options, Param, Signature, SourceLocation, TypeSchema,
    VerificationStatus, NOT_IMPLEMENTED_MARKER,
};
