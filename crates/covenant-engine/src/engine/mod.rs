//! The engine: the Search Tree, State Space, Proxy Factory, and the
//! collaborator traits a front end implements to drive them (`spec.md` §3,
//! §4).

mod call_driver;
mod class_proxy;
mod contracts;
mod deep_eq;
mod exception_filter;
mod message_aggregator;
mod patch;
mod proxy;
mod search_tree;
mod short_circuit;
mod state_space;
mod tracer;
mod value;

pub use call_driver::{attempt_call, CallDriver};
pub use class_proxy::ClassRegistry;
pub use contracts::{ClassLookup, ClassUnderTest, ContractFn, SubclassRegistry};
pub use deep_eq::deep_eq;
pub use exception_filter::{CallError, ExceptionDisposition, ExceptionFilter, RaisedException};
pub use message_aggregator::MessageAggregator;
pub use patch::{PatchGuard, PatchManager};
pub use proxy::ProxyFactory;
pub use search_tree::SearchTree;
pub use short_circuit::{ShortCircuitController, ShortCircuitOutcome};
pub use state_space::{bubble, EngineSignal, StateSpace};
pub use tracer::{NoopTracer, PrintTracer, Tracer};
pub use value::{
    CanForget, CanFork, CanRealize, ClassInstance, HasPyType, RealizedValue, StrValue, Value,
    MAX_CONTAINER_LEN, MAX_STRING_LEN,
};
