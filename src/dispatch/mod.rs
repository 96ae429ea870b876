//! Worker pool: a bounded task queue, a fixed set of workers, and an atomic aggregate.

pub mod context;
pub mod orchestrator;
pub mod producer;
pub mod source;
pub mod worker;

pub use context::{AggregateCounter, DispatchOpts, ProgressHook};
pub use orchestrator::{Dispatcher, run};
pub use producer::ProducerExit;
pub use source::ReadChunks;
