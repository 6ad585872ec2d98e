//! Queue Transport
//!
//! Abstractions over the pipeline's external collaborators:
//! - a FIFO blocking queue with at-least-once delivery
//! - a TTL key-value store for dedup state
//! - the single-consumer loop feeding handlers one message at a time
//!
//! In-memory implementations are provided for single-process
//! deployments and tests; production deployments back these traits
//! with a durable queue server.

mod consumer;
mod dedup_store;
mod error;
mod queue;

pub use consumer::{run_consumer, ResultHandler};
pub use dedup_store::{DedupStore, MemoryDedupStore, RefreshOutcome};
pub use error::TransportError;
pub use queue::{MemoryQueue, ResultQueue};
