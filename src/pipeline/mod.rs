//! Commit processing pipeline
//!
//! # Architecture
//!
//! - **stage**: the `Stage` seam and the ordered registry the conductor
//!   dispatches through
//! - **fetch / extract / push / pull / finalize**: the concrete stages,
//!   each claiming a disjoint set of statuses
//! - **conductor**: runs the claiming stage and re-enqueues until the
//!   record reaches a terminal status
//! - **queue**: the queue seam plus an in-process queue and worker
//! - **context**: collaborators shared by every stage

mod conductor;
mod context;
mod extract;
mod fetch;
mod finalize;
mod pull;
mod push;
mod queue;
mod stage;

pub use conductor::Conductor;
pub use context::{ChecksumCache, PipelineContext};
pub use extract::ExtractStage;
pub use fetch::FetchStage;
pub use finalize::FinalizeStage;
pub use pull::PullStage;
pub use push::PushStage;
pub use queue::{LocalWorker, MemoryQueue, Queue};
pub use stage::{Stage, StageOutcome, StageRegistry};
