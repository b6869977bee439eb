//! AI generation requests run as a bounded, cancellable job queue.
//!
//! [`GenerationOrchestrator`] turns a request into jobs and runs their backend
//! calls on a small worker pool; workers report back over a channel and
//! [`JobBoard`] is the only place those reports touch the document.

mod backend;
mod board;
mod job;
mod orchestrator;

pub use backend::{
    BackendError, GenerationBackend, GenerationOptions, LayerRasterizer, Provenance,
    ProvenanceStamp, SourceImageRasterizer, UnavailableBackend,
};
pub use board::JobBoard;
pub use job::{GenerationJob, GenerationMode, ImageRef, JobId, JobStatus, ResultTarget};
pub use orchestrator::{
    CancelToken, GenerationOrchestrator, GenerationRequest, JobEvent, PreparedBatch, WorkItem,
};
