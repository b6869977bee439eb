use log::{debug, warn};

use crate::id_generator::generate_job_id;
use crate::layer::LayerId;

pub type JobId = u64;

/// Opaque reference to raster data: a data URI, http(s) URL or egui image uri
pub type ImageRef = String;

/// `Queued → Running → {Done | Error | Cancelled}`, plus `Queued → Error`
/// for inputs that could not be rendered and `Queued → Cancelled` for jobs
/// that never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error | JobStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Running | Error | Cancelled) | (Running, Done | Error | Cancelled)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMode {
    /// One backend call with every selected layer as an input image
    #[default]
    MultiInput,
    /// One backend call per selected layer
    Batch,
}

/// Where successful results go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultTarget {
    /// New image layers beside the source layer
    #[default]
    NewLayer,
    /// The gallery only
    Gallery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub id: JobId,
    pub mode: GenerationMode,
    pub target: ResultTarget,
    pub prompt: String,
    pub source_layers: Vec<LayerId>,
    pub inputs: Vec<ImageRef>,
    pub status: JobStatus,
    pub results: Vec<ImageRef>,
    pub error: Option<String>,
}

impl GenerationJob {
    pub fn new(
        mode: GenerationMode,
        target: ResultTarget,
        prompt: impl Into<String>,
        source_layers: Vec<LayerId>,
        inputs: Vec<ImageRef>,
    ) -> Self {
        Self {
            id: generate_job_id(),
            mode,
            target,
            prompt: prompt.into(),
            source_layers,
            inputs,
            status: JobStatus::Queued,
            results: Vec::new(),
            error: None,
        }
    }

    /// Moves to `next` if the state machine allows it. Illegal transitions,
    /// such as a late result for a cancelled job, are ignored.
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            if !self.status.is_terminal() {
                warn!("Job {}: illegal transition {:?} -> {:?}", self.id, self.status, next);
            }
            return false;
        }
        debug!("Job {}: {:?} -> {:?}", self.id, self.status, next);
        self.status = next;
        true
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.transition(JobStatus::Error) {
            return false;
        }
        self.error = Some(message.into());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_final() {
        let mut job = GenerationJob::new(GenerationMode::Batch, ResultTarget::Gallery, "p", vec![], vec![]);
        assert!(job.transition(JobStatus::Running));
        assert!(job.transition(JobStatus::Cancelled));
        assert!(!job.transition(JobStatus::Done));
        assert_eq!(job.status, JobStatus::Cancelled);
    }

    #[test]
    fn queued_job_can_fail_without_running() {
        let mut job = GenerationJob::new(GenerationMode::Batch, ResultTarget::Gallery, "p", vec![], vec![]);
        assert!(job.fail("layer could not be rendered"));
        assert_eq!(job.status, JobStatus::Error);
        assert!(!job.transition(JobStatus::Running));
    }
}
