use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::channel::mpsc::UnboundedSender;
use futures::future::{BoxFuture, FutureExt, join_all};
use log::{debug, info, warn};
use parking_lot::Mutex;

use super::backend::{GenerationBackend, GenerationOptions, LayerRasterizer, Provenance, ProvenanceStamp};
use super::job::{GenerationJob, GenerationMode, ImageRef, JobId, ResultTarget};
use crate::layer::LayerId;
use crate::store::LayerStore;

/// Shared flag checked by workers before each dequeue and after each call
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Messages from workers to the job reducer
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Started { job: JobId },
    Finished {
        job: JobId,
        outcome: Result<Vec<ImageRef>, String>,
    },
    /// The job never started, or its result arrived after cancellation
    Cancelled { job: JobId },
}

impl JobEvent {
    pub fn job(&self) -> JobId {
        match self {
            JobEvent::Started { job } | JobEvent::Finished { job, .. } | JobEvent::Cancelled { job } => *job,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    pub target: ResultTarget,
    pub prompt: String,
    pub layers: Vec<LayerId>,
    pub options: GenerationOptions,
}

/// One backend call waiting for a worker
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub job: JobId,
    pub prompt: String,
    pub images: Vec<ImageRef>,
}

/// Jobs to track plus the work that still has to run for them
#[derive(Debug, Default)]
pub struct PreparedBatch {
    pub jobs: Vec<GenerationJob>,
    pub work: Vec<WorkItem>,
}

impl PreparedBatch {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

pub struct GenerationOrchestrator {
    backend: Arc<dyn GenerationBackend>,
    stamp: Option<Arc<dyn ProvenanceStamp>>,
    workers: usize,
}

impl GenerationOrchestrator {
    pub fn new(backend: Arc<dyn GenerationBackend>, workers: usize) -> Self {
        Self {
            backend,
            stamp: None,
            workers: workers.max(1),
        }
    }

    pub fn with_stamp(mut self, stamp: Arc<dyn ProvenanceStamp>) -> Self {
        self.stamp = Some(stamp);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn set_backend(&mut self, backend: Arc<dyn GenerationBackend>) {
        self.backend = backend;
    }

    /// Builds jobs for `request` from the layers it names, in stacking order.
    /// Layers that cannot be rendered fail their job immediately; a multi-input
    /// job fails if any of its inputs cannot be rendered.
    pub fn prepare(
        &self,
        request: &GenerationRequest,
        store: &LayerStore,
        rasterizer: &dyn LayerRasterizer,
    ) -> PreparedBatch {
        let layers: Vec<LayerId> = store
            .iter()
            .map(|layer| layer.id)
            .filter(|id| request.layers.contains(id))
            .collect();
        if layers.is_empty() {
            return PreparedBatch::default();
        }

        let rendered = |id: LayerId| store.get(id).and_then(|layer| rasterizer.rasterize(layer));
        let mut batch = PreparedBatch::default();

        match request.mode {
            GenerationMode::MultiInput => {
                let inputs: Vec<Option<ImageRef>> = layers.iter().map(|id| rendered(*id)).collect();
                let unrenderable = inputs.iter().filter(|input| input.is_none()).count();
                let mut job = GenerationJob::new(
                    request.mode,
                    request.target,
                    request.prompt.clone(),
                    layers,
                    inputs.into_iter().flatten().collect(),
                );
                if unrenderable > 0 {
                    job.fail(format!("{unrenderable} selected layer(s) could not be rendered"));
                } else {
                    batch.work.push(WorkItem {
                        job: job.id,
                        prompt: job.prompt.clone(),
                        images: job.inputs.clone(),
                    });
                }
                batch.jobs.push(job);
            }
            GenerationMode::Batch => {
                for id in layers {
                    let input = rendered(id);
                    let mut job = GenerationJob::new(
                        request.mode,
                        request.target,
                        request.prompt.clone(),
                        vec![id],
                        input.iter().cloned().collect(),
                    );
                    match input {
                        Some(image) => batch.work.push(WorkItem {
                            job: job.id,
                            prompt: job.prompt.clone(),
                            images: vec![image],
                        }),
                        None => {
                            job.fail("Layer could not be rendered");
                        }
                    }
                    batch.jobs.push(job);
                }
            }
        }

        info!(
            "Prepared {} generation job(s), {} runnable",
            batch.jobs.len(),
            batch.work.len()
        );
        batch
    }

    /// Runs `work` on up to `workers` concurrent backend calls, pulling FIFO.
    /// Events go to `events`; the future completes once every item finished
    /// or was cancelled. The host decides where to poll it.
    pub fn run(
        &self,
        work: Vec<WorkItem>,
        options: GenerationOptions,
        cancel: CancelToken,
        events: UnboundedSender<JobEvent>,
    ) -> BoxFuture<'static, ()> {
        let worker_count = self.workers.min(work.len()).max(1);
        let queue = Arc::new(Mutex::new(VecDeque::from(work)));
        let options = Arc::new(options);

        let workers: Vec<_> = (0..worker_count)
            .map(|index| {
                Worker {
                    index,
                    queue: Arc::clone(&queue),
                    backend: Arc::clone(&self.backend),
                    stamp: self.stamp.clone(),
                    options: Arc::clone(&options),
                    cancel: cancel.clone(),
                    events: events.clone(),
                }
                .run()
            })
            .collect();

        async move {
            join_all(workers).await;

            let leftover: Vec<WorkItem> = queue.lock().drain(..).collect();
            if !leftover.is_empty() {
                debug!("{} queued job(s) never started", leftover.len());
            }
            for item in leftover {
                send(&events, JobEvent::Cancelled { job: item.job });
            }
        }
        .boxed()
    }
}

struct Worker {
    index: usize,
    queue: Arc<Mutex<VecDeque<WorkItem>>>,
    backend: Arc<dyn GenerationBackend>,
    stamp: Option<Arc<dyn ProvenanceStamp>>,
    options: Arc<GenerationOptions>,
    cancel: CancelToken,
    events: UnboundedSender<JobEvent>,
}

impl Worker {
    async fn run(self) {
        loop {
            if self.cancel.is_cancelled() {
                debug!("Worker {} stopping: cancelled", self.index);
                break;
            }
            let next = self.queue.lock().pop_front();
            let Some(item) = next else {
                break;
            };

            debug!("Worker {} starting job {}", self.index, item.job);
            send(&self.events, JobEvent::Started { job: item.job });

            let outcome = self.backend.generate(&item.prompt, &item.images, &self.options).await;

            if self.cancel.is_cancelled() {
                debug!("Discarding result of job {} after cancellation", item.job);
                send(&self.events, JobEvent::Cancelled { job: item.job });
                break;
            }

            let outcome = match outcome {
                Ok(images) => Ok(self.stamp_all(&item, images).await),
                Err(err) => Err(err.message),
            };
            send(&self.events, JobEvent::Finished { job: item.job, outcome });
        }
    }

    async fn stamp_all(&self, item: &WorkItem, images: Vec<ImageRef>) -> Vec<ImageRef> {
        let Some(stamp) = &self.stamp else {
            return images;
        };
        let provenance = Provenance {
            job: item.job,
            prompt: item.prompt.clone(),
        };

        let mut stamped = Vec::with_capacity(images.len());
        for image in images {
            match stamp.embed(image.clone(), &provenance).await {
                Ok(image) => stamped.push(image),
                Err(err) => {
                    warn!("Job {}: provenance stamping failed ({err}), keeping image as-is", item.job);
                    stamped.push(image);
                }
            }
        }
        stamped
    }
}

fn send(events: &UnboundedSender<JobEvent>, event: JobEvent) {
    if events.unbounded_send(event).is_err() {
        debug!("Job event dropped: receiver closed");
    }
}
