use egui::{Rect, pos2, vec2};
use log::{debug, info, warn};

use super::job::{GenerationJob, ImageRef, JobId, JobStatus, ResultTarget};
use super::orchestrator::{CancelToken, JobEvent};
use crate::config::ComposerConfig;
use crate::controller::EditContext;
use crate::gallery::Gallery;
use crate::layer::{Layer, LayerId};

/// The single reducer for job events. Owns every tracked job and applies
/// results to the document in arrival order.
#[derive(Debug, Default)]
pub struct JobBoard {
    jobs: Vec<GenerationJob>,
    batches: Vec<Batch>,
}

/// Cancellation handle shared by the jobs of one request
#[derive(Debug)]
struct Batch {
    cancel: CancelToken,
    jobs: Vec<JobId>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, jobs: Vec<GenerationJob>, cancel: CancelToken) {
        let ids = jobs.iter().map(|job| job.id).collect();
        self.jobs.extend(jobs);
        self.batches.push(Batch { cancel, jobs: ids });
        self.prune_batches();
    }

    pub fn jobs(&self) -> &[GenerationJob] {
        &self.jobs
    }

    pub fn get(&self, id: JobId) -> Option<&GenerationJob> {
        self.jobs.iter().find(|job| job.id == id)
    }

    /// Whether any job is still queued or running
    pub fn is_busy(&self) -> bool {
        self.jobs.iter().any(|job| !job.status.is_terminal())
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|job| job.status == status).count()
    }

    /// Number of requests that still hold a live cancel token
    pub fn active_batches(&self) -> usize {
        self.batches.len()
    }

    fn is_live(&self, id: JobId) -> bool {
        self.get(id).is_some_and(|job| !job.status.is_terminal())
    }

    /// Drops the tokens of batches whose jobs have all settled
    fn prune_batches(&mut self) {
        let batches = std::mem::take(&mut self.batches);
        self.batches = batches
            .into_iter()
            .filter(|batch| batch.jobs.iter().any(|id| self.is_live(*id)))
            .collect();
    }

    /// Stops every running batch. Queued and running jobs are marked
    /// cancelled right away; their late results are ignored.
    pub fn cancel_all(&mut self) -> usize {
        for batch in self.batches.drain(..) {
            batch.cancel.cancel();
        }
        let cancelled = self
            .jobs
            .iter_mut()
            .filter(|job| !job.status.is_terminal())
            .map(|job| job.transition(JobStatus::Cancelled))
            .filter(|changed| *changed)
            .count();
        if cancelled > 0 {
            info!("Cancelled {cancelled} generation job(s)");
        }
        cancelled
    }

    /// Forgets finished jobs
    pub fn clear_finished(&mut self) {
        self.jobs.retain(|job| !job.status.is_terminal());
        self.prune_batches();
    }

    /// Cancels everything and forgets every job. Events still in flight for
    /// the dropped jobs are ignored when they arrive.
    pub fn reset(&mut self) {
        self.cancel_all();
        self.jobs.clear();
    }

    /// Applies one worker event. Returns the layers a successful result
    /// inserted into the document.
    pub fn apply(
        &mut self,
        event: JobEvent,
        ctx: &mut EditContext<'_>,
        gallery: &dyn Gallery,
        config: &ComposerConfig,
    ) -> Vec<LayerId> {
        let inserted = self.apply_event(event, ctx, gallery, config);
        self.prune_batches();
        inserted
    }

    fn apply_event(
        &mut self,
        event: JobEvent,
        ctx: &mut EditContext<'_>,
        gallery: &dyn Gallery,
        config: &ComposerConfig,
    ) -> Vec<LayerId> {
        let id = event.job();
        let Some(job) = self.jobs.iter_mut().find(|job| job.id == id) else {
            warn!("Event for unknown job {id} ignored");
            return Vec::new();
        };

        match event {
            JobEvent::Started { .. } => {
                job.transition(JobStatus::Running);
                Vec::new()
            }
            JobEvent::Cancelled { .. } => {
                job.transition(JobStatus::Cancelled);
                Vec::new()
            }
            JobEvent::Finished { outcome: Err(message), .. } => {
                if job.fail(message) {
                    warn!("Job {id} failed: {}", job.error.as_deref().unwrap_or_default());
                }
                Vec::new()
            }
            JobEvent::Finished { outcome: Ok(images), .. } => {
                if !job.transition(JobStatus::Done) {
                    debug!("Late result for job {id} discarded");
                    return Vec::new();
                }
                job.results = images.clone();
                gallery.add_images(&images);
                match job.target {
                    ResultTarget::Gallery => Vec::new(),
                    ResultTarget::NewLayer => insert_results(job, &images, ctx, config),
                }
            }
        }
    }
}

/// Adds one image layer per result to the right of the job's source layer,
/// as a single undo step
fn insert_results(
    job: &GenerationJob,
    images: &[ImageRef],
    ctx: &mut EditContext<'_>,
    config: &ComposerConfig,
) -> Vec<LayerId> {
    if images.is_empty() {
        return Vec::new();
    }

    let gap = config.result_gap;
    let anchor = job
        .source_layers
        .iter()
        .find_map(|id| ctx.document.store.get(*id))
        .map(|layer| layer.rect())
        .unwrap_or_else(|| {
            let center = ctx.document.canvas().center();
            Rect::from_center_size(center, vec2(config.default_shape_size, config.default_shape_size))
        });

    ctx.begin_interaction();
    let ids: Vec<LayerId> = images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            let x = anchor.right() + gap + index as f32 * (anchor.width() + gap);
            let rect = Rect::from_min_size(pos2(x, anchor.top()), anchor.size());
            let layer = Layer::image(image.clone(), rect).with_name(format!("Generated {}", job.id));
            ctx.store().add(layer)
        })
        .collect();
    ctx.commit();

    debug!("Job {}: inserted {} result layer(s)", job.id, ids.len());
    ids
}
