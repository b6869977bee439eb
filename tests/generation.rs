use std::sync::Arc;

use egui::{Modifiers, Rect, pos2, vec2};
use futures::channel::{mpsc, oneshot};
use futures::executor::{LocalPool, block_on};
use futures::future::{self, BoxFuture, FutureExt};
use futures::task::LocalSpawnExt;
use layer_composer::document::VIEW_ID;
use layer_composer::generation::{
    CancelToken, GenerationOrchestrator, Provenance, ProvenanceStamp, SourceImageRasterizer,
};
use layer_composer::{
    BackendError, CanvasSettings, Composer, ComposerConfig, Document, Gallery, GenerationBackend,
    GenerationMode, GenerationOptions, GenerationRequest, GuideSettings, JobEvent, JobStatus, Layer,
    LayerId, LayerStore, LoadOutcome, MemoryGallery, ResultTarget, ShapeType, UnavailableBackend,
};
use parking_lot::Mutex;
use serde_json::json;

/// Echoes each input as `<input>-out`; inputs named "b" fail
#[derive(Default)]
struct ScriptedBackend {
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedBackend {
    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

impl GenerationBackend for ScriptedBackend {
    fn generate(
        &self,
        _prompt: &str,
        images: &[String],
        _options: &GenerationOptions,
    ) -> BoxFuture<'static, Result<Vec<String>, BackendError>> {
        self.calls.lock().push(images.to_vec());
        let result = if images.iter().any(|image| image == "b") {
            Err(BackendError::new("Quota exceeded for b"))
        } else {
            Ok(images.iter().map(|image| format!("{image}-out")).collect())
        };
        future::ready(result).boxed()
    }
}

/// Each call blocks until the test releases its gate
#[derive(Default)]
struct GatedBackend {
    gates: Mutex<Vec<Option<oneshot::Sender<Result<Vec<String>, BackendError>>>>>,
}

impl GatedBackend {
    fn call_count(&self) -> usize {
        self.gates.lock().len()
    }

    fn release(&self, index: usize) {
        let gate = self.gates.lock()[index].take().unwrap();
        gate.send(Ok(vec![format!("out-{index}")])).unwrap();
    }
}

impl GenerationBackend for GatedBackend {
    fn generate(
        &self,
        _prompt: &str,
        _images: &[String],
        _options: &GenerationOptions,
    ) -> BoxFuture<'static, Result<Vec<String>, BackendError>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().push(Some(tx));
        async move { rx.await.unwrap_or_else(|_| Err(BackendError::new("gate dropped"))) }.boxed()
    }
}

struct SuffixStamp;

impl ProvenanceStamp for SuffixStamp {
    fn embed(&self, image: String, provenance: &Provenance) -> BoxFuture<'static, Result<String, BackendError>> {
        let result = if image.starts_with("c") {
            Err(BackendError::new("unsupported format"))
        } else {
            Ok(format!("{image}#job{}", provenance.job))
        };
        future::ready(result).boxed()
    }
}

fn image(url: &str, x: f32, y: f32, w: f32, h: f32) -> Layer {
    Layer::image(url, Rect::from_min_size(pos2(x, y), vec2(w, h)))
}

// Helper to create a composer over `layers` with the given backend
fn create_composer(
    backend: Arc<dyn GenerationBackend>,
    gallery: Arc<MemoryGallery>,
    layers: Vec<Layer>,
) -> (Composer, Vec<LayerId>) {
    let mut document = Document::new(CanvasSettings {
        guides: GuideSettings { enabled: false },
        ..CanvasSettings::default()
    });
    let ids = layers.into_iter().map(|layer| document.store.add(layer)).collect();
    let composer = Composer::new(ComposerConfig::default(), backend, gallery).with_document(document);
    (composer, ids)
}

fn request(mode: GenerationMode, layers: Vec<LayerId>) -> GenerationRequest {
    GenerationRequest {
        mode,
        prompt: "make it pop".to_owned(),
        layers,
        ..GenerationRequest::default()
    }
}

fn job_for(composer: &Composer, source: LayerId) -> layer_composer::GenerationJob {
    composer
        .jobs()
        .jobs()
        .iter()
        .find(|job| job.source_layers.contains(&source))
        .cloned()
        .unwrap()
}

fn layer_with_url<'a>(composer: &'a Composer, url: &str) -> Option<&'a Layer> {
    composer
        .document()
        .store
        .iter()
        .find(|layer| layer.image_url() == Some(url))
}

#[test]
fn test_batch_failures_stay_isolated() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut composer, ids) = create_composer(
        backend.clone(),
        Arc::new(MemoryGallery::new()),
        vec![
            image("a", 100.0, 100.0, 100.0, 100.0),
            image("b", 100.0, 300.0, 100.0, 100.0),
            image("c", 100.0, 500.0, 80.0, 40.0),
        ],
    );

    let work = composer.request_generation(request(GenerationMode::Batch, ids.clone())).unwrap();
    assert_eq!(composer.jobs().count(JobStatus::Queued), 3);
    block_on(work);
    composer.pump_job_events();

    let a = job_for(&composer, ids[0]);
    let b = job_for(&composer, ids[1]);
    let c = job_for(&composer, ids[2]);
    assert_eq!(a.status, JobStatus::Done);
    assert_eq!(a.results, vec!["a-out".to_owned()]);
    assert_eq!(b.status, JobStatus::Error);
    assert_eq!(b.error.as_deref(), Some("Quota exceeded for b"));
    assert!(b.results.is_empty());
    assert_eq!(c.status, JobStatus::Done);
    assert_eq!(c.results, vec!["c-out".to_owned()]);
    assert_eq!(backend.calls().len(), 3);

    // Results sit to the right of their own source, same size
    let placed = layer_with_url(&composer, "a-out").unwrap();
    assert_eq!(placed.rect(), Rect::from_min_size(pos2(220.0, 100.0), vec2(100.0, 100.0)));
    let placed = layer_with_url(&composer, "c-out").unwrap();
    assert_eq!(placed.rect(), Rect::from_min_size(pos2(200.0, 500.0), vec2(80.0, 40.0)));

    assert_eq!(composer.document().store.len(), 5);
    assert_eq!(composer.history().undo_len(), 2);
    assert!(!composer.jobs().is_busy());
}

#[test]
fn test_multi_input_makes_one_call_in_stacking_order() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut composer, ids) = create_composer(
        backend.clone(),
        Arc::new(MemoryGallery::new()),
        vec![
            image("a", 100.0, 100.0, 100.0, 100.0),
            image("c", 400.0, 100.0, 100.0, 100.0),
        ],
    );

    // Named top-first; the backend still sees bottom-first
    let work = composer
        .request_generation(request(GenerationMode::MultiInput, vec![ids[1], ids[0]]))
        .unwrap();
    block_on(work);
    composer.pump_job_events();

    assert_eq!(backend.calls(), vec![vec!["a".to_owned(), "c".to_owned()]]);
    assert_eq!(composer.jobs().jobs().len(), 1);

    let first = layer_with_url(&composer, "a-out").unwrap();
    let second = layer_with_url(&composer, "c-out").unwrap();
    assert_eq!(first.position(), pos2(220.0, 100.0));
    assert_eq!(second.position(), pos2(340.0, 100.0));

    // Both results of the job undo together
    assert!(composer.undo());
    assert_eq!(composer.document().store.len(), 2);
}

#[test]
fn test_selection_is_used_when_no_layers_are_named() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut composer, ids) = create_composer(
        backend.clone(),
        Arc::new(MemoryGallery::new()),
        vec![image("a", 0.0, 0.0, 10.0, 10.0), image("c", 50.0, 0.0, 10.0, 10.0)],
    );

    assert!(composer.request_generation(request(GenerationMode::Batch, Vec::new())).is_none());
    assert!(composer.jobs().jobs().is_empty());

    composer.select(ids[1], false);
    let work = composer.request_generation(request(GenerationMode::Batch, Vec::new())).unwrap();
    block_on(work);
    assert_eq!(backend.calls(), vec![vec!["c".to_owned()]]);
}

#[test]
fn test_unrenderable_layers_fail_without_backend_call() {
    let backend = Arc::new(ScriptedBackend::default());
    let shape = Layer::shape(ShapeType::Rectangle, Rect::from_min_size(pos2(0.0, 0.0), vec2(10.0, 10.0)));
    let (mut composer, ids) = create_composer(
        backend.clone(),
        Arc::new(MemoryGallery::new()),
        vec![shape, image("a", 100.0, 0.0, 10.0, 10.0)],
    );

    let work = composer.request_generation(request(GenerationMode::MultiInput, ids.clone()));
    assert!(work.is_none());
    let job = &composer.jobs().jobs()[0];
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("1 selected layer(s) could not be rendered"));
    composer.clear_finished_jobs();

    let work = composer.request_generation(request(GenerationMode::Batch, ids.clone())).unwrap();
    block_on(work);
    composer.pump_job_events();

    assert_eq!(job_for(&composer, ids[0]).error.as_deref(), Some("Layer could not be rendered"));
    assert_eq!(job_for(&composer, ids[1]).status, JobStatus::Done);
    assert_eq!(backend.calls(), vec![vec!["a".to_owned()]]);
}

#[test]
fn test_cancellation_stops_queue_and_discards_late_results() {
    let backend = Arc::new(GatedBackend::default());
    let layers = (0..5)
        .map(|i| image(&format!("in-{i}"), i as f32 * 150.0, 0.0, 100.0, 100.0))
        .collect();
    let (mut composer, ids) = create_composer(backend.clone(), Arc::new(MemoryGallery::new()), layers);

    let mut pool = LocalPool::new();
    let work = composer.request_generation(request(GenerationMode::Batch, ids)).unwrap();
    pool.spawner().spawn_local(work).unwrap();

    pool.run_until_stalled();
    assert_eq!(backend.call_count(), 2, "two workers");

    backend.release(0);
    backend.release(1);
    pool.run_until_stalled();
    assert_eq!(backend.call_count(), 4);
    composer.pump_job_events();
    assert_eq!(composer.jobs().count(JobStatus::Done), 2);
    assert_eq!(composer.jobs().count(JobStatus::Running), 2);
    assert_eq!(composer.jobs().count(JobStatus::Queued), 1);

    assert_eq!(composer.cancel_generation(), 3);
    backend.release(2);
    backend.release(3);
    pool.run_until_stalled();
    composer.pump_job_events();

    assert_eq!(backend.call_count(), 4, "queued job never reached the backend");
    assert_eq!(composer.jobs().count(JobStatus::Done), 2);
    assert_eq!(composer.jobs().count(JobStatus::Cancelled), 3);
    assert!(layer_with_url(&composer, "out-2").is_none());
    assert!(layer_with_url(&composer, "out-3").is_none());
    assert_eq!(composer.document().store.len(), 7);
    assert_eq!(composer.jobs().active_batches(), 0);
}

#[test]
fn test_loading_a_document_drops_running_jobs() {
    let backend = Arc::new(GatedBackend::default());
    let gallery = Arc::new(MemoryGallery::new());
    let (mut composer, ids) = create_composer(
        backend.clone(),
        gallery.clone(),
        vec![image("in-0", 0.0, 0.0, 100.0, 100.0)],
    );

    let mut pool = LocalPool::new();
    let work = composer.request_generation(request(GenerationMode::Batch, ids)).unwrap();
    pool.spawner().spawn_local(work).unwrap();
    pool.run_until_stalled();
    assert_eq!(backend.call_count(), 1);
    composer.pump_job_events();
    assert_eq!(composer.jobs().count(JobStatus::Running), 1);

    let empty = json!({ "viewId": VIEW_ID, "state": { "layers": [] } }).to_string();
    assert_eq!(composer.load_json(&empty).unwrap(), LoadOutcome::Document);
    assert!(composer.jobs().jobs().is_empty());
    assert_eq!(composer.jobs().active_batches(), 0);

    // The old request finishes after the load
    backend.release(0);
    pool.run_until_stalled();
    composer.pump_job_events();

    assert!(composer.document().store.is_empty());
    assert!(!composer.history().can_undo());
    assert!(composer.jobs().jobs().is_empty());
    assert!(gallery.list_all().is_empty());
}

#[test]
fn test_new_document_forgets_jobs() {
    let (mut composer, ids) = create_composer(
        Arc::new(ScriptedBackend::default()),
        Arc::new(MemoryGallery::new()),
        vec![image("a", 0.0, 0.0, 10.0, 10.0)],
    );
    let work = composer.request_generation(request(GenerationMode::Batch, ids)).unwrap();
    assert!(composer.jobs().is_busy());

    composer.new_document(CanvasSettings::default());
    block_on(work);
    composer.pump_job_events();

    assert!(composer.jobs().jobs().is_empty());
    assert!(composer.document().store.is_empty());
}

#[test]
fn test_settled_batches_release_their_cancel_tokens() {
    let (mut composer, ids) = create_composer(
        Arc::new(ScriptedBackend::default()),
        Arc::new(MemoryGallery::new()),
        vec![image("a", 0.0, 0.0, 10.0, 10.0), image("b", 50.0, 0.0, 10.0, 10.0)],
    );

    for id in &ids {
        let work = composer.request_generation(request(GenerationMode::Batch, vec![*id])).unwrap();
        block_on(work);
    }
    assert_eq!(composer.jobs().active_batches(), 2);

    composer.pump_job_events();
    assert_eq!(composer.jobs().jobs().len(), 2);
    assert!(!composer.jobs().is_busy());
    assert_eq!(composer.jobs().active_batches(), 0);
}

#[test]
fn test_results_wait_for_gesture_to_finish() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut composer, ids) = create_composer(
        backend,
        Arc::new(MemoryGallery::new()),
        vec![image("a", 100.0, 100.0, 100.0, 100.0)],
    );

    let work = composer.request_generation(request(GenerationMode::Batch, ids.clone())).unwrap();
    block_on(work);

    composer.pointer_down(pos2(150.0, 150.0), Modifiers::NONE);
    composer.pointer_move(pos2(160.0, 150.0), Modifiers::NONE);
    assert_eq!(composer.pump_job_events(), 0);
    assert_eq!(composer.jobs().count(JobStatus::Queued), 1);

    composer.pointer_up(pos2(160.0, 150.0), Modifiers::NONE);
    assert_eq!(composer.pump_job_events(), 2);
    assert_eq!(composer.jobs().count(JobStatus::Done), 1);

    // Placed next to where the source ended up
    let placed = layer_with_url(&composer, "a-out").unwrap();
    assert_eq!(placed.position(), pos2(230.0, 100.0));

    assert_eq!(composer.history().undo_len(), 2);
    assert!(composer.undo());
    assert!(layer_with_url(&composer, "a-out").is_none());
    assert_eq!(composer.document().store.get(ids[0]).unwrap().x, 110.0);
}

#[test]
fn test_results_are_stamped_before_insertion() {
    let (composer, ids) = create_composer(
        Arc::new(ScriptedBackend::default()),
        Arc::new(MemoryGallery::new()),
        vec![image("a", 0.0, 0.0, 10.0, 10.0), image("c", 50.0, 0.0, 10.0, 10.0)],
    );
    let mut composer = composer.with_stamp(Arc::new(SuffixStamp));

    let work = composer.request_generation(request(GenerationMode::Batch, ids.clone())).unwrap();
    block_on(work);
    composer.pump_job_events();

    let a = job_for(&composer, ids[0]);
    assert_eq!(a.results, vec![format!("a-out#job{}", a.id)]);
    // A failed stamp keeps the original image
    assert_eq!(job_for(&composer, ids[1]).results, vec!["c-out".to_owned()]);
}

#[test]
fn test_gallery_target_adds_no_layers() {
    let gallery = Arc::new(MemoryGallery::new());
    let (mut composer, ids) = create_composer(
        Arc::new(ScriptedBackend::default()),
        gallery.clone(),
        vec![image("a", 0.0, 0.0, 10.0, 10.0)],
    );

    let mut gallery_request = request(GenerationMode::Batch, ids.clone());
    gallery_request.target = ResultTarget::Gallery;
    block_on(composer.request_generation(gallery_request).unwrap());
    composer.pump_job_events();

    assert_eq!(composer.document().store.len(), 1);
    assert_eq!(gallery.list_all(), vec!["a-out".to_owned()]);
    assert!(!composer.history().can_undo());
}

#[test]
fn test_unavailable_backend_reports_error() {
    let (mut composer, ids) = create_composer(
        Arc::new(UnavailableBackend),
        Arc::new(MemoryGallery::new()),
        vec![image("a", 0.0, 0.0, 10.0, 10.0)],
    );

    block_on(composer.request_generation(request(GenerationMode::Batch, ids.clone())).unwrap());
    composer.pump_job_events();

    let job = job_for(&composer, ids[0]);
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("No generation backend is configured"));
}

#[test]
fn test_orchestrator_event_stream() {
    let mut store = LayerStore::new();
    let a = store.add(image("a", 0.0, 0.0, 10.0, 10.0));
    let b = store.add(image("b", 50.0, 0.0, 10.0, 10.0));
    let orchestrator = GenerationOrchestrator::new(Arc::new(ScriptedBackend::default()), 1);

    let batch = orchestrator.prepare(&request(GenerationMode::Batch, vec![a, b]), &store, &SourceImageRasterizer);
    assert_eq!(batch.jobs.len(), 2);
    assert_eq!(batch.work.len(), 2);
    let (job_a, job_b) = (batch.jobs[0].id, batch.jobs[1].id);

    let (tx, mut rx) = mpsc::unbounded();
    block_on(orchestrator.run(batch.work, GenerationOptions::default(), CancelToken::new(), tx));

    let mut events = Vec::new();
    while let Ok(Some(event)) = rx.try_next() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            JobEvent::Started { job: job_a },
            JobEvent::Finished { job: job_a, outcome: Ok(vec!["a-out".to_owned()]) },
            JobEvent::Started { job: job_b },
            JobEvent::Finished { job: job_b, outcome: Err("Quota exceeded for b".to_owned()) },
        ]
    );
}

#[test]
fn test_cancelled_before_start_never_calls_backend() {
    let backend = Arc::new(ScriptedBackend::default());
    let mut store = LayerStore::new();
    let a = store.add(image("a", 0.0, 0.0, 10.0, 10.0));
    let orchestrator = GenerationOrchestrator::new(backend.clone(), 2);
    let batch = orchestrator.prepare(&request(GenerationMode::Batch, vec![a]), &store, &SourceImageRasterizer);
    let job = batch.jobs[0].id;

    let cancel = CancelToken::new();
    cancel.cancel();
    let (tx, mut rx) = mpsc::unbounded();
    block_on(orchestrator.run(batch.work, GenerationOptions::default(), cancel, tx));

    assert!(backend.calls().is_empty());
    assert_eq!(rx.try_next().unwrap(), Some(JobEvent::Cancelled { job }));
}
