use crate::config::MirrorConfig;
use crate::error::{EngineError, Result};
use crate::revision::{Revision, Status};
use pwned_dataset::{control, dataset_dir, ensure_empty_dir, remove_dataset_best_effort, DatasetId};
use pwned_prefix::{index_to_prefix, normalize_prefix, PWNED_PREFIX_CAPACITY};
use pwned_provider::RangeProvider;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    Done,
    Failed,
    Irrelevant,
}

/// First-writer-wins failure sink shared by all workers of one `update()`
/// attempt, doubling as the cooperative cancellation signal: reporting an
/// error requests every worker still iterating to stop at its next loop
/// boundary.
#[derive(Default)]
struct FailureSink {
    first_error: Mutex<Option<String>>,
    cancel_requested: AtomicBool,
}

impl FailureSink {
    fn report(&self, error: impl Into<String>) {
        let mut guard = self.first_error.lock().unwrap();
        if guard.is_none() {
            *guard = Some(error.into());
        }
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    fn take(&self) -> Option<String> {
        self.first_error.lock().unwrap().take()
    }
}

/// Guarantees the sink records *something* on every exit path out of a
/// worker, the Rust analogue of the original's scoped revision-step context
/// manager: call [`RevisionFailureGuard::finish`] on every explicit return;
/// the `Drop` fallback only fires if a worker exits without doing so (e.g. a
/// panic unwinding through it).
struct RevisionFailureGuard {
    sink: Arc<FailureSink>,
    finished: bool,
}

impl RevisionFailureGuard {
    fn new(sink: Arc<FailureSink>) -> Self {
        Self {
            sink,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for RevisionFailureGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.sink.report(EngineError::Cancelled.to_string());
        }
    }
}

/// Orchestrates the concurrent fetch pool, the atomic dataset swap, and
/// reader lookups against the currently active dataset.
pub struct MirrorEngine {
    config: MirrorConfig,
    provider: Arc<dyn RangeProvider>,
    revision: Arc<Mutex<Revision>>,
    active_dataset: Arc<Mutex<Option<DatasetId>>>,
    active_reader_count: Arc<AtomicUsize>,
    prepared_count: Arc<AtomicUsize>,
    current_sink: Arc<Mutex<Option<Arc<FailureSink>>>>,
}

impl MirrorEngine {
    /// Builds an engine over `config`, loading whatever active dataset the
    /// control file names (or "none" if missing/unparseable/torn).
    pub async fn new(config: MirrorConfig, provider: Arc<dyn RangeProvider>) -> Self {
        tokio::fs::create_dir_all(&config.resource_dir)
            .await
            .ok();
        let active = control::load_active_dataset(&config.resource_dir).await;
        let active = match active {
            Some(id) if dataset_dir(&config.resource_dir, id).is_dir() => Some(id),
            _ => None,
        };
        Self {
            config,
            provider,
            revision: Arc::new(Mutex::new(Revision::default())),
            active_dataset: Arc::new(Mutex::new(active)),
            active_reader_count: Arc::new(AtomicUsize::new(0)),
            prepared_count: Arc::new(AtomicUsize::new(0)),
            current_sink: Arc::new(Mutex::new(None)),
        }
    }

    pub fn revision(&self) -> Revision {
        self.revision.lock().unwrap().clone()
    }

    pub fn prepared_count(&self) -> usize {
        self.prepared_count.load(Ordering::SeqCst)
    }

    /// Requests cancellation of an in-progress `update()`. A no-op if no
    /// update is running. Optional per the spec's cancellation Open
    /// Question; when it takes effect the revision surfaces FAILED with a
    /// `Cancelled` error.
    pub fn cancel(&self) {
        if let Some(sink) = self.current_sink.lock().unwrap().as_ref() {
            sink.report(EngineError::Cancelled.to_string());
        }
    }

    /// Starts a mirror update if the revision is idle; otherwise a no-op
    /// reported as [`UpdateResult::Irrelevant`].
    pub async fn update(&self) -> UpdateResult {
        {
            let mut revision = self.revision.lock().unwrap();
            if !revision.is_idle() {
                return UpdateResult::Irrelevant;
            }
            revision.indicate_started();
        }
        log::info!("mirror update started");

        let active = *self.active_dataset.lock().unwrap();
        let new_dataset = active.unwrap_or(DatasetId::B).other();
        let new_dir = dataset_dir(&self.config.resource_dir, new_dataset);

        if let Err(e) = ensure_empty_dir(&new_dir).await {
            return self.fail(EngineError::from(e)).await;
        }

        self.prepared_count.store(0, Ordering::SeqCst);
        let sink = Arc::new(FailureSink::default());
        *self.current_sink.lock().unwrap() = Some(sink.clone());

        self.run_workers(&new_dir, sink.clone()).await;

        *self.current_sink.lock().unwrap() = None;

        if let Some(error) = sink.take() {
            log::warn!("mirror update failed: {error}");
            remove_dataset_best_effort(&new_dir).await;
            self.revision.lock().unwrap().indicate_failed(error);
            return UpdateResult::Failed;
        }

        self.revision.lock().unwrap().indicate_prepared();
        log::info!("mirror prepared, waiting for in-flight readers to drain");
        while self.active_reader_count.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        if let Err(e) = control::write_control_file(&self.config.resource_dir, None, true).await {
            return self.fail(EngineError::from(e)).await;
        }
        *self.active_dataset.lock().unwrap() = Some(new_dataset);
        if let Err(e) =
            control::write_control_file(&self.config.resource_dir, Some(new_dataset), false).await
        {
            return self.fail(EngineError::from(e)).await;
        }
        self.revision.lock().unwrap().indicate_transited();
        log::info!("swapped active dataset to {}", new_dataset.tag());

        if let Some(old) = active {
            remove_dataset_best_effort(&dataset_dir(&self.config.resource_dir, old)).await;
        }
        self.revision.lock().unwrap().indicate_completed();
        log::info!("mirror update completed");
        UpdateResult::Done
    }

    async fn fail(&self, error: EngineError) -> UpdateResult {
        log::error!("mirror update failed: {error}");
        self.revision.lock().unwrap().indicate_failed(error.to_string());
        *self.current_sink.lock().unwrap() = None;
        UpdateResult::Failed
    }

    async fn run_workers(&self, new_dir: &PathBuf, sink: Arc<FailureSink>) {
        let worker_count = self.config.workers.clamp(1, crate::config::MAX_WORKERS);
        let capacity = PWNED_PREFIX_CAPACITY;
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let mut handles = Vec::with_capacity(worker_count);
                for worker in 0..worker_count {
                    let start = worker * capacity / worker_count;
                    let end = (worker + 1) * capacity / worker_count;
                    let provider = self.provider.clone();
                    let sink = sink.clone();
                    let prepared_count = self.prepared_count.clone();
                    let revision = self.revision.clone();
                    let dir = new_dir.clone();
                    #[cfg(feature = "binary-layout")]
                    let binary_layout = self.config.binary_layout;
                    handles.push(tokio::task::spawn_local(async move {
                        run_worker(
                            start,
                            end,
                            capacity,
                            provider,
                            dir,
                            #[cfg(feature = "binary-layout")]
                            binary_layout,
                            prepared_count,
                            revision,
                            sink,
                        )
                        .await;
                    }));
                }
                for handle in handles {
                    let _ = handle.await;
                }
            })
            .await;
    }

    /// Reader: returns the range body for a 5-hex prefix against the
    /// currently active dataset.
    pub async fn get_range(&self, prefix: &str) -> Result<String> {
        let prefix = normalize_prefix(prefix)?;

        loop {
            let transiting = self.revision.lock().unwrap().status() == Status::Transition;
            if !transiting {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        self.active_reader_count.fetch_add(1, Ordering::SeqCst);
        let result = self.read_active(&prefix).await;
        self.active_reader_count.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn read_active(&self, prefix: &str) -> Result<String> {
        let active = *self.active_dataset.lock().unwrap();
        let Some(id) = active else {
            return Err(EngineError::NotInitialized);
        };
        let dir = dataset_dir(&self.config.resource_dir, id);

        #[cfg(feature = "binary-layout")]
        if let Some(layout) = self.config.binary_layout {
            let codec = pwned_record::binary::RecordCodec::new(
                layout.file_code_length,
                layout.count_byte_width,
            );
            return Ok(pwned_dataset::group::read_prefix(&dir, &codec, prefix)
                .await
                .map_err(EngineError::from)?);
        }

        Ok(pwned_dataset::text::read_prefix(&dir, prefix)
            .await
            .map_err(EngineError::from)?)
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_worker(
    start: usize,
    end: usize,
    capacity: usize,
    provider: Arc<dyn RangeProvider>,
    dir: PathBuf,
    #[cfg(feature = "binary-layout")] binary_layout: Option<crate::config::BinaryLayoutConfig>,
    prepared_count: Arc<AtomicUsize>,
    revision: Arc<Mutex<Revision>>,
    sink: Arc<FailureSink>,
) {
    let scope = RevisionFailureGuard::new(sink.clone());

    #[cfg(feature = "binary-layout")]
    let mut binary_writer = binary_layout.map(|layout| {
        let codec = pwned_record::binary::RecordCodec::new(
            layout.file_code_length,
            layout.count_byte_width,
        );
        pwned_dataset::group::GroupDatasetWriter::new(dir.clone(), codec)
    });

    for index in start..end {
        if sink.is_cancelled() {
            break;
        }
        let prefix = match index_to_prefix(index, capacity) {
            Ok(p) => p,
            Err(e) => {
                sink.report(EngineError::from(e).to_string());
                break;
            }
        };
        let range_text = match provider.get_range(&prefix).await {
            Ok(text) => text,
            Err(e) => {
                sink.report(EngineError::from(e).to_string());
                break;
            }
        };

        #[cfg(feature = "binary-layout")]
        let write_result = if let Some(writer) = binary_writer.as_mut() {
            match pwned_record::parse_range_text(&range_text) {
                Ok(records) => writer.write_prefix(&prefix, &records).await.map_err(EngineError::from),
                Err(e) => Err(EngineError::from(e)),
            }
        } else {
            pwned_dataset::text::write_prefix(&dir, &prefix, &range_text)
                .await
                .map_err(EngineError::from)
        };
        #[cfg(not(feature = "binary-layout"))]
        let write_result = pwned_dataset::text::write_prefix(&dir, &prefix, &range_text)
            .await
            .map_err(EngineError::from);

        if let Err(e) = write_result {
            sink.report(e.to_string());
            break;
        }

        let prepared = prepared_count.fetch_add(1, Ordering::SeqCst) + 1;
        let progress = (100 * prepared / capacity) as u8;
        revision.lock().unwrap().set_progress(progress);
    }

    #[cfg(feature = "binary-layout")]
    if let Some(mut writer) = binary_writer {
        if let Err(e) = writer.flush().await {
            sink.report(EngineError::from(e).to_string());
        }
    }

    scope.finish();
}
