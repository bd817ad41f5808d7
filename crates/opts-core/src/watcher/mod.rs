//! Watcher: rebuilds the provider snapshot when config files change
//!
//! Change events are debounced on a worker thread. Each burst triggers one
//! rebuild, serialized with any other rebuild. A successful rebuild swaps
//! the snapshot, invalidates registered caches and notifies listeners; a
//! failed one is logged and the previous snapshot keeps being served.

mod source;

pub use source::{ChangeSource, EventSink, ManualChangeSource, NotifyChangeSource, WatchMessage};

use crate::builder::{BuildPlan, OptionsProviderBuilder};
use crate::cache::Invalidate;
use crate::provider::{FeatureMetadataMap, OptionsRegistry, ProviderState};
use crate::templating::TemplateEngine;
use crate::validation::FeatureValidator;
use crate::{Error, Result};
use arc_swap::ArcSwap;
use opts_fs::{NormalizedPath, OptsPath, is_recognized_extension};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

/// Default quiet period before a burst of changes triggers a rebuild.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Settings for the watcher's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSettings {
    /// Quiet period that ends a burst of change events
    pub debounce: Duration,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Identifies a registered change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&Arc<ProviderState>, &BTreeSet<PathBuf>) + Send + Sync>;

struct Shared {
    plan: BuildPlan,
    state: ArcSwap<ProviderState>,
    /// Held for the whole rebuild, including listener notification
    rebuild_lock: Mutex<()>,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    caches: Mutex<Vec<Arc<dyn Invalidate>>>,
    /// Metadata view and the generation it was computed for
    metadata: Mutex<Option<(u64, Arc<FeatureMetadataMap>)>>,
}

impl Shared {
    fn rebuild(&self, changed: &BTreeSet<PathBuf>) -> Result<Arc<ProviderState>> {
        let _guard = self.rebuild_lock.lock();
        let previous = self.state.load_full();

        let state = match self.plan.build(Some(previous.last_modified())) {
            Ok(state) => Arc::new(state),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    generation = previous.generation(),
                    "Rebuild failed; keeping the previous options"
                );
                return Err(e);
            }
        };

        self.state.store(Arc::clone(&state));
        for cache in self.caches.lock().iter() {
            cache.invalidate(state.generation());
        }
        tracing::info!(
            generation = state.generation(),
            changed = changed.len(),
            "Rebuilt options"
        );

        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&state, changed);
        }
        Ok(state)
    }
}

/// Builds an [`OptionsWatcher`].
pub struct OptionsWatcherBuilder {
    provider: OptionsProviderBuilder,
    settings: WatcherSettings,
    source: Option<Box<dyn ChangeSource>>,
}

impl OptionsWatcherBuilder {
    pub fn new() -> Self {
        Self {
            provider: OptionsProviderBuilder::new(),
            settings: WatcherSettings::default(),
            source: None,
        }
    }

    /// Register a config root to load and watch.
    pub fn add_directory(mut self, root: impl Into<NormalizedPath>) -> Result<Self> {
        self.provider = self.provider.add_directory(root)?;
        Ok(self)
    }

    pub fn with_validator(mut self, validator: Arc<dyn FeatureValidator>) -> Self {
        self.provider = self.provider.with_validator(validator);
        self
    }

    pub fn with_template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.provider = self.provider.with_template_engine(engine);
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.settings.debounce = debounce;
        self
    }

    /// Receive changes from `source` instead of native filesystem events.
    pub fn with_change_source(mut self, source: impl ChangeSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Load every root, subscribe to changes and start the worker thread.
    pub fn build(self) -> Result<OptionsWatcher> {
        let plan = self.provider.into_plan()?;
        let state = plan.build(None)?;
        let (sender, receiver) = mpsc::channel();

        let shared = Arc::new(Shared {
            plan,
            state: ArcSwap::from_pointee(state),
            rebuild_lock: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            caches: Mutex::new(Vec::new()),
            metadata: Mutex::new(None),
        });

        let mut source = self
            .source
            .unwrap_or_else(|| Box::new(NotifyChangeSource::new()));
        source.subscribe(shared.plan.roots(), EventSink::new(sender.clone()))?;

        let worker_shared = Arc::clone(&shared);
        let debounce = self.settings.debounce;
        let spawned = thread::Builder::new()
            .name("opts-watcher".into())
            .spawn(move || run_worker(&worker_shared, &receiver, debounce));
        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                source.unsubscribe();
                return Err(Error::Watch {
                    message: format!("failed to start watcher thread: {e}"),
                });
            }
        };

        tracing::info!(roots = shared.plan.roots().len(), "Watching config roots");
        Ok(OptionsWatcher {
            shared,
            source: Mutex::new(source),
            control: sender,
            worker: Some(worker),
        })
    }
}

impl Default for OptionsWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An options registry that follows changes to its config roots.
///
/// Readers always see a complete snapshot; a rebuild in progress does not
/// block them.
pub struct OptionsWatcher {
    shared: Arc<Shared>,
    source: Mutex<Box<dyn ChangeSource>>,
    control: Sender<WatchMessage>,
    worker: Option<JoinHandle<()>>,
}

impl OptionsWatcher {
    pub fn builder() -> OptionsWatcherBuilder {
        OptionsWatcherBuilder::new()
    }

    /// When the current snapshot was built. Only advances on successful
    /// rebuilds.
    pub fn last_modified(&self) -> SystemTime {
        self.shared.state.load().last_modified()
    }

    pub fn roots(&self) -> &[NormalizedPath] {
        self.shared.plan.roots()
    }

    /// Call `listener` after every successful rebuild with the new snapshot
    /// and the changed paths.
    ///
    /// Listeners run on the rebuilding thread while the rebuild lock is held,
    /// so they must not call [`OptionsWatcher::reload`].
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Arc<ProviderState>, &BTreeSet<PathBuf>) + Send + Sync + 'static,
    {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        self.shared.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.shared.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Clear `cache` after every successful rebuild.
    pub fn register_cache(&self, cache: Arc<dyn Invalidate>) {
        self.shared.caches.lock().push(cache);
    }

    /// Rebuild now, outside the change-event path.
    pub fn reload(&self) -> Result<()> {
        self.shared.rebuild(&BTreeSet::new()).map(|_| ())
    }
}

impl OptionsRegistry for OptionsWatcher {
    fn state(&self) -> Arc<ProviderState> {
        self.shared.state.load_full()
    }

    fn features_with_metadata(&self) -> Arc<FeatureMetadataMap> {
        let state = self.state();
        let mut cached = self.shared.metadata.lock();
        if let Some((generation, metadata)) = cached.as_ref() {
            if *generation == state.generation() {
                return Arc::clone(metadata);
            }
        }
        let metadata = Arc::new(state.metadata());
        *cached = Some((state.generation(), Arc::clone(&metadata)));
        metadata
    }
}

impl Drop for OptionsWatcher {
    fn drop(&mut self) {
        self.source.lock().unsubscribe();
        let _ = self.control.send(WatchMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Watcher thread panicked");
            }
        }
        tracing::debug!("Stopped watching config roots");
    }
}

impl std::fmt::Debug for OptionsWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsWatcher")
            .field("roots", &self.roots())
            .field("state", &self.shared.state.load_full())
            .finish_non_exhaustive()
    }
}

/// Whether a changed path can affect the features loaded from `roots`.
///
/// Only components below the containing root are checked for the metadata
/// dir, so a root may itself live under a directory named `.opts`.
pub fn is_relevant_change(roots: &[NormalizedPath], path: &Path) -> bool {
    let recognized = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_recognized_extension);
    if !recognized {
        return false;
    }

    let normalized = NormalizedPath::new(path);
    let in_metadata_dir = match roots.iter().find_map(|root| normalized.relative_to(root)) {
        Some(relative) => relative
            .components()
            .any(|c| c == OptsPath::MetadataDir.as_str()),
        None => path.components().any(
            |c| matches!(c, Component::Normal(name) if name == OptsPath::MetadataDir.as_str()),
        ),
    };
    !in_metadata_dir
}

fn run_worker(shared: &Shared, receiver: &Receiver<WatchMessage>, debounce: Duration) {
    let roots = shared.plan.roots();
    loop {
        let mut changed = BTreeSet::new();
        match receiver.recv() {
            Ok(WatchMessage::Changed(paths)) => collect_relevant(roots, &mut changed, paths),
            Ok(WatchMessage::Shutdown) | Err(_) => return,
        }
        if changed.is_empty() {
            continue;
        }

        let mut stop = false;
        loop {
            match receiver.recv_timeout(debounce) {
                Ok(WatchMessage::Changed(paths)) => collect_relevant(roots, &mut changed, paths),
                Ok(WatchMessage::Shutdown) => return,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    stop = true;
                    break;
                }
            }
        }

        tracing::debug!(changed = changed.len(), "Config files changed");
        // Failures are logged by `rebuild`; the previous snapshot stays.
        let _ = shared.rebuild(&changed);
        if stop {
            return;
        }
    }
}

fn collect_relevant(
    roots: &[NormalizedPath],
    changed: &mut BTreeSet<PathBuf>,
    paths: Vec<PathBuf>,
) {
    for path in paths {
        if is_relevant_change(roots, &path) {
            changed.insert(path);
        } else {
            tracing::trace!(path = %path.display(), "Ignoring change");
        }
    }
}
