//! Change sources feeding the watcher

use crate::{Error, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use opts_fs::NormalizedPath;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;

/// Message delivered to the watcher's worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchMessage {
    /// Files were created, modified or removed
    Changed(Vec<PathBuf>),
    /// Stop the worker
    Shutdown,
}

/// Handle a change source uses to report changed paths.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Sender<WatchMessage>,
}

impl EventSink {
    pub(crate) fn new(sender: Sender<WatchMessage>) -> Self {
        Self { sender }
    }

    /// Report changed paths. Returns `false` once the watcher is gone.
    pub fn changed(&self, paths: Vec<PathBuf>) -> bool {
        self.sender.send(WatchMessage::Changed(paths)).is_ok()
    }
}

/// Something that reports file changes under a set of roots.
pub trait ChangeSource: Send {
    /// Start reporting changes under `roots` to `sink`.
    fn subscribe(&mut self, roots: &[NormalizedPath], sink: EventSink) -> Result<()>;

    /// Stop reporting changes.
    fn unsubscribe(&mut self);
}

/// Native filesystem events through `notify`.
#[derive(Default)]
pub struct NotifyChangeSource {
    watcher: Option<RecommendedWatcher>,
}

impl NotifyChangeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeSource for NotifyChangeSource {
    fn subscribe(&mut self, roots: &[NormalizedPath], sink: EventSink) -> Result<()> {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove() {
                        sink.changed(event.paths);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "File watch error"),
            },
            Config::default(),
        )
        .map_err(|e| Error::Watch {
            message: e.to_string(),
        })?;

        for root in roots {
            watcher
                .watch(&root.to_native(), RecursiveMode::Recursive)
                .map_err(|e| Error::Watch {
                    message: format!("failed to watch {root}: {e}"),
                })?;
        }

        self.watcher = Some(watcher);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.watcher = None;
    }
}

/// Change source driven by hand, for tests and embedders with their own
/// notification mechanism.
///
/// Clones share the same subscription: keep one clone and give another to
/// the watcher.
#[derive(Debug, Clone, Default)]
pub struct ManualChangeSource {
    sink: Arc<Mutex<Option<EventSink>>>,
}

impl ManualChangeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report changed paths. Returns `false` when nothing is subscribed.
    pub fn trigger<I, P>(&self, paths: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        match self.sink.lock().as_ref() {
            Some(sink) => sink.changed(paths.into_iter().map(Into::into).collect()),
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.sink.lock().is_some()
    }
}

impl ChangeSource for ManualChangeSource {
    fn subscribe(&mut self, _roots: &[NormalizedPath], sink: EventSink) -> Result<()> {
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        *self.sink.lock() = None;
    }
}
