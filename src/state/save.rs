//! Save coordination.
//!
//! A save is two-phase. [`SaveCoordinator::request`] reads the shape store
//! and serializes the full shape list immediately, so the payload is a
//! consistent snapshot even if the store is cleared right afterwards. The
//! host writes the payload however it likes and reports back through
//! [`SaveCoordinator::complete`].
//!
//! At most one write per annotation file is in flight. A trigger arriving
//! while one is pending is queued (latest snapshot wins) and handed out when
//! the pending write completes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use web_time::Instant;

use crate::constants::DEFAULT_SAVE_STATUS_MS;
use crate::format::{AnnotationCodec, AnnotationDocument, ImageMeta};
use crate::model::ShapeKey;
use crate::persistence::PersistenceError;
use crate::state::shape_store::ShapeStore;

/// What caused a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    Explicit,
    ImageSwitch,
    Teardown,
}

/// Identifies one dispatched write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SaveTicket(u64);

/// A serialized payload ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub ticket: SaveTicket,
    pub image: String,
    pub path: PathBuf,
    pub content: String,
    pub trigger: SaveTrigger,
}

/// Indicator state shown next to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed,
}

/// Result of a completed write.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Written to disk. `current` is true if the image is still the one loaded.
    Saved {
        image: String,
        path: PathBuf,
        content: String,
        current: bool,
    },
    /// Write failed; pending changes are kept.
    Failed {
        image: String,
        path: PathBuf,
        error: String,
    },
    /// The ticket did not belong to a pending write.
    Unknown,
}

#[derive(Debug)]
pub struct SaveCompletion {
    pub outcome: SaveOutcome,
    /// Queued follow-up write for the same file, now in flight
    pub next: Option<SaveRequest>,
}

/// Everything a save needs to read.
pub struct SaveSource<'a> {
    pub store: &'a ShapeStore,
    pub codec: &'a dyn AnnotationCodec,
    pub baseline: Option<&'a AnnotationDocument>,
    pub meta: &'a ImageMeta,
    pub image: &'a str,
    pub path: Option<&'a Path>,
}

#[derive(Debug, Clone)]
struct Snapshot {
    image: String,
    path: PathBuf,
    content: String,
    trigger: SaveTrigger,
    revision: u64,
    generation: u64,
    keys: Vec<ShapeKey>,
}

#[derive(Debug)]
struct InFlight {
    ticket: SaveTicket,
    snapshot: Snapshot,
}

#[derive(Debug)]
pub struct SaveCoordinator {
    in_flight: Vec<InFlight>,
    queued: HashMap<PathBuf, Snapshot>,
    /// Failed writes for images that are no longer loaded
    retry: Vec<Snapshot>,
    next_ticket: u64,
    status: SaveStatus,
    status_since: Option<Instant>,
    status_duration: Duration,
}

impl SaveCoordinator {
    pub fn new() -> Self {
        Self {
            in_flight: Vec::new(),
            queued: HashMap::new(),
            retry: Vec::new(),
            next_ticket: 1,
            status: SaveStatus::Idle,
            status_since: None,
            status_duration: Duration::from_millis(DEFAULT_SAVE_STATUS_MS),
        }
    }

    /// How long `Saved`/`Failed` stays visible before reverting to `Idle`.
    pub fn with_status_duration(mut self, duration: Duration) -> Self {
        self.status_duration = duration;
        self
    }

    /// Snapshot and serialize the store for writing.
    ///
    /// Returns `Ok(None)` when there is nothing to save or the payload was
    /// queued behind a write already in flight for the same file.
    pub fn request(
        &mut self,
        trigger: SaveTrigger,
        source: SaveSource<'_>,
        now: Instant,
    ) -> Result<Option<SaveRequest>, PersistenceError> {
        let store = source.store;
        if !store.has_unsaved_changes() {
            log::debug!("Save ({:?}) skipped: no unsaved changes", trigger);
            return Ok(None);
        }
        let path = source.path.ok_or_else(|| PersistenceError::NoAnnotationPath {
            image: source.image.to_string(),
        })?;

        let revision = store.revision();
        let generation = store.generation();
        if self.in_flight.iter().any(|f| {
            f.snapshot.path == path
                && f.snapshot.generation == generation
                && f.snapshot.revision >= revision
        }) {
            log::debug!("Save ({:?}) skipped: same revision already in flight", trigger);
            return Ok(None);
        }

        let content = source
            .codec
            .serialize(store.shapes(), source.baseline, source.meta)
            .inspect_err(|e| {
                log::warn!("Failed to serialize annotations for {}: {}", source.image, e)
            })?;
        let snapshot = Snapshot {
            image: source.image.to_string(),
            path: path.to_path_buf(),
            content,
            trigger,
            revision,
            generation,
            keys: store.keys(),
        };

        if self.in_flight.iter().any(|f| f.snapshot.path == path) {
            log::debug!("Save ({:?}) queued behind pending write to {:?}", trigger, path);
            self.queued.insert(snapshot.path.clone(), snapshot);
            return Ok(None);
        }
        Ok(Some(self.dispatch(snapshot, now)))
    }

    fn dispatch(&mut self, snapshot: Snapshot, now: Instant) -> SaveRequest {
        let ticket = SaveTicket(self.next_ticket);
        self.next_ticket += 1;
        self.set_status(SaveStatus::Saving, now);
        log::info!(
            "Saving {} ({} shapes, {:?}) to {:?}",
            snapshot.image,
            snapshot.keys.len(),
            snapshot.trigger,
            snapshot.path
        );

        let request = SaveRequest {
            ticket,
            image: snapshot.image.clone(),
            path: snapshot.path.clone(),
            content: snapshot.content.clone(),
            trigger: snapshot.trigger,
        };
        self.in_flight.push(InFlight { ticket, snapshot });
        request
    }

    /// Report the result of a dispatched write.
    ///
    /// On success the store's dirty entries up to the snapshot revision are
    /// cleared, provided the same image is still loaded. On failure the
    /// store is left untouched.
    pub fn complete(
        &mut self,
        ticket: SaveTicket,
        result: Result<(), PersistenceError>,
        store: &mut ShapeStore,
        now: Instant,
    ) -> SaveCompletion {
        let Some(pos) = self.in_flight.iter().position(|f| f.ticket == ticket) else {
            log::warn!("Completion for unknown save ticket {:?}", ticket);
            return SaveCompletion {
                outcome: SaveOutcome::Unknown,
                next: None,
            };
        };
        let InFlight { snapshot, .. } = self.in_flight.remove(pos);
        let current = snapshot.generation == store.generation();

        let outcome = match result {
            Ok(()) => {
                if current {
                    store.mark_saved(snapshot.revision);
                    store.rebase_origins(&snapshot.keys);
                }
                self.set_status(SaveStatus::Saved, now);
                log::info!("Saved annotations for {} to {:?}", snapshot.image, snapshot.path);
                SaveOutcome::Saved {
                    image: snapshot.image,
                    path: snapshot.path.clone(),
                    content: snapshot.content,
                    current,
                }
            }
            Err(e) => {
                self.set_status(SaveStatus::Failed, now);
                log::warn!("Failed to save {} to {:?}: {}", snapshot.image, snapshot.path, e);
                let failed = SaveOutcome::Failed {
                    image: snapshot.image.clone(),
                    path: snapshot.path.clone(),
                    error: e.to_string(),
                };
                if !current && !self.queued.contains_key(&snapshot.path) {
                    self.retry.push(snapshot.clone());
                }
                failed
            }
        };

        let path = match &outcome {
            SaveOutcome::Saved { path, .. } | SaveOutcome::Failed { path, .. } => path.clone(),
            SaveOutcome::Unknown => PathBuf::new(),
        };
        let next = self
            .queued
            .remove(&path)
            .map(|queued| self.dispatch(queued, now));
        SaveCompletion { outcome, next }
    }

    /// Re-dispatch failed writes of images that were switched away from.
    pub fn retry_failed(&mut self, now: Instant) -> Vec<SaveRequest> {
        let pending = std::mem::take(&mut self.retry);
        let mut requests = Vec::new();
        for snapshot in pending {
            if self.in_flight.iter().any(|f| f.snapshot.path == snapshot.path) {
                self.queued
                    .entry(snapshot.path.clone())
                    .or_insert(snapshot);
            } else {
                requests.push(self.dispatch(snapshot, now));
            }
        }
        requests
    }

    fn set_status(&mut self, status: SaveStatus, now: Instant) {
        self.status = status;
        self.status_since = Some(now);
    }

    /// Indicator state at `now`.
    pub fn status(&self, now: Instant) -> SaveStatus {
        if !self.in_flight.is_empty() {
            return SaveStatus::Saving;
        }
        match (self.status, self.status_since) {
            (SaveStatus::Saved | SaveStatus::Failed, Some(since))
                if now.saturating_duration_since(since) < self.status_duration =>
            {
                self.status
            }
            _ => SaveStatus::Idle,
        }
    }

    pub fn is_saving(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Writes in flight, queued or waiting for a retry.
    pub fn pending_count(&self) -> usize {
        self.in_flight.len() + self.queued.len() + self.retry.len()
    }
}

impl Default for SaveCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
