use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::thread;

use dashmap::DashMap;

use crate::label::{LabelSink, ThreadNameSink};

/// Opaque identity of a worker, unique per concurrently-active unit of work.
pub type WorkerId = u64;

/// Derive a worker id for the calling thread.
#[must_use]
pub fn current_worker() -> WorkerId {
  let mut hasher = DefaultHasher::new();
  thread::current().id().hash(&mut hasher);
  hasher.finish()
}

/// Labels tracked for one in-flight unit of work.
///
/// A record is written only by its owning worker; other threads only read it
/// through [`ActivityRegistry::snapshot`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WorkRecord {
  pub current_label: String,
  pub original_label: String,
}

/// Tracks which unit of work is executing on which worker.
///
/// One registry instance is meant to live for the whole process and be shared
/// by every tracked handler; construct it explicitly and pass it where it is
/// needed rather than relying on ambient global state. `begin`/`end` are
/// called by each worker for itself only, while `snapshot`/`count` may run
/// concurrently from any thread without blocking the writers.
#[derive(Debug)]
pub struct ActivityRegistry {
  sink: Box<dyn LabelSink>,
  workers: DashMap<WorkerId, WorkRecord>,
}

impl Default for ActivityRegistry {
  fn default() -> Self {
    Self::with_sink(Box::new(ThreadNameSink))
  }
}

impl ActivityRegistry {
  /// Register a worker under its original display label.
  ///
  /// A second `begin` for the same worker before `end` overwrites the
  /// record; pairing calls correctly is the caller's contract.
  pub fn begin(&self, worker: WorkerId, original_label: impl Into<String>) {
    let original_label = original_label.into();

    self.workers.insert(
      worker,
      WorkRecord {
        current_label: original_label.clone(),
        original_label,
      },
    );
  }

  /// Number of currently tracked workers, suitable for gauge export.
  #[must_use]
  pub fn count(&self) -> usize {
    self.workers.len()
  }

  /// Unregister a worker and restore its original display label.
  ///
  /// Restoration is best-effort; a denied relabel is discarded. Unknown
  /// workers are ignored.
  pub fn end(&self, worker: WorkerId) {
    if let Some((_, record)) = self.workers.remove(&worker) {
      // Denial is the sink's documented non-fatal outcome.
      let _ = self.sink.apply(&record.original_label);
    }
  }

  /// Register a worker and return a guard that unregisters it when dropped,
  /// on every exit path including panics.
  #[must_use]
  pub fn enter(
    &self,
    worker: WorkerId,
    original_label: impl Into<String>,
  ) -> ActivityGuard<'_> {
    self.begin(worker, original_label);

    ActivityGuard {
      registry: self,
      worker,
    }
  }

  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Best-effort change of a worker's visible display label.
  ///
  /// The record is updated when the worker is tracked; the OS-level relabel
  /// may be denied and the denial is discarded. Missing workers are ignored
  /// silently, the unit of work proceeds regardless.
  pub fn set_display(&self, worker: WorkerId, new_label: impl Into<String>) {
    let new_label = new_label.into();

    if let Some(mut record) = self.workers.get_mut(&worker) {
      record.current_label = new_label.clone();
    }

    let _ = self.sink.apply(&new_label);
  }

  /// Live view of in-flight work, original label mapped to current label.
  ///
  /// Entries whose current label already equals the original are excluded:
  /// a worker restored between the read and the iteration simply no longer
  /// shows up. The snapshot is eventually consistent, not a consistent cut,
  /// and never blocks `begin`/`end` callers.
  #[must_use]
  pub fn snapshot(&self) -> HashMap<String, String> {
    let mut entries = HashMap::with_capacity(self.workers.len());

    for record in self.workers.iter() {
      if record.current_label != record.original_label {
        entries.insert(
          record.original_label.clone(),
          record.current_label.clone(),
        );
      }
    }

    entries
  }

  #[must_use]
  pub fn with_sink(sink: Box<dyn LabelSink>) -> Self {
    Self {
      sink,
      workers: DashMap::new(),
    }
  }
}

/// Scoped registration of one unit of work.
///
/// Dropping the guard unregisters the worker and restores its original
/// display label, whether the work completed normally or unwound.
#[derive(Debug)]
pub struct ActivityGuard<'a> {
  registry: &'a ActivityRegistry,
  worker: WorkerId,
}

impl ActivityGuard<'_> {
  /// Best-effort relabel of the guarded worker.
  pub fn set_display(&self, new_label: impl Into<String>) {
    self.registry.set_display(self.worker, new_label);
  }

  #[must_use]
  pub fn worker(&self) -> WorkerId {
    self.worker
  }
}

impl Drop for ActivityGuard<'_> {
  fn drop(&mut self) {
    self.registry.end(self.worker);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::label::{LabelDenied, NoopLabelSink};

  /// Sink that records every label it is asked to apply.
  #[derive(Debug, Clone, Default)]
  struct RecordingSink {
    applied: Arc<Mutex<Vec<String>>>,
  }

  impl RecordingSink {
    fn applied(&self) -> Vec<String> {
      self.applied.lock().unwrap().clone()
    }
  }

  impl LabelSink for RecordingSink {
    fn apply(&self, label: &str) -> Result<(), LabelDenied> {
      self.applied.lock().unwrap().push(label.to_string());
      Ok(())
    }
  }

  /// Sink that denies every apply.
  #[derive(Debug, Default)]
  struct DenyingSink;

  impl LabelSink for DenyingSink {
    fn apply(&self, _label: &str) -> Result<(), LabelDenied> {
      Err(LabelDenied)
    }
  }

  fn noop_registry() -> ActivityRegistry {
    ActivityRegistry::with_sink(Box::new(NoopLabelSink))
  }

  #[test]
  fn tracked_worker_appears_in_snapshot_until_end() {
    let registry = noop_registry();

    registry.begin(7, "idle");
    registry.set_display(7, "busy: query X");

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot["idle"], "busy: query X");

    registry.end(7);
    assert!(registry.snapshot().is_empty());
    assert_eq!(registry.count(), 0);
  }

  #[test]
  fn unrelabeled_worker_is_excluded_from_snapshot() {
    let registry = noop_registry();

    registry.begin(7, "idle");

    assert_eq!(registry.count(), 1);
    assert!(registry.snapshot().is_empty());

    registry.end(7);
  }

  #[test]
  fn end_restores_the_original_label_through_the_sink() {
    let sink = RecordingSink::default();
    let registry = ActivityRegistry::with_sink(Box::new(sink.clone()));

    registry.begin(7, "idle");
    registry.set_display(7, "busy: query X");
    registry.end(7);

    assert_eq!(sink.applied(), vec!["busy: query X", "idle"]);
  }

  #[test]
  fn guard_unregisters_on_unwind() {
    let registry = noop_registry();

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
      let guard = registry.enter(7, "idle");
      guard.set_display("busy: query X");
      panic!("meltdown");
    }));

    assert!(outcome.is_err());
    assert_eq!(registry.count(), 0);
    assert!(registry.snapshot().is_empty());
  }

  #[test]
  fn denied_relabel_does_not_disturb_tracking() {
    let registry = ActivityRegistry::with_sink(Box::new(DenyingSink));

    registry.begin(7, "idle");
    registry.set_display(7, "busy: query X");

    // The record still reflects the requested label even though the
    // environment refused the visible rename.
    assert_eq!(registry.snapshot()["idle"], "busy: query X");

    registry.end(7);
    assert_eq!(registry.count(), 0);
  }

  #[test]
  fn second_begin_overwrites_the_record() {
    let registry = noop_registry();

    registry.begin(7, "idle");
    registry.begin(7, "still idle");
    registry.set_display(7, "busy");

    assert_eq!(registry.snapshot()["still idle"], "busy");

    registry.end(7);
  }

  #[test]
  fn workers_track_independently() {
    let registry = noop_registry();

    registry.begin(1, "worker-1");
    registry.begin(2, "worker-2");
    registry.set_display(2, "busy: commit");

    assert_eq!(registry.count(), 2);

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot["worker-2"], "busy: commit");

    registry.end(1);
    registry.end(2);
  }

  #[test]
  fn current_worker_is_stable_within_a_thread() {
    assert_eq!(current_worker(), current_worker());
  }
}
