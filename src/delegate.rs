use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use chrono::Local;

use crate::registry::{ActivityRegistry, WorkerId};

/// The configured unit-of-work target could not be resolved at setup time.
///
/// Fatal: a tracked delegate refuses to activate rather than run
/// half-configured.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MisconfiguredDelegate {
  target: String,
}

impl MisconfiguredDelegate {
  #[must_use]
  pub fn target(&self) -> &str {
    &self.target
  }
}

impl Display for MisconfiguredDelegate {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "work delegate '{}' not found, check the configured target name",
      self.target
    )
  }
}

impl Error for MisconfiguredDelegate {}

/// Wraps a delegated unit of work with activity tracking.
///
/// The worker is registered and relabeled before the delegate runs, and
/// unregistered with its original label restored on every exit path,
/// including when the delegate fails.
#[derive(Debug)]
pub struct TrackedDelegate<D> {
  delegate: D,
  registry: Arc<ActivityRegistry>,
  target: String,
}

impl<D> TrackedDelegate<D> {
  /// Run one unit of work under activity tracking.
  ///
  /// The worker's display label is set, best-effort, to the target name, the
  /// start time, and the work description. Tracking ends when `work`
  /// returns, whether it succeeded or not.
  pub fn call<T, E>(
    &self,
    worker: WorkerId,
    original_label: &str,
    description: &str,
    work: impl FnOnce(&D) -> Result<T, E>,
  ) -> Result<T, E> {
    let guard = self.registry.enter(worker, original_label);

    guard.set_display(format!(
      "{} (Start: {}): {}",
      self.target,
      Local::now().format("%H:%M:%S%.3f"),
      description
    ));

    work(&self.delegate)
  }

  #[must_use]
  pub fn delegate(&self) -> &D {
    &self.delegate
  }

  /// Resolve the configured target name into a delegate.
  ///
  /// # Errors
  ///
  /// Returns `MisconfiguredDelegate` when `lookup` cannot resolve `target`.
  pub fn resolve<F>(
    registry: Arc<ActivityRegistry>,
    target: impl Into<String>,
    lookup: F,
  ) -> Result<Self, MisconfiguredDelegate>
  where
    F: FnOnce(&str) -> Option<D>,
  {
    let target = target.into();

    match lookup(&target) {
      Some(delegate) => Ok(Self {
        delegate,
        registry,
        target,
      }),
      None => Err(MisconfiguredDelegate { target }),
    }
  }

  #[must_use]
  pub fn target(&self) -> &str {
    &self.target
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::label::NoopLabelSink;

  #[derive(Debug)]
  struct SearchHandler;

  impl SearchHandler {
    fn run(&self, query: &str) -> Result<usize, String> {
      if query == "broken" {
        Err("Meltdown!".to_string())
      } else {
        Ok(query.len())
      }
    }
  }

  fn tracked() -> (Arc<ActivityRegistry>, TrackedDelegate<SearchHandler>) {
    let registry = Arc::new(ActivityRegistry::with_sink(Box::new(NoopLabelSink)));
    let delegate = TrackedDelegate::resolve(
      Arc::clone(&registry),
      "/select",
      |_| Some(SearchHandler),
    )
    .expect("resolve failed");

    (registry, delegate)
  }

  #[test]
  fn unknown_target_refuses_to_activate() {
    let registry = Arc::new(ActivityRegistry::new());

    let err = TrackedDelegate::<SearchHandler>::resolve(
      registry,
      "/missing",
      |_| None,
    )
    .expect_err("expected resolution to fail");

    assert_eq!(err.target(), "/missing");
    assert!(err.to_string().contains("/missing"));
  }

  #[test]
  fn worker_is_tracked_while_the_delegate_runs() {
    let (registry, delegate) = tracked();

    let result = delegate.call(7, "qtp-worker-7", "q=*:*", |handler| {
      let snapshot = registry.snapshot();
      let label = &snapshot["qtp-worker-7"];

      assert!(label.starts_with("/select (Start: "));
      assert!(label.ends_with("): q=*:*"));

      handler.run("q=*:*")
    });

    assert_eq!(result, Ok(5));
    assert_eq!(registry.count(), 0);
  }

  #[test]
  fn failed_delegate_still_unregisters() {
    let (registry, delegate) = tracked();

    let result =
      delegate.call(7, "qtp-worker-7", "broken", |handler| handler.run("broken"));

    assert_eq!(result, Err("Meltdown!".to_string()));
    assert_eq!(registry.count(), 0);
    assert!(registry.snapshot().is_empty());
  }
}
