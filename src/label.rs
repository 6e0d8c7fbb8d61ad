use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};

/// The runtime refused to change the calling worker's display label.
///
/// Denial is non-fatal by contract: callers discard this error and the unit
/// of work proceeds unaffected.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LabelDenied;

impl Display for LabelDenied {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "the runtime denied changing the worker display label")
  }
}

impl Error for LabelDenied {}

/// Applies a display label to the calling worker.
///
/// Implementations are best-effort: returning `Err(LabelDenied)` is an
/// expected outcome on environments that forbid relabeling, and callers are
/// expected to discard it rather than propagate it.
pub trait LabelSink: Debug + Send + Sync {
  /// Attempt to apply `label` as the calling worker's visible label.
  ///
  /// # Errors
  ///
  /// Returns `LabelDenied` when the environment refuses the change.
  fn apply(&self, label: &str) -> Result<(), LabelDenied>;
}

/// Sink that never changes anything and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLabelSink;

impl LabelSink for NoopLabelSink {
  fn apply(&self, _label: &str) -> Result<(), LabelDenied> {
    Ok(())
  }
}

/// Sink that renames the calling OS thread.
///
/// Linux caps thread names at 15 bytes and macOS at 63; the label is
/// truncated at a char boundary to fit. On platforms without a rename
/// facility every apply is denied.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadNameSink;

#[cfg(target_os = "linux")]
impl LabelSink for ThreadNameSink {
  fn apply(&self, label: &str) -> Result<(), LabelDenied> {
    let name =
      std::ffi::CString::new(truncate_label(label, 15)).map_err(|_| LabelDenied)?;

    // SAFETY: prctl(PR_SET_NAME) reads a nul-terminated string that outlives
    // the call.
    let rc = unsafe { libc::prctl(libc::PR_SET_NAME, name.as_ptr(), 0, 0, 0) };

    if rc == 0 {
      Ok(())
    } else {
      Err(LabelDenied)
    }
  }
}

#[cfg(target_os = "macos")]
impl LabelSink for ThreadNameSink {
  fn apply(&self, label: &str) -> Result<(), LabelDenied> {
    let name =
      std::ffi::CString::new(truncate_label(label, 63)).map_err(|_| LabelDenied)?;

    // SAFETY: pthread_setname_np reads a nul-terminated string that outlives
    // the call and only affects the calling thread.
    let rc = unsafe { libc::pthread_setname_np(name.as_ptr()) };

    if rc == 0 {
      Ok(())
    } else {
      Err(LabelDenied)
    }
  }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
impl LabelSink for ThreadNameSink {
  fn apply(&self, _label: &str) -> Result<(), LabelDenied> {
    Err(LabelDenied)
  }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn truncate_label(label: &str, max_bytes: usize) -> &str {
  let mut end = label.len().min(max_bytes);

  while !label.is_char_boundary(end) {
    end -= 1;
  }

  &label[..end]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn noop_sink_always_accepts() {
    assert_eq!(NoopLabelSink.apply("busy: query X"), Ok(()));
  }

  #[cfg(any(target_os = "linux", target_os = "macos"))]
  #[test]
  fn thread_sink_renames_the_calling_thread() {
    assert_eq!(ThreadNameSink.apply("probe-worker"), Ok(()));
  }

  #[cfg(any(target_os = "linux", target_os = "macos"))]
  #[test]
  fn truncation_respects_char_boundaries() {
    // Each 'ä' is two bytes; cutting at 15 would split the eighth one.
    let label = "ääääääääää";

    let truncated = truncate_label(label, 15);

    assert_eq!(truncated.len(), 14);
    assert!(label.starts_with(truncated));
  }

  #[cfg(any(target_os = "linux", target_os = "macos"))]
  #[test]
  fn labels_with_interior_nul_are_denied() {
    assert_eq!(ThreadNameSink.apply("bad\0label"), Err(LabelDenied));
  }
}
