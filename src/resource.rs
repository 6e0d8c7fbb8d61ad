use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Capability of a resource that reports its own retained memory directly.
///
/// Implementors are the terminal case of an inspection walk: their reported
/// bytes and child resources are taken as-is and no further structural
/// decomposition happens below them.
pub trait Accountable {
  /// Accountables nested inside this one. Defaults to none.
  fn child_accountables(&self) -> Vec<&dyn Accountable> {
    Vec::new()
  }

  /// Human description of the resource (identity/debug info).
  fn describe(&self) -> String;

  /// Bytes retained by this resource, as reported by the resource itself.
  fn retained_bytes(&self) -> u64;
}

/// Any object from which memory usage and/or sub-resources can be queried.
///
/// The inspector never owns or mutates a `Resource`; it only reads. Which of
/// the optional capabilities a resource exposes decides how the walk treats
/// it: a pass-through wrapper is unwrapped first, a natively accountable
/// resource stops the descent, and everything else is decomposed through its
/// components.
pub trait Resource {
  /// The accounting capability, if this resource reports memory natively.
  fn accounting(&self) -> Option<&dyn Accountable> {
    None
  }

  /// Sub-resources this composite decomposes into.
  ///
  /// # Errors
  ///
  /// Returns `ResourceUnavailable` if the resource became unreadable, e.g.
  /// because it was closed concurrently. The error aborts the whole
  /// inspection; partial reports are never produced.
  fn components(&self) -> Result<Vec<&dyn Resource>, ResourceUnavailable>;

  /// The underlying resource, if this one is a pass-through wrapper whose
  /// sole role is delegation. Wrappers carry no accounting weight of their
  /// own.
  fn delegate(&self) -> Option<&dyn Resource> {
    None
  }

  /// Human description of the resource (identity/debug info).
  fn describe(&self) -> String;
}

/// Resolve a chain of pass-through wrappers down to the underlying resource.
#[must_use]
pub fn unwrap_resource(mut resource: &dyn Resource) -> &dyn Resource {
  while let Some(inner) = resource.delegate() {
    resource = inner;
  }

  resource
}

/// A resource became unreadable while an inspection was walking it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceUnavailable {
  label: String,
}

impl ResourceUnavailable {
  #[must_use]
  pub fn label(&self) -> &str {
    &self.label
  }

  #[must_use]
  pub fn new(label: impl Into<String>) -> Self {
    Self {
      label: label.into(),
    }
  }
}

impl Display for ResourceUnavailable {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "resource '{}' became unavailable during inspection", self.label)
  }
}

impl Error for ResourceUnavailable {}
