//! In-process introspection for search servers.
//!
//! Two independent facilities, meant to be driven by a request-handling
//! collaborator: an [`Inspector`] that walks the resources held by
//! query-serving components and builds a deduplicated memory accounting tree,
//! and an [`ActivityRegistry`] that tracks which unit of work is executing on
//! which worker and since when.

mod delegate;
mod inspector;
mod label;
mod node;
mod registry;
mod report;
mod resource;

pub use {
  delegate::{MisconfiguredDelegate, TrackedDelegate},
  inspector::Inspector,
  label::{LabelDenied, LabelSink, NoopLabelSink, ThreadNameSink},
  node::AccountingNode,
  registry::{current_worker, ActivityGuard, ActivityRegistry, WorkRecord, WorkerId},
  report::{export_json, human_readable_bytes, render_tree, to_report, ReportError},
  resource::{unwrap_resource, Accountable, Resource, ResourceUnavailable},
};
