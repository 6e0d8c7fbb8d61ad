use std::ptr;

use crate::node::AccountingNode;
use crate::report::render_tree;
use crate::resource::{unwrap_resource, Accountable, Resource, ResourceUnavailable};

/// Walks a forest of resources and builds a deduplicated accounting tree.
///
/// Each call to [`Inspector::inspect`] performs an independent read-only
/// traversal of live resource state; nothing is cached across calls and the
/// inspector holds no shared mutable state, so concurrent inspections are
/// safe.
#[derive(Debug, Clone, Default)]
pub struct Inspector {
  dump_to_log: bool,
}

impl Inspector {
  /// Also emit the finished tree to the operational log at info level,
  /// rendered as a multi-line string.
  #[must_use]
  pub fn dump_to_log(mut self, dump: bool) -> Self {
    self.dump_to_log = dump;
    self
  }

  /// Build the accounting tree for the given top-level resources.
  ///
  /// The roots are wrapped under a synthetic container labeled with the root
  /// count. An empty root set yields an empty container totaling zero bytes
  /// rather than an error.
  ///
  /// # Errors
  ///
  /// Returns `ResourceUnavailable` if any resource becomes unreadable during
  /// the walk. The whole inspection fails; no partial tree is returned.
  pub fn inspect(
    &self,
    roots: &[&dyn Resource],
  ) -> Result<AccountingNode, ResourceUnavailable> {
    let mut children = Vec::with_capacity(roots.len());

    for root in roots {
      children.push(self.inspect_resource(*root)?);
    }

    let label = format!("Tracked resources (count: {})", children.len());
    let report = AccountingNode::container(label, children);

    if self.dump_to_log {
      tracing::info!("memory report\n{}", render_tree(&report));
    }

    Ok(report)
  }

  fn inspect_resource(
    &self,
    resource: &dyn Resource,
  ) -> Result<AccountingNode, ResourceUnavailable> {
    // Wrapper identity contributes no accounting weight of its own.
    let resource = unwrap_resource(resource);

    if let Some(accounting) = resource.accounting() {
      return Ok(node_from_accountable(accounting));
    }

    let components = resource.components()?;

    if components.is_empty() {
      // Size unknown or negligible: an explicit zero, not an omission.
      return Ok(AccountingNode::leaf(resource.describe(), 0));
    }

    let mut children = Vec::with_capacity(components.len());

    for component in components {
      let unwrapped = unwrap_resource(component);

      if ptr::addr_eq(
        unwrapped as *const dyn Resource,
        resource as *const dyn Resource,
      ) {
        // A composite-of-one whose only component is itself; recursing would
        // never terminate.
        children.push(AccountingNode::leaf(resource.describe(), 0));
      } else {
        children.push(self.inspect_resource(component)?);
      }
    }

    let label = format!(
      "{} (components: {})",
      resource.describe(),
      children.len()
    );

    Ok(AccountingNode::container(label, children))
  }

  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }
}

fn node_from_accountable(accountable: &dyn Accountable) -> AccountingNode {
  let children = accountable.child_accountables();

  if children.is_empty() {
    AccountingNode::leaf(accountable.describe(), accountable.retained_bytes())
  } else {
    let nodes = children.into_iter().map(node_from_accountable).collect();
    AccountingNode::container(accountable.describe(), nodes)
  }
}
