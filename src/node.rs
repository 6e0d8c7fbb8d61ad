/// One resource's aggregated memory usage inside a report tree.
///
/// A node is either a leaf, whose `self_bytes` is the actual usage, or a
/// container, whose total is the sum of its children. A container never adds
/// its own weight on top of the children it holds.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AccountingNode {
  children: Vec<AccountingNode>,
  label: String,
  self_bytes: u64,
  total_bytes: u64,
}

impl AccountingNode {
  #[must_use]
  pub fn children(&self) -> &[AccountingNode] {
    &self.children
  }

  /// Build a container node whose total is derived from its children.
  ///
  /// Child order is preserved; it is the traversal order of the walk that
  /// produced them.
  #[must_use]
  pub fn container(label: impl Into<String>, children: Vec<AccountingNode>) -> Self {
    let total_bytes = children.iter().map(AccountingNode::total_bytes).sum();

    Self {
      children,
      label: label.into(),
      self_bytes: 0,
      total_bytes,
    }
  }

  #[must_use]
  pub fn is_leaf(&self) -> bool {
    self.children.is_empty()
  }

  #[must_use]
  pub fn label(&self) -> &str {
    &self.label
  }

  /// Build a leaf node carrying the bytes attributed directly to it.
  #[must_use]
  pub fn leaf(label: impl Into<String>, self_bytes: u64) -> Self {
    Self {
      children: Vec::new(),
      label: label.into(),
      self_bytes,
      total_bytes: self_bytes,
    }
  }

  #[must_use]
  pub fn self_bytes(&self) -> u64 {
    self.self_bytes
  }

  #[must_use]
  pub fn total_bytes(&self) -> u64 {
    self.total_bytes
  }
}
