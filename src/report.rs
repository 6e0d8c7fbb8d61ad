use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io::{self, Write};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::node::AccountingNode;

impl Serialize for AccountingNode {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let entries = if self.is_leaf() { 1 } else { 2 };
    let mut map = serializer.serialize_map(Some(entries))?;

    map.serialize_entry(
      self.label(),
      &human_readable_bytes(self.total_bytes()),
    )?;

    if !self.children().is_empty() {
      map.serialize_entry("children", self.children())?;
    }

    map.end()
  }
}

const ONE_KB: u64 = 1024;
const ONE_MB: u64 = ONE_KB * 1024;
const ONE_GB: u64 = ONE_MB * 1024;

/// Errors that can occur when exporting a report.
#[derive(Debug)]
pub enum ReportError {
  Io(io::Error),
  Json(serde_json::Error),
}

impl Display for ReportError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Self::Io(err) => write!(f, "i/o error during report export: {err}"),
      Self::Json(err) => write!(f, "failed to encode report as json: {err}"),
    }
  }
}

impl Error for ReportError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      Self::Io(err) => Some(err),
      Self::Json(err) => Some(err),
    }
  }
}

impl From<io::Error> for ReportError {
  fn from(value: io::Error) -> Self {
    Self::Io(value)
  }
}

impl From<serde_json::Error> for ReportError {
  fn from(value: serde_json::Error) -> Self {
    Self::Json(value)
  }
}

/// Serialize the report tree to JSON using the provided writer.
///
/// # Errors
///
/// Returns a `ReportError` if serialization fails or the writer reports a
/// failure.
pub fn export_json<W: Write>(node: &AccountingNode, writer: W) -> Result<(), ReportError> {
  serde_json::to_writer(writer, node)?;
  Ok(())
}

/// Format a byte count with a unit suffix, keeping one or two decimal places.
///
/// Counts below 1 KB are reported as plain bytes without a fraction.
#[must_use]
pub fn human_readable_bytes(bytes: u64) -> String {
  if bytes / ONE_GB > 0 {
    format!("{} GB", format_units(bytes as f64 / ONE_GB as f64))
  } else if bytes / ONE_MB > 0 {
    format!("{} MB", format_units(bytes as f64 / ONE_MB as f64))
  } else if bytes / ONE_KB > 0 {
    format!("{} KB", format_units(bytes as f64 / ONE_KB as f64))
  } else {
    format!("{bytes} bytes")
  }
}

/// Render the report tree as an indented multi-line string for log dumps.
#[must_use]
pub fn render_tree(node: &AccountingNode) -> String {
  let mut out = String::new();
  render_into(&mut out, node, 0);
  out
}

/// Convert the report tree into a generic nested mapping.
///
/// Each node becomes a mapping whose first key is the node label and whose
/// value is the human-readable total size. A container additionally carries a
/// `"children"` key with the ordered child mappings; a leaf omits the key
/// entirely, so key presence alone distinguishes the two.
#[must_use]
pub fn to_report(node: &AccountingNode) -> Value {
  let mut entry = Map::new();
  entry.insert(
    node.label().to_string(),
    Value::String(human_readable_bytes(node.total_bytes())),
  );

  if !node.children().is_empty() {
    let children = node.children().iter().map(to_report).collect();
    entry.insert("children".to_string(), Value::Array(children));
  }

  Value::Object(entry)
}

// Minimum one decimal place, maximum two.
fn format_units(value: f64) -> String {
  let mut formatted = format!("{value:.2}");

  if formatted.ends_with('0') {
    formatted.pop();
  }

  formatted
}

fn render_into(out: &mut String, node: &AccountingNode, depth: usize) {
  for _ in 1..depth {
    out.push_str("    ");
  }

  if depth > 0 {
    out.push_str("|-- ");
  }

  out.push_str(node.label());
  out.push_str(": ");
  out.push_str(&human_readable_bytes(node.total_bytes()));
  out.push('\n');

  for child in node.children() {
    render_into(out, child, depth + 1);
  }
}
