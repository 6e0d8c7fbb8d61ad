use std::sync::Arc;

use coreprobe::{
  Accountable, ActivityRegistry, Inspector, NoopLabelSink, Resource,
  ResourceUnavailable, TrackedDelegate,
};

struct Segment {
  bytes: u64,
  label: String,
}

impl Accountable for Segment {
  fn describe(&self) -> String {
    self.label.clone()
  }

  fn retained_bytes(&self) -> u64 {
    self.bytes
  }
}

impl Resource for Segment {
  fn accounting(&self) -> Option<&dyn Accountable> {
    Some(self)
  }

  fn components(&self) -> Result<Vec<&dyn Resource>, ResourceUnavailable> {
    Ok(Vec::new())
  }

  fn describe(&self) -> String {
    self.label.clone()
  }
}

struct Reader {
  segments: Vec<Segment>,
}

impl Resource for Reader {
  fn components(&self) -> Result<Vec<&dyn Resource>, ResourceUnavailable> {
    Ok(
      self
        .segments
        .iter()
        .map(|segment| segment as &dyn Resource)
        .collect(),
    )
  }

  fn describe(&self) -> String {
    "demo reader".to_string()
  }
}

fn main() {
  tracing_subscriber::fmt::init();

  let reader = Reader {
    segments: vec![
      Segment {
        bytes: 1536,
        label: "segment 0".to_string(),
      },
      Segment {
        bytes: 4 * 1024 * 1024,
        label: "segment 1".to_string(),
      },
    ],
  };

  let report = Inspector::new()
    .dump_to_log(true)
    .inspect(&[&reader])
    .expect("inspection failed");

  println!("=== demo report ===");
  println!("{}", serde_json::to_string_pretty(&report).expect("json"));

  let registry = Arc::new(ActivityRegistry::with_sink(Box::new(NoopLabelSink)));
  let tracked = TrackedDelegate::resolve(Arc::clone(&registry), "/select", |_| {
    Some("demo handler")
  })
  .expect("delegate not found");

  let _: Result<(), &str> = tracked.call(
    coreprobe::current_worker(),
    "demo-worker",
    "q=*:*",
    |_handler| {
      println!("in flight: {:?}", registry.snapshot());
      Ok(())
    },
  );

  println!("tracked workers after the request: {}", registry.count());
}
