// core/tests/context_tests.rs
mod common;

use common::*;
use glowmart_flow::{FlowData, StepControl, StepSpec, Workflow};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn later_steps_see_earlier_writes() {
  setup_tracing();
  let mut wf = Workflow::<TestContext, TestError>::new(
    "shared",
    vec![StepSpec::required("write"), StepSpec::required("read_then_write")],
  );
  wf.on("write", |ctx: FlowData<TestContext>| async move {
    ctx.write().counter = 10;
    Ok::<_, TestError>(StepControl::Continue)
  });
  wf.on("read_then_write", |ctx: FlowData<TestContext>| async move {
    let seen = ctx.with(|c| c.counter);
    // Guard is gone, awaiting is fine.
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    ctx.write().counter = seen + 5;
    Ok::<_, TestError>(StepControl::Continue)
  });

  let ctx = FlowData::new(TestContext::default());
  wf.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().counter, 15);
}

#[test]
fn clones_share_the_value() {
  let original = FlowData::new(TestContext::default());
  let clone = original.clone();
  original.write().counter = 5;
  assert_eq!(clone.read().counter, 5);
  clone.write().counter = 7;
  assert_eq!(original.snapshot().counter, 7);
}

#[test]
fn try_write_fails_while_read_guard_is_held() {
  let data = FlowData::new(TestContext::default());
  let guard = data.read();
  assert!(data.try_write().is_none());
  assert!(data.try_read().is_some());
  drop(guard);
  assert!(data.try_write().is_some());
}
