// core/tests/error_handling_tests.rs
mod common;

use common::*;
use glowmart_flow::{FlowData, FlowError, StepControl, StepSpec, Workflow};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn required_step_without_handlers_fails() {
  setup_tracing();
  let wf = Workflow::<TestContext, TestError>::new("bare", vec![StepSpec::required("lonely")]);
  let err = wf.run(FlowData::new(TestContext::default())).await.unwrap_err();
  match err {
    TestError::Flow(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("lonely"));
    }
    other => panic!("expected HandlerMissing, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn flow_error_can_be_the_workflow_error() {
  setup_tracing();
  let mut wf = Workflow::<TestContext, FlowError>::new("anyhow", vec![StepSpec::required("task")]);
  wf.on("task", |_ctx: FlowData<TestContext>| async move {
    Err::<StepControl, _>(anyhow::anyhow!("disk on fire"))
  });

  let err = wf.run(FlowData::new(TestContext::default())).await.unwrap_err();
  match err {
    FlowError::Handler { source } => assert_eq!(source.to_string(), "disk on fire"),
    other => panic!("expected FlowError::Handler, got {:?}", other),
  }
}

#[test]
fn anyhow_wrapping_a_flow_error_unwraps_it() {
  let wrapped = anyhow::Error::new(FlowError::HandlerMissing { step: "x".into() });
  match FlowError::from(wrapped) {
    FlowError::HandlerMissing { step } => assert_eq!(step, "x"),
    other => panic!("expected HandlerMissing, got {:?}", other),
  }
}
