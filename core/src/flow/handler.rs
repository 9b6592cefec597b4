// core/src/flow/handler.rs
use super::control::StepControl;
use super::data::FlowData;
use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A boxed step handler: takes a handle on the run's context and resolves to
/// a [`StepControl`] or the workflow's error.
pub type Handler<T, E> = Box<dyn Fn(FlowData<T>) -> BoxFuture<Result<StepControl, E>> + Send + Sync>;

/// Boxes a plain async function (or closure returning a future) into a
/// [`Handler`], converting its error into the workflow's error type.
pub(crate) fn boxed<T, E, F, Fut, HE>(f: F) -> Handler<T, E>
where
  T: Send + Sync + 'static,
  F: Fn(FlowData<T>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<StepControl, HE>> + Send + 'static,
  HE: Into<E> + 'static,
  E: 'static,
{
  Box::new(move |data| {
    let fut = f(data);
    Box::pin(async move { fut.await.map_err(Into::into) })
  })
}
