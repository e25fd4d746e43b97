//! Host capture adapters: the panic hook and observed task spawning.

use futures_util::FutureExt;
use serde_json::json;
use std::any::Any;
use std::cell::Cell;
use std::fmt::Display;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

use crate::capture::entry::ErrorCategory;
use crate::capture::interceptor::Interceptor;

thread_local! {
    /// Depth of futures currently being polled under a panic catcher.
    static CATCHING: Cell<u32> = const { Cell::new(0) };
}

struct CatchDepth;

impl CatchDepth {
    fn enter() -> Self {
        CATCHING.with(|d| d.set(d.get() + 1));
        CatchDepth
    }
}

impl Drop for CatchDepth {
    fn drop(&mut self) {
        CATCHING.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

fn panic_is_caught() -> bool {
    CATCHING.with(|d| d.get() > 0)
}

/// Marks every poll of the inner future as covered by a panic catcher, so
/// the process hook leaves those panics to the code that catches them.
struct Caught<'a, T> {
    inner: Pin<Box<dyn Future<Output = T> + Send + 'a>>,
}

impl<T> Future for Caught<'_, T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let _depth = CatchDepth::enter();
        self.inner.as_mut().poll(cx)
    }
}

/// Run `future`, turning a panic into `Err(message)`.
pub(crate) async fn catch_panic<'a, T>(
    future: impl Future<Output = T> + Send + 'a,
) -> Result<T, String> {
    let caught = Caught {
        inner: Box::pin(future),
    };
    AssertUnwindSafe(caught)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Capture panics as `UncaughtException`, then defer to the previous hook.
///
/// Panics raised inside [`spawn_observed`] tasks or health checks are
/// recorded by those callers instead.
pub fn install_panic_hook(interceptor: Arc<Interceptor>) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if !panic_is_caught() {
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
            interceptor.capture(
                ErrorCategory::UncaughtException,
                json!({
                    "message": panic_message(info.payload()),
                    "location": location,
                }),
            );
        }
        previous(info);
    }));
}

/// Spawn a task whose failure nobody else will see.
///
/// An `Err` result or a panic is captured as `RejectedPromise`; the handle
/// resolves to `None` in that case.
pub fn spawn_observed<F, T, E>(
    interceptor: Arc<Interceptor>,
    label: impl Into<String>,
    future: F,
) -> JoinHandle<Option<T>>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display,
{
    let label = label.into();
    tokio::spawn(async move {
        let reason = match catch_panic(future).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(error)) => json!({ "task": label, "reason": error.to_string() }),
            Err(message) => json!({ "task": label, "reason": message, "panicked": true }),
        };
        interceptor.capture(ErrorCategory::RejectedPromise, reason);
        None
    })
}
