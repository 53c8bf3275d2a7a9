//! Per-tool-call request ids.
//!
//! A tool call enters a [`RequestContext`]; services read it back with
//! [`current_request_id`] and stamp it on their spans through [`record_request_id`]. The
//! task-local slot wins over the thread-local one, so async callers keep their id
//! across `.await` points even when the task migrates between threads.

use std::cell::RefCell;
use std::future::Future;
use uuid::Uuid;

/// Correlation context for one tool call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    request_id: String,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Creates a context with a fresh `req_` id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: format!("req_{}", Uuid::new_v4().simple()),
        }
    }

    /// Reuses an id supplied by the caller (for example, a transport message id).
    #[must_use]
    pub fn from_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// The request id.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

tokio::task_local! {
    static TASK_CONTEXT: RequestContext;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<Option<RequestContext>> = const { RefCell::new(None) };
}

/// Restores the previously entered context when dropped.
#[must_use = "the context is left as soon as the guard is dropped"]
pub struct RequestContextGuard {
    previous: Option<RequestContext>,
}

impl Drop for RequestContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        THREAD_CONTEXT.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Enters `context` on the current thread until the guard drops.
pub fn enter_request_context(context: RequestContext) -> RequestContextGuard {
    let previous = THREAD_CONTEXT.with(|slot| slot.borrow_mut().replace(context));
    RequestContextGuard { previous }
}

/// Runs `fut` with `context` visible to everything it awaits.
pub async fn scope_request_context<F, T>(context: RequestContext, fut: F) -> T
where
    F: Future<Output = T>,
{
    TASK_CONTEXT
        .scope(context.clone(), async move {
            let _guard = enter_request_context(context);
            fut.await
        })
        .await
}

/// The id of the request being served, if any.
#[must_use]
pub fn current_request_id() -> Option<String> {
    TASK_CONTEXT
        .try_with(|ctx| ctx.request_id.clone())
        .ok()
        .or_else(|| {
            THREAD_CONTEXT.with(|slot| slot.borrow().as_ref().map(|c| c.request_id.clone()))
        })
}

/// Records the current request id into the active span's `request_id` field.
///
/// Spans declare the field as `tracing::field::Empty`; without a request this is a no-op.
pub fn record_request_id() {
    if let Some(request_id) = current_request_id() {
        tracing::Span::current().record("request_id", request_id.as_str());
    }
}
