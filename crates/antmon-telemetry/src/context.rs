//! Span and request context.
//!
//! The service keeps one `app` span entered for its whole life. Each HTTP
//! request additionally runs inside a task-local [`RequestContext`] so code
//! far from the handler (error rendering, stream teardown) can name the
//! request it belongs to.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Keeps the `app` span entered until dropped.
pub struct GlobalContextGuard {
    _entered: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter an `app` span tagged with `component` and the build SHA.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        let component = component.into();
        // The guard borrows the span for 'static; the span lives as long as the process.
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "app",
            component = %component,
            build_sha = %build_sha()
        )));
        Self {
            _entered: span.enter(),
        }
    }
}

/// Identity of the HTTP request the current task is serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Value of the `x-request-id` header; empty when the client sent none.
    pub request_id: Arc<str>,
    /// Matched route template, or the raw path when no route matched.
    pub route: Arc<str>,
}

impl RequestContext {
    /// Context of the request served by this task, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        ACTIVE_REQUEST.try_with(Clone::clone).ok()
    }
}

tokio::task_local! {
    static ACTIVE_REQUEST: RequestContext;
}

/// Run `fut` with a request context visible through [`RequestContext::current`].
pub async fn with_request_context<Fut, T>(
    request_id: impl Into<String>,
    route: impl Into<String>,
    fut: Fut,
) -> T
where
    Fut: Future<Output = T>,
{
    let context = RequestContext {
        request_id: Arc::from(request_id.into()),
        route: Arc::from(route.into()),
    };
    ACTIVE_REQUEST.scope(context, fut).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_enters_and_leaves() {
        drop(GlobalContextGuard::new("test"));
    }

    #[tokio::test]
    async fn context_is_scoped_to_the_future() {
        let seen = with_request_context("req-42", "/metrics/start", async {
            RequestContext::current()
        })
        .await;
        let seen = seen.expect("context inside scope");
        assert_eq!(&*seen.request_id, "req-42");
        assert_eq!(&*seen.route, "/metrics/start");
        assert!(RequestContext::current().is_none());
    }
}
