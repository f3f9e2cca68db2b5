//! Middleware composition.
//!
//! A [`Middleware`] inspects a request before the handler sees it and either
//! answers it (short-circuit) or lets it through. A [`MiddlewareChain`] runs
//! its middlewares strictly in order and stops at the first answer:
//!
//! ```text
//! Request → logging → rate limit → content type → Handler
//!               ↓           ↓             ↓
//!             (none)       429           415
//! ```
//!
//! The chain is mounted on routes with [`MiddlewareLayer`], or wrapped
//! around a plain async handler with [`with_middleware`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::metrics;

/// A request inspector.
///
/// Returning `Some(response)` short-circuits the chain: later middlewares
/// and the handler are not invoked.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    fn inspect(&self, req: &Request<Body>) -> Option<Response>;
}

/// Adapter turning a closure into a named [`Middleware`].
pub struct FnMiddleware<F> {
    name: &'static str,
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&Request<Body>) -> Option<Response> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn inspect(&self, req: &Request<Body>) -> Option<Response> {
        (self.f)(req)
    }
}

/// Build a middleware from a closure.
pub fn from_fn<F>(name: &'static str, f: F) -> FnMiddleware<F>
where
    F: Fn(&Request<Body>) -> Option<Response> + Send + Sync,
{
    FnMiddleware { name, f }
}

/// Ordered, cheaply clonable list of middlewares.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware to the end of the chain.
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        Arc::make_mut(&mut self.middlewares).push(Arc::new(middleware));
        self
    }

    /// Append an already shared middleware.
    pub fn with_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        Arc::make_mut(&mut self.middlewares).push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run the middlewares in order; the first response wins.
    pub fn run(&self, req: &Request<Body>) -> Option<Response> {
        for middleware in self.middlewares.iter() {
            if let Some(response) = middleware.inspect(req) {
                debug!(
                    middleware = middleware.name(),
                    status = %response.status(),
                    path = %req.uri().path(),
                    "Middleware short-circuited request"
                );
                return Some(response);
            }
        }
        None
    }
}

/// Compose shared middlewares into a chain, preserving their order.
pub fn compose<I>(middlewares: I) -> MiddlewareChain
where
    I: IntoIterator<Item = Arc<dyn Middleware>>,
{
    MiddlewareChain {
        middlewares: Arc::new(middlewares.into_iter().collect()),
    }
}

/// Boxed future returned by handlers wrapped with [`with_middleware`].
pub type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Wrap a fallible async handler with a middleware chain and error boundary.
///
/// The chain runs first; if nothing short-circuits, the handler runs and any
/// error it returns is turned into an envelope by [`error_boundary`].
pub fn with_middleware<H, Fut>(
    handler: H,
    chain: MiddlewareChain,
) -> impl Fn(Request<Body>) -> ResponseFuture + Clone + Send + Sync + 'static
where
    H: Fn(Request<Body>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = AppResult<Response>> + Send + 'static,
{
    move |req: Request<Body>| -> ResponseFuture {
        let chain = chain.clone();
        let handler = handler.clone();

        Box::pin(async move {
            if let Some(response) = chain.run(&req) {
                return response;
            }

            match handler(req).await {
                Ok(response) => response,
                Err(err) => error_boundary(err),
            }
        })
    }
}

/// Convert an error that escaped a handler into an envelope response.
///
/// Delegates to [`AppError`]'s `IntoResponse` impl, which logs internal
/// errors and answers them with a generic `INTERNAL_ERROR`. Client errors
/// keep their own status and code.
pub fn error_boundary(err: AppError) -> Response {
    err.into_response()
}

/// Tower layer mounting a [`MiddlewareChain`] in front of a route.
#[derive(Clone)]
pub struct MiddlewareLayer {
    chain: MiddlewareChain,
}

impl MiddlewareLayer {
    pub fn new(chain: MiddlewareChain) -> Self {
        Self { chain }
    }
}

impl<S> Layer<S> for MiddlewareLayer {
    type Service = MiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MiddlewareService {
            inner,
            chain: self.chain.clone(),
        }
    }
}

/// Service produced by [`MiddlewareLayer`].
#[derive(Clone)]
pub struct MiddlewareService<S> {
    inner: S,
    chain: MiddlewareChain,
}

impl<S> Service<Request<Body>> for MiddlewareService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        if let Some(response) = self.chain.run(&req) {
            record_duration(&path, &method, &response, started);
            return Box::pin(async move { Ok(response) });
        }

        // Take the service that was driven to readiness, leave a clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let response = inner.call(req).await?;
            record_duration(&path, &method, &response, started);
            Ok(response)
        })
    }
}

fn record_duration(path: &str, method: &axum::http::Method, response: &Response, started: Instant) {
    metrics::record_request_duration(
        path,
        method.as_str(),
        response.status().as_str(),
        started.elapsed().as_secs_f64(),
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::*;

    /// Middleware that counts invocations and optionally answers.
    struct Spy {
        calls: Arc<AtomicUsize>,
        answer: Option<StatusCode>,
    }

    impl Spy {
        fn new(answer: Option<StatusCode>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                    answer,
                },
                calls,
            )
        }
    }

    impl Middleware for Spy {
        fn name(&self) -> &'static str {
            "spy"
        }

        fn inspect(&self, _req: &Request<Body>) -> Option<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.map(|status| status.into_response())
        }
    }

    fn request() -> Request<Body> {
        Request::builder().uri("/api/test").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_first_short_circuit_skips_rest_and_handler() {
        let (first, first_calls) = Spy::new(Some(StatusCode::TOO_MANY_REQUESTS));
        let (second, second_calls) = Spy::new(None);
        let handler_calls = Arc::new(AtomicUsize::new(0));

        let counter = handler_calls.clone();
        let handler = with_middleware(
            move |_req: Request<Body>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(StatusCode::OK.into_response())
                }
            },
            MiddlewareChain::new().with(first).with(second),
        );

        let response = handler(request()).await;

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
        assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_pass_runs_handler_once() {
        let (first, first_calls) = Spy::new(None);
        let (second, second_calls) = Spy::new(None);

        let handler = with_middleware(
            |_req: Request<Body>| async { Ok(StatusCode::CREATED.into_response()) },
            MiddlewareChain::new().with(first).with(second),
        );

        let response = handler(request()).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_generic_internal_error() {
        let handler = with_middleware(
            |_req: Request<Body>| async {
                Err::<Response, _>(AppError::Internal("connection refused: 10.1.2.3:5432".into()))
            },
            MiddlewareChain::new(),
        );

        let response = handler(request()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("10.1.2.3"));
    }

    #[test]
    fn test_error_boundary_logs_internal_detail_only() {
        let logs = Arc::new(parking_lot::Mutex::new(Vec::<u8>::new()));
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || LogSink(sink.clone()))
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let response = error_boundary(AppError::NotFound("No such article".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(logs.lock().is_empty());

        let response = error_boundary(AppError::Internal("disk full on /var/data".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let output = String::from_utf8(logs.lock().clone()).unwrap();
        assert!(output.contains("Request failed"));
        assert!(output.contains("disk full on /var/data"));
    }

    struct LogSink(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_compose_preserves_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let record = |label: &'static str| -> Arc<dyn Middleware> {
            let order = order.clone();
            Arc::new(from_fn(label, move |_req: &Request<Body>| {
                order.lock().push(label);
                None
            }))
        };

        let chain = compose([record("first"), record("second"), record("third")]);
        assert!(chain.run(&request()).is_none());

        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_layer_short_circuits_inner_service() {
        let inner_calls = Arc::new(AtomicUsize::new(0));
        let counter = inner_calls.clone();
        let inner = tower::service_fn(move |_req: Request<Body>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Infallible>(StatusCode::OK.into_response()) }
        });

        let (blocker, _) = Spy::new(Some(StatusCode::UNSUPPORTED_MEDIA_TYPE));
        let service = MiddlewareLayer::new(MiddlewareChain::new().with(blocker)).layer(inner);

        let response = service.oneshot(request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_layer_passes_through_to_inner_service() {
        let inner = tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(StatusCode::ACCEPTED.into_response())
        });
        let (pass, pass_calls) = Spy::new(None);
        let service = MiddlewareLayer::new(MiddlewareChain::new().with(pass)).layer(inner);

        let response = service.oneshot(request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(pass_calls.load(Ordering::SeqCst), 1);
    }
}
