//! Request pipeline: rate check, span, handler, error translation.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::ratelimit::{LimiterRegistry, RoutingKey};
use crate::telemetry::Tracer;

/// JSON field the error description is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorField {
    Message,
    Error,
}

impl ErrorField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorField::Message => "message",
            ErrorField::Error => "error",
        }
    }
}

/// What the pipeline needs to know about an inbound request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub key: RoutingKey,
    pub method: Method,
    /// Name of the span opened for an admitted request
    pub span_name: &'static str,
    pub error_field: ErrorField,
}

impl RequestDescriptor {
    pub fn new(key: RoutingKey, method: Method, span_name: &'static str) -> Self {
        Self {
            key,
            method,
            span_name,
            error_field: ErrorField::Message,
        }
    }

    pub fn with_error_field(mut self, field: ErrorField) -> Self {
        self.error_field = field;
        self
    }
}

/// Terminal state of one request.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The key's window was full; the handler never ran
    Rejected,
    Succeeded(T),
    Failed {
        error: ServiceError,
        field: ErrorField,
    },
}

impl<T> Outcome<T> {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected)
    }
}

fn status_for(error: &ServiceError) -> StatusCode {
    StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl<T: IntoResponse> IntoResponse for Outcome<T> {
    fn into_response(self) -> Response {
        match self {
            Outcome::Rejected => status_for(&ServiceError::RateLimited).into_response(),
            Outcome::Succeeded(body) => body.into_response(),
            Outcome::Failed {
                error: ServiceError::InvalidInput(_),
                ..
            } => (StatusCode::BAD_REQUEST, "Invalid JSON").into_response(),
            Outcome::Failed { error, field } => {
                let status = status_for(&error);
                let mut body = serde_json::Map::new();
                body.insert(field.as_str().to_string(), error.to_string().into());
                (status, Json(serde_json::Value::Object(body))).into_response()
            }
        }
    }
}

/// Wraps every handler with a per-key rate check and a trace span.
#[derive(Debug, Clone)]
pub struct RequestPipeline {
    registry: Arc<LimiterRegistry>,
    tracer: Arc<Tracer>,
}

impl RequestPipeline {
    pub fn new(registry: Arc<LimiterRegistry>, tracer: Arc<Tracer>) -> Self {
        Self { registry, tracer }
    }

    pub fn registry(&self) -> &Arc<LimiterRegistry> {
        &self.registry
    }

    pub fn tracer(&self) -> &Arc<Tracer> {
        &self.tracer
    }

    /// Run `handler` for `request` unless its key is rate limited.
    ///
    /// Rejected requests open no span. Admitted requests get a span carrying
    /// an `elapse` attribute in milliseconds, closed whether the handler
    /// succeeded or not.
    pub async fn process<T, F, Fut>(&self, request: &RequestDescriptor, handler: F) -> Outcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let limiter = self.registry.get_limiter(request.key.as_str());
        if !limiter.allow_request() {
            warn!(
                key = %request.key,
                method = %request.method,
                "Rate limit exceeded"
            );
            return Outcome::Rejected;
        }

        let mut span = self.tracer.start_span(request.span_name);
        let start = Instant::now();

        let result = handler().await;

        let elapsed = start.elapsed();
        span.set_attribute("elapse", elapsed.as_millis().to_string());
        span.end();

        match result {
            Ok(value) => {
                debug!(
                    key = %request.key,
                    method = %request.method,
                    elapsed = ?elapsed,
                    "Request handled"
                );
                Outcome::Succeeded(value)
            }
            Err(error) => {
                warn!(
                    key = %request.key,
                    method = %request.method,
                    error = %error,
                    "Request failed"
                );
                Outcome::Failed {
                    error,
                    field: request.error_field,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::MAX_BURST;
    use crate::telemetry::InMemoryExporter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pipeline() -> (RequestPipeline, InMemoryExporter) {
        let exporter = InMemoryExporter::new();
        let tracer = Tracer::init("test", Arc::new(exporter.clone()));
        (
            RequestPipeline::new(Arc::new(LimiterRegistry::new()), tracer),
            exporter,
        )
    }

    fn descriptor(key: &str) -> RequestDescriptor {
        RequestDescriptor::new(RoutingKey::from(key), Method::GET, "GET /meals")
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_admitted_request_runs_handler_and_records_span() {
        let (pipeline, exporter) = pipeline();

        let outcome = pipeline
            .process(&descriptor("/meals"), || async { Ok::<_, ServiceError>(7) })
            .await;

        assert!(matches!(outcome, Outcome::Succeeded(7)));
        let spans = exporter.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "GET /meals");
        assert!(spans[0].attribute("elapse").unwrap().parse::<u64>().is_ok());
    }

    #[tokio::test]
    async fn test_rejected_request_skips_handler_and_span() {
        let (pipeline, exporter) = pipeline();
        let calls = AtomicUsize::new(0);
        let request = descriptor("/meals");

        for _ in 0..MAX_BURST {
            let outcome = pipeline
                .process(&request, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ServiceError>(())
                })
                .await;
            assert!(!outcome.is_rejected());
        }

        let outcome = pipeline
            .process(&request, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ServiceError>(())
            })
            .await;

        assert!(outcome.is_rejected());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_BURST);
        assert_eq!(exporter.len(), MAX_BURST);

        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_other_keys_unaffected_by_rejection() {
        let (pipeline, _) = pipeline();

        for _ in 0..=MAX_BURST {
            pipeline
                .process(&descriptor("/meals"), || async { Ok::<_, ServiceError>(()) })
                .await;
        }

        let outcome = pipeline
            .process(&descriptor("/meals/1"), || async { Ok::<_, ServiceError>(()) })
            .await;
        assert!(matches!(outcome, Outcome::Succeeded(())));
    }

    #[tokio::test]
    async fn test_failure_becomes_500_with_message() {
        let (pipeline, exporter) = pipeline();

        let outcome = pipeline
            .process(&descriptor("/meals/1"), || async {
                Err::<(), _>(ServiceError::NotFound)
            })
            .await;

        // The span still closes with its elapsed time
        assert_eq!(exporter.len(), 1);
        assert!(exporter.spans()[0].attribute("elapse").is_some());

        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, r#"{"message":"Meal not found"}"#);
    }

    #[tokio::test]
    async fn test_error_field_follows_descriptor() {
        let (pipeline, _) = pipeline();
        let request = descriptor("/meals/Taco").with_error_field(ErrorField::Error);

        let outcome = pipeline
            .process(&request, || async { Err::<(), _>(ServiceError::NotFound) })
            .await;

        let response = outcome.into_response();
        assert_eq!(body_string(response).await, r#"{"error":"Meal not found"}"#);
    }

    #[tokio::test]
    async fn test_invalid_input_is_400() {
        let (pipeline, _) = pipeline();

        let outcome = pipeline
            .process(&descriptor("/meals"), || async {
                Err::<(), _>(ServiceError::InvalidInput("EOF".into()))
            })
            .await;

        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "Invalid JSON");
    }
}
