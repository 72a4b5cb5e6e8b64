//! Meal route handlers.
//!
//! Every handler builds a [`RequestDescriptor`] and runs its store call
//! through the pipeline, so rate limiting and tracing apply uniformly.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use super::decode::decode_component;
use crate::error::ServiceError;
use crate::pipeline::{ErrorField, Outcome, RequestDescriptor, RequestPipeline};
use crate::ratelimit::{KeyPolicy, RoutingKey};
use crate::store::{Meal, MealStore};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: RequestPipeline,
    pub store: Arc<dyn MealStore>,
    pub key_policy: KeyPolicy,
}

impl AppState {
    pub fn new(pipeline: RequestPipeline, store: Arc<dyn MealStore>, key_policy: KeyPolicy) -> Self {
        Self {
            pipeline,
            store,
            key_policy,
        }
    }

    fn descriptor(&self, uri: &Uri, method: Method, span_name: &'static str) -> RequestDescriptor {
        RequestDescriptor::new(RoutingKey::from_uri(uri, self.key_policy), method, span_name)
    }
}

/// Parse a path segment the way an `<int>` route parameter matches.
fn parse_id(segment: &str) -> Option<i64> {
    let digits = segment.strip_prefix(['-', '+']).unwrap_or(segment);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Last path segment exactly as sent, before any percent decoding.
fn raw_segment(uri: &Uri) -> &str {
    uri.path().rsplit('/').next().unwrap_or_default()
}

/// `POST /meals`
pub async fn create_meal(State(state): State<AppState>, uri: Uri, body: Bytes) -> Outcome<StatusCode> {
    let request = state.descriptor(&uri, Method::POST, "POST /meals");

    state
        .pipeline
        .process(&request, || async {
            let meal: Meal = serde_json::from_slice(&body)
                .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
            state.store.create_meal(&meal).await?;
            Ok(StatusCode::OK)
        })
        .await
}

/// `GET /meals`
pub async fn list_meals(State(state): State<AppState>, uri: Uri) -> Outcome<Json<Vec<Meal>>> {
    let request = state.descriptor(&uri, Method::GET, "GET /meals");

    state
        .pipeline
        .process(&request, || async { state.store.list_meals().await.map(Json) })
        .await
}

/// `GET /meals/{id}` for integer segments, `GET /meals/{name}` otherwise.
pub async fn get_meal(State(state): State<AppState>, uri: Uri) -> Outcome<Json<Meal>> {
    let segment = raw_segment(&uri);

    if let Some(id) = parse_id(segment) {
        let request = state.descriptor(&uri, Method::GET, "GET /meals/<int>");
        return state
            .pipeline
            .process(&request, || async { state.store.get_meal_by_id(id).await.map(Json) })
            .await;
    }

    let request = state
        .descriptor(&uri, Method::GET, "GET /meals/<string>")
        .with_error_field(ErrorField::Error);
    state
        .pipeline
        .process(&request, || async {
            let name = decode_component(segment);
            state.store.get_meal_by_name(&name).await.map(Json)
        })
        .await
}

/// `DELETE /meals/{id}`
pub async fn delete_meal(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(id) = parse_id(raw_segment(&uri)) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let request = state
        .descriptor(&uri, Method::DELETE, "DELETE /meals/<int>")
        .with_error_field(ErrorField::Error);
    state
        .pipeline
        .process(&request, || async {
            let status = state.store.delete_meal_by_id(id).await?;
            Ok(Json(json!({ "status": status })))
        })
        .await
        .into_response()
}
