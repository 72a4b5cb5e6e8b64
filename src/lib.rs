//! Meal Service - CRUD REST API with per-route rate limiting
//!
//! This crate implements a small REST API over a single SQLite table of
//! meals. Every route is guarded by a sliding window rate limiter keyed on
//! the request URI, and every admitted request is recorded as a trace span.

pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod ratelimit;
pub mod store;
pub mod telemetry;
