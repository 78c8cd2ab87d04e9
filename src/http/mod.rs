//! HTTP layer for the mirror service.
//!
//! A single axum router exposes the webhook endpoint that drives the mirror
//! pipeline, plus health and metrics endpoints for operators.

pub mod handler;
