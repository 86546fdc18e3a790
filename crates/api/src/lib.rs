//! HTTP API: REST handlers, realtime hub and request/response mapping.

pub mod app;
pub mod context;
pub mod middleware;
