//! HTTP API server for operator control of a running interview
//!
//! - GET /health - Health check
//! - GET /interview/status - Phase, sub-state, counters, upload progress
//! - GET /interview/log - Recent controller log entries
//! - POST /interview/override/:action - nudge, rephrase, skip or evaluate
//! - POST /interview/abandon - End without uploading

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
