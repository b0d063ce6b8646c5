//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crop_health_core::ports::DiagnosisLog;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub log: Arc<dyn DiagnosisLog>,
}

/// The caller's identity, resolved by the identity gateway and placed in request
/// extensions by `require_user`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);
