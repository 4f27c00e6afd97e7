//! REST endpoint handlers organized by resource.

pub mod control;
pub mod device;
pub mod system;
pub mod webhook;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(device::routes())
        .merge(control::routes())
}
