//! REST endpoint handlers organized by resource.

pub mod account;
pub mod item;
pub mod lending;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(account::routes())
        .merge(item::routes())
        .merge(lending::routes())
        .merge(system::routes())
}
