//! Shared application state type.
//!
//! Defines the `AppState` type used across all handlers and routers.

use crate::bootstrap::AxumContext;
use std::sync::Arc;

/// Application state shared across all handlers.
///
/// This is an Arc-wrapped `AxumContext` containing the job store, worker
/// pool, batch coordinator and every infrastructure port (vault, retention,
/// webhook, downloader, inspector) the admission layer needs.
pub type AppState = Arc<AxumContext>;
