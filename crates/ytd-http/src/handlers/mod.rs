//! HTTP request handlers for the Axum web server.
//!
//! Each submodule contains handlers for a specific API area; all delegate to
//! the port trait objects held on [`crate::state::AppState`].

pub mod batch;
pub mod channel;
pub mod cookies;
pub mod downloads;
pub mod files;
pub mod health;
pub mod metadata;
pub mod playlist;
