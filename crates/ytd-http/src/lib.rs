//! Axum admission layer (§4.I, §6, §7): request validation, authentication,
//! rate limiting, routing and the dispatch glue that wires a queued job to
//! the downloader adapter.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use hyper as _;
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
#[cfg(test)]
use tower as _;

pub mod auth;
pub mod body_limit;
pub mod bootstrap;
pub mod dispatch;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use bootstrap::{bootstrap, AxumContext};
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
