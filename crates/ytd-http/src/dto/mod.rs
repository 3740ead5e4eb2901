//! Data Transfer Objects (DTOs) for the HTTP API contract (§6).
//!
//! These types define the stable HTTP API contract with explicit serialization
//! control. They decouple internal domain types from external API representation.

pub mod batch;
pub mod cookies;
pub mod download;
pub mod inspect;

pub use batch::{BatchResponse, CreateBatchRequest, DownloadOptions};
pub use cookies::{CredentialListResponse, CredentialResponse, UploadCookiesRequest};
pub use download::{
    CancelResponse, CreateDownloadRequest, JobListResponse, JobResponse, ListJobsQuery,
    LogsResponse,
};
pub use inspect::{ChannelQuery, PageQuery, UrlQuery};
