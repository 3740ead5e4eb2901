#![deny(unsafe_code)]

//! Subprocess adapter wrapping the external yt-dlp binary behind
//! [`ytd_core::DownloaderAdapterPort`].

mod argv;
pub mod downloader;
pub mod inspector;
pub mod process;

pub use downloader::YtDlpAdapter;
pub use inspector::YtDlpInspector;
