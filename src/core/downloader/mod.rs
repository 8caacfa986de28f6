mod client;
pub mod staging;

pub use client::{
    DownloadEntry, Downloader, FetchErrorKind, FetchReport, FetchResult, DEFAULT_CONCURRENCY,
    DEFAULT_FETCH_TIMEOUT,
};
