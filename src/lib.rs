//! Bulk course content downloader library.
//!
//! Logs in to the learning platform once, walks the requested courses and
//! their lectures, and downloads every attachment and hosted video under
//! deterministic names. The [`engine::DownloadEngine`] ties the pieces
//! together; the other modules are usable on their own.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod download;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod filename;
pub mod media;

pub use auth::{Session, attempt_login};
pub use catalog::{Catalog, Course, Lecture, LectureFile};
pub use download::Downloader;
pub use engine::{DownloadEngine, RunStats};
pub use error::{Error, ErrorKind, Result};
pub use fetch::{DEFAULT_BASE_URL, Fetcher};
pub use media::{MediaInfo, MediaResolver};
