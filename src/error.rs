//! Error types for pack parsing, caching, host lookups and pack switching.
//!
//! None of these are fatal to icon display. The resolver and composer turn
//! every error into a fallback; the types exist so callers and tests can see
//! which branch was taken.

use std::io;

use thiserror::Error;

/// A pack metadata document could not be read.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not well-formed markup.
    #[error("malformed {document} document at byte {position}: {message}")]
    Xml {
        document: &'static str,
        position: u64,
        message: String,
    },

    /// An attribute carried a value the parser cannot use.
    #[error("invalid value {value:?} for attribute `{attribute}` on <{element}>")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },

    /// The pack's resources could not be opened at all.
    #[error("resources for pack `{0}` are unavailable")]
    MissingResources(String),
}

/// A disk cache read, write or delete failed.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode cached bitmap: {0}")]
    Encode(image::ImageError),

    #[error("failed to decode cached bitmap: {0}")]
    Decode(image::ImageError),
}

/// The host could not answer a query about an installed package.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("package `{0}` is not installed")]
    PackageNotFound(String),

    #[error("resources for package `{0}` could not be opened")]
    ResourcesUnavailable(String),
}

/// A pack resource could not be read from its backing store.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to decode drawable `{name}`: {source}")]
    Image {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to render vector drawable `{0}`")]
    Svg(String),
}

/// The durable preference store could not be read or written.
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preference I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("preference document is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("config document is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// A pack switch did not run to completion.
#[derive(Debug, Error)]
pub enum SwitchError {
    /// The target is neither the default pack nor an installed pack.
    #[error("icon pack `{0}` is not available")]
    Rejected(String),

    /// The task was aborted before it finished.
    #[error("switch to `{0}` was cancelled")]
    Cancelled(String),

    /// The background task panicked.
    #[error("switch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
