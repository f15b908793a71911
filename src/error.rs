// ⚠️ Error Model - tagged failures for every external call
// Network, parse and business failures stay distinguishable all the way to the UI

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DepotError>;

/// Coarse failure category, used for logging and for picking user messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Parse,
    Business,
    Io,
    Image,
    Config,
}

impl ErrorKind {
    pub fn name(&self) -> &str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Parse => "parse",
            ErrorKind::Business => "business",
            ErrorKind::Io => "io",
            ErrorKind::Image => "image",
            ErrorKind::Config => "config",
        }
    }
}

#[derive(Debug, Error)]
pub enum DepotError {
    /// Transport failure: DNS, connect, timeout, body read
    #[error("request to {service} failed: {source}")]
    Network {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Remote answered with a non-success HTTP status
    #[error("{service} answered HTTP {status}")]
    Status { service: &'static str, status: u16 },

    /// Remote answered 2xx but the body is not what we expect
    #[error("unexpected {service} response: {message}")]
    Parse { service: &'static str, message: String },

    /// Request understood but refused (unknown address, missing session, bad input)
    #[error("{0}")]
    Business(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error on {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl DepotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DepotError::Network { .. } | DepotError::Status { .. } => ErrorKind::Network,
            DepotError::Parse { .. } => ErrorKind::Parse,
            DepotError::Business(_) => ErrorKind::Business,
            DepotError::Io { .. } => ErrorKind::Io,
            DepotError::Image { .. } => ErrorKind::Image,
            DepotError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn network(service: &'static str, source: reqwest::Error) -> Self {
        DepotError::Network { service, source }
    }

    pub(crate) fn parse(service: &'static str, message: impl Into<String>) -> Self {
        DepotError::Parse {
            service,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DepotError::Io {
            path: path.into(),
            source,
        }
    }
}
