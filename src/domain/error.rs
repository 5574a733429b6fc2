use crate::domain::validation::ValidationError;
use serde_json::Value;
use std::error::Error as _;
use std::fmt;
use std::io::ErrorKind;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the transport, configuration and local validation layers.
///
/// Cloneable so that one failed fetch can be handed to every caller that was
/// sharing it; non-clone sources are kept behind an `Arc`.
#[derive(Error, Debug, Clone)]
pub enum LeagueError {
    #[error("HTTP request error: {0}")]
    Http(#[source] Arc<reqwest::Error>),

    #[error("API responded with status {status}")]
    Status { status: u16, body: Option<Value> },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("JSON serialization error: {0}")]
    Json(#[source] Arc<serde_json::Error>),

    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("TOML parsing error: {0}")]
    Toml(#[source] Arc<toml::de::Error>),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LeagueError {
    fn from(e: reqwest::Error) -> Self {
        LeagueError::Http(Arc::new(e))
    }
}

impl From<serde_json::Error> for LeagueError {
    fn from(e: serde_json::Error) -> Self {
        LeagueError::Json(Arc::new(e))
    }
}

impl From<std::io::Error> for LeagueError {
    fn from(e: std::io::Error) -> Self {
        LeagueError::Io(Arc::new(e))
    }
}

impl From<toml::de::Error> for LeagueError {
    fn from(e: toml::de::Error) -> Self {
        LeagueError::Toml(Arc::new(e))
    }
}

/// Shape of a failure as seen by the error classifier.
///
/// Every raw error is first reduced to one of these variants, so
/// classification is an exhaustive match instead of property sniffing.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// The server answered with a non-success status.
    Http { status: u16, body: Option<Value> },
    /// Local input validation rejected the request before it was sent.
    Validation(ValidationError),
    /// No connectivity or a failure below HTTP.
    Network(String),
    /// The request exceeded its time budget.
    Timeout,
    Unknown(Option<String>),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Http { status, .. } => write!(f, "http status {}", status),
            Failure::Validation(v) => write!(f, "validation failed: {}", v),
            Failure::Network(msg) => write!(f, "network failure: {}", msg),
            Failure::Timeout => write!(f, "request timed out"),
            Failure::Unknown(Some(msg)) => write!(f, "{}", msg),
            Failure::Unknown(None) => write!(f, "unknown failure"),
        }
    }
}

impl From<&reqwest::Error> for Failure {
    fn from(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Failure::Timeout
        } else if let Some(status) = e.status() {
            Failure::Http {
                status: status.as_u16(),
                body: None,
            }
        } else if let Some(io) = io_source(e) {
            // Anything surfacing from the socket is a network failure
            match Failure::from(io) {
                Failure::Unknown(_) => Failure::Network(e.to_string()),
                other => other,
            }
        } else if e.is_connect() || e.is_request() || e.is_body() || e.is_decode() {
            // Payloads are decoded with serde_json after the read, so a
            // reqwest decode error means the body stream itself broke
            Failure::Network(e.to_string())
        } else {
            Failure::Unknown(Some(e.to_string()))
        }
    }
}

fn io_source(e: &reqwest::Error) -> Option<&std::io::Error> {
    std::iter::successors(e.source(), |&err| err.source())
        .find_map(|err| err.downcast_ref::<std::io::Error>())
}

impl From<reqwest::Error> for Failure {
    fn from(e: reqwest::Error) -> Self {
        Failure::from(&e)
    }
}

impl From<&std::io::Error> for Failure {
    fn from(e: &std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::TimedOut => Failure::Timeout,
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => Failure::Network(e.to_string()),
            _ => Failure::Unknown(Some(e.to_string())),
        }
    }
}

impl From<&LeagueError> for Failure {
    fn from(e: &LeagueError) -> Self {
        match e {
            LeagueError::Http(inner) => Failure::from(inner.as_ref()),
            LeagueError::Status { status, body } => Failure::Http {
                status: *status,
                body: body.clone(),
            },
            LeagueError::Validation(v) => Failure::Validation(v.clone()),
            LeagueError::Io(inner) => Failure::from(inner.as_ref()),
            other => Failure::Unknown(Some(other.to_string())),
        }
    }
}

impl From<LeagueError> for Failure {
    fn from(e: LeagueError) -> Self {
        Failure::from(&e)
    }
}

impl From<ValidationError> for Failure {
    fn from(e: ValidationError) -> Self {
        Failure::Validation(e)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        if let Some(league) = e.downcast_ref::<LeagueError>() {
            return Failure::from(league);
        }
        if let Some(validation) = e.downcast_ref::<ValidationError>() {
            return Failure::Validation(validation.clone());
        }
        Failure::Unknown(Some(format!("{:#}", e)))
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        if message.is_empty() {
            Failure::Unknown(None)
        } else {
            Failure::Unknown(Some(message))
        }
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Failure::from(message.to_string())
    }
}
