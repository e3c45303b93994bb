use std::fmt;

use thiserror::Error;

/// Which step of the load sequence a request belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    FriendlyLinks,
    Search,
    Continuation(u32),
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FriendlyLinks => write!(f, "friendly-links"),
            Self::Search => write!(f, "graphql"),
            Self::Continuation(n) => write!(f, "next #{n}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum OlxMapError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{stage} request failed ({status}) for {url}")]
    Status {
        stage: RequestStage,
        status: u16,
        url: String,
    },

    #[error("Failed to parse response: {reason}")]
    Parse { reason: String },

    #[error("Invalid page URL: {reason}")]
    InvalidPage { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, OlxMapError>;
