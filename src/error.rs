use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to turn one symbol into a [`Quote`](crate::model::quote::Quote).
///
/// Every variant is recoverable: the scheduler logs it, leaves the symbol's
/// slot empty and moves on to the next symbol.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid symbol '{0}': expected non-empty alphanumeric")]
    InvalidSymbol(String),

    #[error("transport error for {symbol}: {detail}")]
    Transport { symbol: String, detail: String },

    #[error("parse error for {symbol}: {detail}")]
    Parse { symbol: String, detail: String },
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSymbol(_) => "invalid_symbol",
            Self::Transport { .. } => "transport",
            Self::Parse { .. } => "parse",
        }
    }
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to serialize {document} document: {source}")]
    Serialize {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
