//! Top-level error taxonomy.
//!
//! `IngestError` is the only error type ever persisted into `inodes.error`.
//! Everything else is log-and-reject material for the dispatcher (taxonomy
//! classes 2-4 in the design notes): it bubbles up as `WorkerError` and the
//! delivery is nacked without requeue.

use thiserror::Error;

use crate::broker::BrokerError;
use crate::db::DbError;
use crate::embeddings::EmbeddingError;
use crate::pdf::PdfError;
use crate::search::SearchError;
use crate::storage::ObjectStoreError;

/// The two input-data errors that can be persisted to `inode.error`.
///
/// Once set, the inode is terminal: it must not be re-embedded, though it is
/// still re-indexed so the front-end can display the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("unsupported_file_type")]
    UnsupportedFileType,
    #[error("corrupted_file")]
    CorruptedFile,
}

impl IngestError {
    /// The string stored in `inodes.error` and returned over the API.
    pub fn as_db_str(self) -> &'static str {
        match self {
            IngestError::UnsupportedFileType => "unsupported_file_type",
            IngestError::CorruptedFile => "corrupted_file",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "unsupported_file_type" => Some(IngestError::UnsupportedFileType),
            "corrupted_file" => Some(IngestError::CorruptedFile),
            _ => None,
        }
    }
}

/// Errors that can escape a stage handler. Every variant here means "reject
/// the delivery without requeue" at the dispatcher boundary - none of these
/// are retried in-process.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("unknown routing key: {0}")]
    UnknownRoutingKey(String),

    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("malformed event payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Storage(#[from] ObjectStoreError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("inode {0} not found")]
    InodeNotFound(i64),

    #[error("refusing to embed inode {0}: carries a terminal error")]
    EmbedRefused(i64),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
