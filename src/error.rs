//! Error type surfaced to callers of [`crate::run`].

use std::{error::Error, fmt};

/// Everything that can cause a run to fail, per the error kinds a caller
/// needs to branch on.
#[derive(Debug)]
pub enum WaczError {
    /// A required configuration option was missing or unusable.
    ConfigInvalid(String),
    /// No WARC file remained after filtering to `.warc`/`.warc.gz`.
    InputNotFound(String),
    /// The WARC parser could not make progress in an input file.
    MalformedWarc { file: String, reason: String },
    /// A worker task aborted; wraps the first failure observed.
    IndexingFailed(Box<WaczError>),
    /// The ZIP writer or output sink failed.
    WriteFailed(std::io::Error),
    /// The signing collaborator returned an error.
    SigningFailed(String),
    /// The signing collaborator did not respond within its deadline.
    SignerTimeout,
    /// The signing collaborator's response failed the WACZ signature assertion.
    SignatureInvalid(String),
    /// `process()` was called more than once on the same run.
    AlreadyConsumed,
    /// The run was cooperatively cancelled.
    Cancelled,
}

impl fmt::Display for WaczError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigInvalid(message) => write!(f, "invalid configuration: {message}"),
            Self::InputNotFound(message) => write!(f, "no usable WARC input: {message}"),
            Self::MalformedWarc { file, reason } => {
                write!(f, "malformed WARC in {file}: {reason}")
            }
            Self::IndexingFailed(source) => write!(f, "indexing failed: {source}"),
            Self::WriteFailed(source) => write!(f, "failed to write output: {source}"),
            Self::SigningFailed(message) => write!(f, "signing failed: {message}"),
            Self::SignerTimeout => write!(f, "signer did not respond within its deadline"),
            Self::SignatureInvalid(message) => write!(f, "signature invalid: {message}"),
            Self::AlreadyConsumed => write!(f, "process() was already called on this run"),
            Self::Cancelled => write!(f, "run was cancelled"),
        }
    }
}

impl Error for WaczError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IndexingFailed(source) => Some(source.as_ref()),
            Self::WriteFailed(source) => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WaczError {
    fn from(error: std::io::Error) -> Self {
        Self::WriteFailed(error)
    }
}
