use chainlog_leadership::ElectionError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
#[error("election error")]
pub struct Error;

impl ElectionError for Error {}
