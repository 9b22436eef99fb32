use chainlog_metastore::MetaStoreError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
#[error("metadata store error")]
pub struct Error;

impl MetaStoreError for Error {
    fn is_transient(&self) -> bool {
        false
    }
}
