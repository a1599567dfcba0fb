use domain_storage::exception::FileRequestException;
use thiserror::Error;
use uuid::Uuid;

use crate::model::vo::AipState;

pub type PackageResult<T> = Result<T, PackageException>;

#[derive(Error, Debug)]
pub enum PackageException {
    #[error("There is no SIP with id: {id}.")]
    NoSuchSip { id: Uuid },

    #[error("There is no AIP with id: {id}.")]
    NoSuchAip { id: Uuid },

    #[error("Package {id} has no file.")]
    EmptyPackage { id: Uuid },

    #[error("AIP {id} cannot go from {from} to {to}.")]
    InvalidTransition {
        id: Uuid,
        from: AipState,
        to: AipState,
    },

    #[error("File request of package failed: {source}")]
    FileRequest {
        #[from]
        source: FileRequestException,
    },

    #[error("Package internal error: {source}")]
    InternalError {
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for PackageException {
    fn from(e: anyhow::Error) -> Self {
        PackageException::InternalError { source: e }
    }
}
