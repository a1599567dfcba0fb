use uuid::Uuid;

use crate::model::vo::FileRequestStatus;

pub type FileRequestResult<T> = Result<T, FileRequestException>;

#[derive(Debug, thiserror::Error)]
pub enum FileRequestException {
    #[error("Invalid request: {reason}")]
    Validation { reason: String },

    #[error("Checksum <{checksum}> is not a valid {algorithm} digest.")]
    MalformedChecksum { checksum: String, algorithm: String },

    #[error("Url <{url}> is not valid: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("File <{checksum}> cannot be handled for storage as destination storage <{storage}> is unknown.")]
    UnknownStorage { checksum: String, storage: String },

    #[error("No storage location can be resolved for file <{checksum}>: {reason}")]
    NoStorageResolved { checksum: String, reason: String },

    #[error("File <{checksum}> is online mandatory but no online storage location is available.")]
    OnlineUnsatisfiable { checksum: String },

    #[error("Storage annotation of file <{checksum}> is malformed: {reason}")]
    MalformedAnnotation { checksum: String, reason: String },

    #[error("Unknown allocation strategy <{id}>.")]
    UnknownStrategy { id: String },

    #[error("File with checksum <{checksum}> does not exist.")]
    FileNotFound { checksum: String },

    #[error("No source file <{checksum}> exists to copy to storage <{storage}>.")]
    SourceNotFound { checksum: String, storage: String },

    #[error("Request {id} cannot go from {from} to {to}.")]
    InvalidTransition {
        id: Uuid,
        from: FileRequestStatus,
        to: FileRequestStatus,
    },

    #[error("File request internal error: {source}")]
    InternalError {
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for FileRequestException {
    fn from(e: anyhow::Error) -> Self {
        FileRequestException::InternalError { source: e }
    }
}
