mod cache_file;
mod file_reference;
mod file_request;
mod request_group;
mod request_result;
mod storage_location;

#[rustfmt::skip]
pub use {
    cache_file::CacheFile,
    file_reference::{FileLocation, FileReference, FileReferenceMetaInfo},
    file_request::{FileRequest, RequestDetails},
    request_group::RequestGroup,
    request_result::RequestResultInfo,
    storage_location::StorageLocation,
};
