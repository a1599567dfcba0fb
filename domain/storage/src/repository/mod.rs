mod cache_file;
mod file_reference;
mod file_request;
mod request_group;
mod request_result;
mod storage_location;

#[rustfmt::skip]
pub use {
    cache_file::CacheFileRepo,
    file_reference::FileReferenceRepo,
    file_request::FileRequestRepo,
    request_group::RequestGroupRepo,
    request_result::RequestResultInfoRepo,
    storage_location::StorageLocationRepo,
};
