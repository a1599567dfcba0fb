mod cache_file;
mod file_reference;
mod file_request;
mod request_group;
mod request_result;
mod storage_location;
