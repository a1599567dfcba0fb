pub mod checksum;
mod opendal_data_storage;
mod origin_fetcher;
mod storage_worker_runner;

#[rustfmt::skip]
pub use {
    opendal_data_storage::OpendalDataStorage,
    origin_fetcher::OriginFetcher,
    storage_worker_runner::StorageWorkerRunner,
};
