mod allocation;
mod checksum;
mod group_result;
mod request_status;

#[rustfmt::skip]
pub use {
    allocation::*,
    checksum::*,
    group_result::*,
    request_status::*,
};
