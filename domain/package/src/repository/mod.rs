mod aip;
mod sip;

#[rustfmt::skip]
pub use {
    aip::AipRepo,
    sip::SipRepo,
};
