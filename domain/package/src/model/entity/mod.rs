mod aip;
mod sip;

#[rustfmt::skip]
pub use {
    aip::{Aip, AipLocation},
    sip::{PackageFile, Sip},
};
