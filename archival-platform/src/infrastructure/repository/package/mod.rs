mod aip;
mod sip;
