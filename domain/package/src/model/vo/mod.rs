mod msg;
mod state;

#[rustfmt::skip]
pub use {
    msg::AipChangeMsg,
    state::{AipState, SipState},
};
