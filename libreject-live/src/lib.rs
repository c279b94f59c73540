//! Live capture backend: a divert session over libpcap

mod divert_session;

pub use divert_session::*;
