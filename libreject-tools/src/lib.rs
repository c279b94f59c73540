#[macro_use]
extern crate log;

mod config;
mod engine;
mod error;
mod handler;
mod packet;
mod session;

pub use config::Config;
pub use engine::*;
pub use error::*;
pub use handler::*;
pub use packet::*;
pub use session::*;

pub use pnet_base::MacAddr;
