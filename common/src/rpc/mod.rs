#[cfg(feature = "rpc-client")]
pub mod client;

mod error;
mod types;

pub use error::*;
pub use types::*;
