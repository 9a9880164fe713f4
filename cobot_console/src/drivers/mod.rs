#[cfg(feature="driver")]
mod connection;
#[cfg(feature="driver")]
pub use connection::*;

mod models;
pub use models::*;

mod connection_config;
pub use connection_config::*;
