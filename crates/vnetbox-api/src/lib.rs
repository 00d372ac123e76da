// vnetbox-api: Async Rust client for the NetBox REST API

pub mod client;
mod dcim;
pub mod error;
mod extras;
mod ipam;
pub mod transport;
pub mod types;

pub use client::NetboxClient;
pub use error::Error;
pub use transport::TransportConfig;
