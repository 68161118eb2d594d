pub mod aggregate;
pub mod client;
pub mod config;
pub mod error;
pub mod frame;
pub mod http_client;
pub mod model;
pub mod normalizer;
pub mod stream;
pub mod transport;
