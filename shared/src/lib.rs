pub mod api;
pub mod config;
pub mod types;

pub use api::*;
pub use config::*;
pub use types::*;
