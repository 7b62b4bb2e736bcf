pub mod config;
pub mod errors;
pub mod market;

pub use config::*;
pub use errors::*;
pub use market::*;
