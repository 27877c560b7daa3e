pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod pipeline;
pub mod report;
pub mod store;

pub use error::{RelayError, Result};
