//! Data models for cheque extraction.

pub mod cheque;
pub mod config;

pub use cheque::*;
pub use config::*;
