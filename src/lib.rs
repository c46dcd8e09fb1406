// src/lib.rs

#[macro_use]
pub mod macros;

pub mod config;
pub mod core;
pub mod crawl;
pub mod error;
pub mod file;
pub mod log;
pub mod progress;
pub mod source;
pub mod store;

#[cfg(feature = "cli")]
pub mod cli;
