pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{FilePageSource, HttpPageSource, LocalStorage};
pub use config::AppConfig;
pub use core::etl::EtlEngine;
pub use utils::error::{EtlError, Result};
